//! Note templates: a `---` delimited metadata header followed by a free-form body,
//! with `{{key}}` placeholders and `{{#if key}}...{{/if}}` conditional blocks.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

const DELIMITER: &str = "---";

static VARIABLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\{\{\s*([^{}#/\s][^{}]*?)\s*\}\}").expect("variable pattern is valid"));
static CONDITIONAL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)\{\{#if\s+([^{}\s]+)\s*\}\}(.*?)\{\{/if\}\}").expect("conditional pattern is valid"));
static LEFTOVER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("leftover pattern is valid"));

/// A template split into its header and body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateParts {
  pub header: String,
  pub body: String,
}

/// Split `text` into header and body.
///
/// The header is whatever sits between an opening `---` line at the start of the
/// (trimmed) text and the next `---` line. Without such a pair the header is empty
/// and the body is the whole trimmed input.
pub fn split_template(text: &str) -> TemplateParts {
  let trimmed = text.trim();
  let mut lines = trimmed.split('\n');

  if lines.next().map(|l| l.trim_end_matches('\r').trim_end()) != Some(DELIMITER) {
    return TemplateParts { header: String::new(), body: trimmed.to_string() };
  }

  let mut header_lines = Vec::new();
  let mut closed = false;
  for line in lines.by_ref() {
    if line.trim_end_matches('\r').trim_end() == DELIMITER {
      closed = true;
      break;
    }
    header_lines.push(line.trim_end_matches('\r'));
  }

  if !closed {
    return TemplateParts { header: String::new(), body: trimmed.to_string() };
  }

  let body: Vec<&str> = lines.collect();
  TemplateParts { header: header_lines.join("\n").trim().to_string(), body: body.join("\n").trim().to_string() }
}

/// Wrap `header` in delimiters, followed by a blank line and `body`.
/// An empty header yields the body alone.
pub fn combine_template(header: &str, body: &str) -> String {
  if header.trim().is_empty() {
    return body.to_string();
  }
  format!("{DELIMITER}\n{}\n{DELIMITER}\n\n{}", header.trim(), body)
}

/// Keep `original`'s header and replace its body.
pub fn update_content(original: &str, new_body: &str) -> String {
  let parts = split_template(original);
  combine_template(&parts.header, new_body)
}

fn stringify(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Number(n) => Some(n.to_string()),
    Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
  }
}

fn is_truthy(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
    Some(Value::String(s)) => !s.is_empty(),
    Some(Value::Array(_)) | Some(Value::Object(_)) => true,
  }
}

/// Fill a template from `data`.
///
/// Three passes, in order: substitute every `{{key}}` whose value is present and
/// non-null; keep or drop each `{{#if key}}...{{/if}}` block by the truthiness of
/// `data[key]`; strip any placeholder still unresolved.
pub fn render(template: &str, data: &Map<String, Value>) -> String {
  let substituted = VARIABLE_RE.replace_all(template, |caps: &regex::Captures| {
    let key = &caps[1];
    data.get(key).and_then(stringify).unwrap_or_else(|| caps[0].to_string())
  });

  let resolved = CONDITIONAL_RE.replace_all(&substituted, |caps: &regex::Captures| {
    if is_truthy(data.get(&caps[1])) { caps[2].to_string() } else { String::new() }
  });

  LEFTOVER_RE.replace_all(&resolved, "").into_owned()
}

/// Convenience wrapper for callers holding a `serde_json::Value`. Non-object values render with no data.
pub fn render_value(template: &str, data: &Value) -> String {
  match data {
    Value::Object(map) => render(template, map),
    _ => render(template, &Map::new()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn data(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("test data must be an object"),
    }
  }

  // --- split_template ---

  #[test]
  fn split_with_header() {
    let parts = split_template("---\ntitle: x\ntags: [a]\n---\n\nBody line\nsecond");
    assert_eq!(parts.header, "title: x\ntags: [a]");
    assert_eq!(parts.body, "Body line\nsecond");
  }

  #[test]
  fn split_without_header() {
    let parts = split_template("\n  just a body \n");
    assert_eq!(parts.header, "");
    assert_eq!(parts.body, "just a body");
  }

  #[test]
  fn split_unclosed_header_is_body() {
    let parts = split_template("---\ntitle: x\nno closing");
    assert_eq!(parts.header, "");
    assert_eq!(parts.body, "---\ntitle: x\nno closing");
  }

  #[test]
  fn split_handles_crlf() {
    let parts = split_template("---\r\ntitle: x\r\n---\r\nbody");
    assert_eq!(parts.header, "title: x");
    assert_eq!(parts.body, "body");
  }

  // --- combine_template / update_content ---

  #[test]
  fn combine_layout() {
    assert_eq!(combine_template("a: 1", "body"), "---\na: 1\n---\n\nbody");
  }

  #[test]
  fn combine_empty_header_emits_body_only() {
    assert_eq!(combine_template("", "body"), "body");
    assert_eq!(combine_template("  \n", "body"), "body");
  }

  #[test]
  fn split_then_combine_preserves_content() {
    let original = "---\ntitle: x\n---\n\n\nSome body\n\n";
    let parts = split_template(original);
    let rebuilt = combine_template(&parts.header, &parts.body);
    assert_eq!(split_template(&rebuilt), parts);
    assert_eq!(rebuilt, "---\ntitle: x\n---\n\nSome body");
  }

  #[test]
  fn update_keeps_header() {
    let updated = update_content("---\nstatus: done\n---\n\nold body", "new body");
    assert_eq!(updated, "---\nstatus: done\n---\n\nnew body");
  }

  #[test]
  fn update_without_header_is_new_body() {
    assert_eq!(update_content("old", "new"), "new");
  }

  // --- render ---

  #[test]
  fn render_replaces_all_occurrences() {
    let out = render("{{title}} / {{title}} by {{ author }}", &data(json!({"title": "T", "author": "A"})));
    assert_eq!(out, "T / T by A");
  }

  #[test]
  fn render_stringifies_values() {
    let out = render("{{n}} {{b}} {{tags}} {{obj}}", &data(json!({"n": 3, "b": true, "tags": ["a", "b"], "obj": {"k": 1}})));
    assert_eq!(out, r#"3 true ["a","b"] {"k":1}"#);
  }

  #[test]
  fn render_strips_missing_and_null() {
    let out = render("[{{missing}}][{{nothing}}]", &data(json!({"nothing": null})));
    assert_eq!(out, "[][]");
  }

  #[test]
  fn render_conditional_kept_when_truthy() {
    let template = "start\n{{#if url}}link: {{url}}\nmore{{/if}}\nend";
    let out = render(template, &data(json!({"url": "https://x"})));
    assert_eq!(out, "start\nlink: https://x\nmore\nend");
  }

  #[test]
  fn render_conditional_removed_when_falsy() {
    let template = "a{{#if url}} [{{url}}]{{/if}}b";
    assert_eq!(render(template, &data(json!({}))), "ab");
    assert_eq!(render(template, &data(json!({"url": ""}))), "ab");
    assert_eq!(render(template, &data(json!({"url": 0}))), "ab");
    assert_eq!(render(template, &data(json!({"url": false}))), "ab");
  }

  #[test]
  fn render_multiple_conditionals() {
    let template = "{{#if a}}A{{/if}}-{{#if b}}B{{/if}}";
    assert_eq!(render(template, &data(json!({"a": 1, "b": null}))), "A-");
  }

  #[test]
  fn render_value_non_object() {
    assert_eq!(render_value("x{{y}}", &json!([1, 2])), "x");
    assert_eq!(render_value("x{{y}}", &json!({"y": "z"})), "xz");
  }
}
