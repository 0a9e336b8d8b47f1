//! Plain-text table and card views over a page of items.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::duration::format_duration;
use crate::filter::FilterOptions;
use crate::model::{ContentItem, ContentKind};
use crate::selection::SelectionState;

const EMPTY_MESSAGE: &str = "No items match the current filters.";

// --- Helpers ---

/// Terminal column width of `s` (double-width CJK counts as two).
pub fn display_width(s: &str) -> usize {
  UnicodeWidthStr::width(s)
}

/// Truncate to `max_width` display columns, appending "…" if truncated.
pub fn truncate_str(s: &str, max_width: usize) -> String {
  if display_width(s) <= max_width {
    return s.to_string();
  }
  let budget = max_width.saturating_sub(1);
  let mut width = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if width + w > budget {
      break;
    }
    width += w;
    out.push(c);
  }
  if max_width > 0 {
    out.push('…');
  }
  out
}

fn pad(s: &str, width: usize) -> String {
  let s = truncate_str(s, width);
  let fill = width.saturating_sub(display_width(&s));
  format!("{}{}", s, " ".repeat(fill))
}

fn checkbox(selection: &SelectionState, item: &ContentItem) -> &'static str {
  if selection.is_selected(item.identity()) { "[x]" } else { "[ ]" }
}

fn progress(pages_read: u32, pages: u32) -> String {
  if pages == 0 { "-".to_string() } else { format!("{}%", (pages_read.min(pages) as u64 * 100) / pages as u64) }
}

struct Column {
  header: &'static str,
  max_width: usize,
  cell: fn(&ContentItem) -> String,
}

fn columns(kind: ContentKind) -> Vec<Column> {
  let title = Column { header: "Title", max_width: 40, cell: |i| i.title().to_string() };
  let status = Column { header: "Status", max_width: 12, cell: |i| i.status().unwrap_or("-").to_string() };
  match kind {
    ContentKind::Video => vec![
      title,
      Column { header: "Presenter", max_width: 24, cell: |i| i.presenter().to_string() },
      Column { header: "Duration", max_width: 8, cell: |i| format_duration(i.duration_secs()) },
      status,
      Column { header: "Added", max_width: 10, cell: |i| i.date_added().unwrap_or("-").chars().take(10).collect() },
    ],
    ContentKind::Playlist => vec![
      title,
      Column { header: "Presenter", max_width: 24, cell: |i| i.presenter().to_string() },
      Column {
        header: "Videos",
        max_width: 6,
        cell: |i| match i {
          ContentItem::Playlist(p) => p.item_count.to_string(),
          _ => String::new(),
        },
      },
      Column { header: "Duration", max_width: 8, cell: |i| format_duration(i.duration_secs()) },
      status,
    ],
    ContentKind::Book => vec![
      title,
      Column { header: "Author", max_width: 24, cell: |i| i.presenter().to_string() },
      Column {
        header: "Progress",
        max_width: 8,
        cell: |i| match i {
          ContentItem::Book(b) => progress(b.pages_read, b.pages),
          _ => String::new(),
        },
      },
      status,
    ],
    ContentKind::Benefit => vec![
      Column {
        header: "Benefit",
        max_width: 48,
        cell: |i| match i {
          ContentItem::Benefit(b) => b.text.split_whitespace().collect::<Vec<_>>().join(" "),
          _ => i.title().to_string(),
        },
      },
      Column { header: "Author", max_width: 20, cell: |i| i.presenter().to_string() },
      Column {
        header: "Source",
        max_width: 24,
        cell: |i| match i {
          ContentItem::Benefit(b) => b.source_title.clone(),
          _ => String::new(),
        },
      },
      Column {
        header: "Location",
        max_width: 10,
        cell: |i| match i {
          ContentItem::Benefit(b) => b.location.clone().unwrap_or_default(),
          _ => String::new(),
        },
      },
    ],
  }
}

// --- Views ---

/// Checkbox column plus the kind's columns, each sized to its widest cell up to a cap.
pub fn render_table(kind: ContentKind, items: &[&ContentItem], selection: &SelectionState) -> String {
  if items.is_empty() {
    return format!("{}\n", EMPTY_MESSAGE);
  }
  let columns = columns(kind);
  let cells: Vec<Vec<String>> = items.iter().map(|item| columns.iter().map(|c| (c.cell)(item)).collect()).collect();
  let widths: Vec<usize> = columns
    .iter()
    .enumerate()
    .map(|(i, col)| {
      let widest = cells.iter().map(|row| display_width(&row[i])).max().unwrap_or(0);
      widest.max(display_width(col.header)).min(col.max_width)
    })
    .collect();

  let mut out = String::new();
  let header: Vec<String> = columns.iter().zip(&widths).map(|(c, w)| pad(c.header, *w)).collect();
  out.push_str(format!("    {}", header.join("  ")).trim_end());
  out.push('\n');
  let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
  out.push_str(&format!("    {}\n", rule.join("  ")));

  for (item, row) in items.iter().zip(&cells) {
    let line: Vec<String> = row.iter().zip(&widths).map(|(cell, w)| pad(cell, *w)).collect();
    out.push_str(format!("{} {}", checkbox(selection, item), line.join("  ")).trim_end());
    out.push('\n');
  }
  out
}

/// One block per item: title line, a meta line, then tags.
pub fn render_cards(items: &[&ContentItem], selection: &SelectionState, width: usize) -> String {
  if items.is_empty() {
    return format!("{}\n", EMPTY_MESSAGE);
  }
  let inner = width.saturating_sub(4).max(10);
  let mut out = String::new();
  for item in items {
    out.push_str(&format!("{} {}\n", checkbox(selection, item), truncate_str(item.title(), inner)));

    let mut meta: Vec<String> = Vec::new();
    if !item.presenter().is_empty() {
      meta.push(item.presenter().to_string());
    }
    match item {
      ContentItem::Video(_) => meta.push(format_duration(item.duration_secs())),
      ContentItem::Playlist(p) => {
        meta.push(format!("{} videos", p.item_count));
        meta.push(format_duration(item.duration_secs()));
      }
      ContentItem::Book(b) => meta.push(format!("{}/{} pages", b.pages_read, b.pages)),
      ContentItem::Benefit(b) => {
        if !b.source_title.is_empty() {
          meta.push(b.source_title.clone());
        }
      }
    }
    if let Some(status) = item.status() {
      meta.push(status.to_string());
    }
    if !meta.is_empty() {
      out.push_str(&format!("    {}\n", truncate_str(&meta.join(" · "), inner)));
    }

    if let ContentItem::Benefit(b) = item
      && !b.text.trim().is_empty()
    {
      out.push_str(&format!("    “{}”\n", truncate_str(b.text.trim(), inner.saturating_sub(2))));
    }
    if !item.tags().is_empty() {
      let tags: Vec<String> = item.tags().iter().map(|t| format!("#{}", t)).collect();
      out.push_str(&format!("    {}\n", truncate_str(&tags.join(" "), inner)));
    }
    out.push('\n');
  }
  out
}

pub fn render_filter_options(options: &FilterOptions) -> String {
  let line = |label: &str, values: &std::collections::BTreeSet<String>| {
    if values.is_empty() {
      format!("{}: -", label)
    } else {
      format!("{}: {}", label, values.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
    }
  };
  let lines = [
    line("Statuses", &options.statuses),
    line("Presenters", &options.presenters),
    line("Categories", &options.categories),
    line("Tags", &options.tags),
  ];
  format!("{}\n", lines.join("\n"))
}

/// `Page 2/5 · 43 items · 3 selected`
pub fn render_page_footer(page: usize, total_pages: usize, visible: usize, selected: usize) -> String {
  let mut footer = format!("Page {}/{} · {} item{}", page, total_pages, visible, if visible == 1 { "" } else { "s" });
  if selected > 0 {
    footer.push_str(&format!(" · {} selected", selected));
  }
  footer
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Benefit, Book, Video};

  fn video(path: &str, title: &str) -> ContentItem {
    ContentItem::Video(Video {
      file_path: path.to_string(),
      title: title.to_string(),
      presenter: "Shaykh".to_string(),
      duration: "01:02:03".to_string(),
      status: "done".to_string(),
      tags: vec!["fiqh/sales".to_string()],
      ..Video::default()
    })
  }

  // --- truncate_str ---

  #[test]
  fn truncate_short_string_unchanged() {
    assert_eq!(truncate_str("hello", 10), "hello");
    assert_eq!(truncate_str("hello", 5), "hello");
  }

  #[test]
  fn truncate_long_string_gets_ellipsis() {
    assert_eq!(truncate_str("hello world", 6), "hello…");
  }

  #[test]
  fn truncate_counts_wide_chars() {
    // Each CJK char is two columns.
    let out = truncate_str("日本語テキスト", 7);
    assert_eq!(out, "日本語…");
    assert!(display_width(&out) <= 7);
  }

  #[test]
  fn truncate_zero_width() {
    assert_eq!(truncate_str("abc", 0), "");
  }

  // --- render_table ---

  #[test]
  fn table_marks_selected_rows() {
    let a = video("a.md", "Alpha");
    let b = video("b.md", "Beta");
    let mut selection = SelectionState::new();
    selection.toggle_item("b.md", true);
    let out = render_table(ContentKind::Video, &[&a, &b], &selection);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].contains("Title") && lines[0].contains("Presenter") && lines[0].contains("Duration"));
    assert!(lines[2].starts_with("[ ] Alpha"));
    assert!(lines[3].starts_with("[x] Beta"));
    assert!(lines[3].contains("01:02:03"));
  }

  #[test]
  fn table_truncates_long_titles() {
    let long = video("a.md", &"x".repeat(100));
    let out = render_table(ContentKind::Video, &[&long], &SelectionState::new());
    assert!(out.contains('…'));
    assert!(!out.contains(&"x".repeat(41)));
  }

  #[test]
  fn table_columns_follow_kind() {
    let book = ContentItem::Book(Book {
      file_path: "b.md".to_string(),
      title: "Riyad".to_string(),
      author: "Nawawi".to_string(),
      pages: 200,
      pages_read: 50,
      ..Book::default()
    });
    let out = render_table(ContentKind::Book, &[&book], &SelectionState::new());
    assert!(out.contains("Author"));
    assert!(out.contains("25%"));
    assert!(!out.contains("Duration"));
  }

  #[test]
  fn empty_table_message() {
    assert_eq!(render_table(ContentKind::Video, &[], &SelectionState::new()), format!("{}\n", EMPTY_MESSAGE));
  }

  // --- render_cards ---

  #[test]
  fn cards_show_meta_and_tags() {
    let a = video("a.md", "Alpha");
    let out = render_cards(&[&a], &SelectionState::new(), 80);
    assert!(out.starts_with("[ ] Alpha\n"));
    assert!(out.contains("Shaykh · 01:02:03 · done"));
    assert!(out.contains("#fiqh/sales"));
  }

  #[test]
  fn benefit_card_quotes_text() {
    let benefit = ContentItem::Benefit(Benefit {
      id: "b1".to_string(),
      title: "Patience".to_string(),
      text: "Patience is light".to_string(),
      source_title: "Riyad".to_string(),
      ..Benefit::default()
    });
    let out = render_cards(&[&benefit], &SelectionState::new(), 80);
    assert!(out.contains("Riyad"));
    assert!(out.contains("“Patience is light”"));
  }

  // --- render_filter_options / footer ---

  #[test]
  fn filter_options_summary() {
    let a = video("a.md", "Alpha");
    let out = render_filter_options(&FilterOptions::collect([&a]));
    assert!(out.contains("Statuses: done"));
    assert!(out.contains("Categories: -"));
    assert!(out.contains("Tags: fiqh/sales"));
  }

  #[test]
  fn footer_counts() {
    assert_eq!(render_page_footer(1, 1, 1, 0), "Page 1/1 · 1 item");
    assert_eq!(render_page_footer(2, 5, 43, 3), "Page 2/5 · 43 items · 3 selected");
  }
}
