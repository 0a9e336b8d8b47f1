//! Duration parsing and formatting.
//!
//! Stored durations are `HH:MM:SS` strings; arithmetic happens in whole seconds.

/// Parse `SS`, `MM:SS` or `HH:MM:SS` into seconds.
///
/// Returns `None` for empty input, non-numeric parts, more than three parts, or overflow.
pub fn parse_duration(s: &str) -> Option<u64> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  let parts: Vec<&str> = s.split(':').collect();
  if parts.len() > 3 {
    return None;
  }
  parts.iter().try_fold(0u64, |acc, part| {
    let n: u64 = part.trim().parse().ok()?;
    acc.checked_mul(60)?.checked_add(n)
  })
}

/// Like [`parse_duration`] but malformed input counts as zero.
pub fn duration_secs_or_zero(s: &str) -> u64 {
  parse_duration(s).unwrap_or(0)
}

/// Format seconds as zero-padded `HH:MM:SS`. Hours are not capped at 24.
pub fn format_duration(total_secs: u64) -> String {
  let hours = total_secs / 3600;
  let minutes = (total_secs % 3600) / 60;
  let seconds = total_secs % 60;
  format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Sum a list of `HH:MM:SS` strings, skipping malformed entries.
pub fn sum_durations<'a>(durations: impl IntoIterator<Item = &'a str>) -> u64 {
  durations.into_iter().map(duration_secs_or_zero).fold(0, u64::saturating_add)
}

/// Parse an ISO 8601 duration as returned by the video API (`PT1H2M3S`, `P1DT2H`).
///
/// Only day/hour/minute/second designators are accepted; fractional seconds are truncated.
pub fn parse_iso8601_duration(s: &str) -> Option<u64> {
  let rest = s.trim().strip_prefix('P')?;
  let mut total = 0u64;
  let mut number = String::new();
  let mut in_time = false;
  let mut seen_any = false;

  for c in rest.chars() {
    match c {
      'T' if !in_time && number.is_empty() => in_time = true,
      '0'..='9' | '.' => number.push(c),
      'D' | 'H' | 'M' | 'S' => {
        if number.is_empty() {
          return None;
        }
        let value = number.split('.').next().unwrap_or("").parse::<u64>().ok()?;
        let multiplier = match (c, in_time) {
          ('D', false) => 86_400,
          ('H', true) => 3600,
          ('M', true) => 60,
          ('S', true) => 1,
          _ => return None,
        };
        total = total.checked_add(value.checked_mul(multiplier)?)?;
        number.clear();
        seen_any = true;
      }
      _ => return None,
    }
  }

  if !number.is_empty() || !seen_any {
    return None;
  }
  Some(total)
}

/// Parse human-readable lengths such as `"3 hours, 2 minutes, 5 seconds"`.
///
/// Units may be singular or plural and appear in any order; `days` is accepted.
pub fn parse_human_duration(s: &str) -> Option<u64> {
  let mut total = 0u64;
  let mut seen_any = false;
  let mut pending: Option<u64> = None;

  for token in s.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
    if let Ok(n) = token.parse::<u64>() {
      pending = Some(n);
      continue;
    }
    let Some(n) = pending.take() else { continue };
    let unit = token.to_lowercase();
    let multiplier = if unit.starts_with("day") {
      86_400
    } else if unit.starts_with("hour") {
      3600
    } else if unit.starts_with("minute") {
      60
    } else if unit.starts_with("second") {
      1
    } else {
      continue;
    };
    total = total.checked_add(n.checked_mul(multiplier)?)?;
    seen_any = true;
  }

  seen_any.then_some(total)
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- parse_duration ---

  #[test]
  fn parse_full_form() {
    assert_eq!(parse_duration("01:02:03"), Some(3723));
    assert_eq!(parse_duration("10:00:00"), Some(36_000));
  }

  #[test]
  fn parse_short_forms() {
    assert_eq!(parse_duration("02:03"), Some(123));
    assert_eq!(parse_duration("45"), Some(45));
    assert_eq!(parse_duration(" 1:05 "), Some(65));
  }

  #[test]
  fn parse_rejects_garbage() {
    assert_eq!(parse_duration(""), None);
    assert_eq!(parse_duration("ab:cd"), None);
    assert_eq!(parse_duration("1:2:3:4"), None);
    assert_eq!(duration_secs_or_zero("nope"), 0);
  }

  #[test]
  fn parse_overflow_is_none() {
    assert_eq!(parse_duration("307445734561825861:00"), None);
    assert_eq!(parse_duration("18446744073709551615:00:00"), None);
    assert_eq!(duration_secs_or_zero("307445734561825861:00"), 0);
  }

  // --- format_duration ---

  #[test]
  fn format_pads_components() {
    assert_eq!(format_duration(0), "00:00:00");
    assert_eq!(format_duration(3723), "01:02:03");
    assert_eq!(format_duration(100 * 3600), "100:00:00");
  }

  #[test]
  fn format_then_parse_is_identity() {
    for secs in [0, 59, 60, 3599, 3600, 86_399, 90_061] {
      assert_eq!(parse_duration(&format_duration(secs)), Some(secs));
    }
  }

  #[test]
  fn sum_skips_malformed() {
    assert_eq!(sum_durations(["00:01:00", "bad", "00:00:30"]), 90);
  }

  #[test]
  fn sum_saturates() {
    assert_eq!(sum_durations(["18446744073709551615", "10"]), u64::MAX);
  }

  // --- parse_iso8601_duration ---

  #[test]
  fn iso_time_components() {
    assert_eq!(parse_iso8601_duration("PT1H2M3S"), Some(3723));
    assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
    assert_eq!(parse_iso8601_duration("PT10M"), Some(600));
  }

  #[test]
  fn iso_days() {
    assert_eq!(parse_iso8601_duration("P1DT2H"), Some(93_600));
    assert_eq!(parse_iso8601_duration("P0D"), Some(0));
  }

  #[test]
  fn iso_rejects_malformed() {
    assert_eq!(parse_iso8601_duration("1H"), None);
    assert_eq!(parse_iso8601_duration("PT"), None);
    assert_eq!(parse_iso8601_duration("PTH"), None);
    assert_eq!(parse_iso8601_duration("PT5"), None);
    assert_eq!(parse_iso8601_duration("P1M"), None);
  }

  #[test]
  fn iso_overflow_is_none() {
    assert_eq!(parse_iso8601_duration("PT18446744073709551615H"), None);
    assert_eq!(parse_iso8601_duration("PT18446744073709551615S1S"), None);
  }

  // --- parse_human_duration ---

  #[test]
  fn human_full_sentence() {
    assert_eq!(parse_human_duration("3 hours, 2 minutes, 5 seconds"), Some(3 * 3600 + 125));
  }

  #[test]
  fn human_singular_and_days() {
    assert_eq!(parse_human_duration("1 day, 1 hour, 1 minute, 1 second"), Some(90_061));
  }

  #[test]
  fn human_embedded_in_text() {
    assert_eq!(parse_human_duration("Total length: 12 minutes, 30 seconds"), Some(750));
  }

  #[test]
  fn human_without_units() {
    assert_eq!(parse_human_duration("Total length unknown"), None);
    assert_eq!(parse_human_duration("42"), None);
  }

  #[test]
  fn human_overflow_is_none() {
    assert_eq!(parse_human_duration("Total length: 999999999999999999 days"), None);
  }
}
