//! HTML scraping for the third-party playlist duration services.
//!
//! One service reports a sentence (`Total length: 3 hours, 2 minutes, 5 seconds`),
//! the other a table row (`Total Duration | 03:02:05`). Both shapes are accepted
//! from either page.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::duration::{parse_duration, parse_human_duration};

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("row selector is valid"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").expect("cell selector is valid"));
static TEXT_BLOCK: LazyLock<Selector> =
  LazyLock::new(|| Selector::parse("p, li, span, div, h1, h2, h3, h4, h5, h6").expect("block selector is valid"));

const TOTAL_LABELS: [&str; 3] = ["total length", "total duration", "total time"];

/// Labels that follow the total on the same line and must not be summed into it.
const STOP_WORDS: [&str; 3] = ["average", "at 1.", "at 2"];

/// What a duration service page told us about a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPlaylist {
  pub title: Option<String>,
  pub total_secs: u64,
}

fn element_text(el: ElementRef<'_>) -> String {
  el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Page `<title>`, trimmed, if non-empty.
pub fn page_title(doc: &Html) -> Option<String> {
  doc.select(&TITLE).next().map(element_text).filter(|t| !t.is_empty())
}

fn parse_any_duration(s: &str) -> Option<u64> {
  parse_duration(s).or_else(|| parse_human_duration(s))
}

fn table_duration(doc: &Html) -> Option<u64> {
  doc.select(&ROW).find_map(|row| {
    let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
    let label = cells.first()?.to_lowercase();
    if !TOTAL_LABELS.iter().any(|l| label.contains(l)) {
      return None;
    }
    cells.iter().skip(1).find_map(|c| parse_any_duration(c))
  })
}

fn sentence_duration(doc: &Html) -> Option<u64> {
  let mut best: Option<(usize, u64)> = None;
  for el in doc.select(&TEXT_BLOCK) {
    let text = element_text(el).to_lowercase();
    let Some(start) = TOTAL_LABELS.iter().find_map(|l| text.find(l).map(|i| i + l.len())) else { continue };
    let rest = &text[start..];
    let rest = rest.trim_start_matches([':', ' ', '-']);
    let end = STOP_WORDS.iter().filter_map(|w| rest.find(w)).min().unwrap_or(rest.len());
    let Some(secs) = parse_any_duration(rest[..end].trim().trim_end_matches([',', '.'])) else { continue };
    // Innermost block wins; outer containers repeat the same text with extra noise.
    if best.is_none_or(|(len, _)| text.len() < len) {
      best = Some((text.len(), secs));
    }
  }
  best.map(|(_, secs)| secs)
}

/// Extract a playlist's total duration (in seconds) and page title from a service page.
pub fn scrape_playlist(html: &str) -> Option<ScrapedPlaylist> {
  let doc = Html::parse_document(html);
  let total_secs = table_duration(&doc).or_else(|| sentence_duration(&doc))?;
  Some(ScrapedPlaylist { title: page_title(&doc), total_secs })
}
