//! In-memory content collection, one ordered list per content kind.
//!
//! Identity is unique within a kind; the same path may exist as a video and a book.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::model::{ContentItem, ContentKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Library {
  collections: BTreeMap<ContentKind, Vec<ContentItem>>,
}

/// Summary figures for one content kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindStats {
  pub count: usize,
  pub total_duration_secs: u64,
  pub by_status: BTreeMap<String, usize>,
  pub without_status: usize,
}

impl Library {
  pub fn new() -> Self {
    Self::default()
  }

  fn position(&self, kind: ContentKind, id: &str) -> Option<usize> {
    self.collections.get(&kind)?.iter().position(|item| item.identity() == id)
  }

  pub fn contains(&self, kind: ContentKind, id: &str) -> bool {
    self.position(kind, id).is_some()
  }

  pub fn get(&self, kind: ContentKind, id: &str) -> Option<&ContentItem> {
    let idx = self.position(kind, id)?;
    self.collections.get(&kind).map(|items| &items[idx])
  }

  /// Add a new item. Fails on an empty or already-present identity.
  pub fn insert(&mut self, item: ContentItem) -> Result<()> {
    let kind = item.kind();
    if item.identity().trim().is_empty() {
      bail!("{} \"{}\" has no identity", kind, item.title());
    }
    if self.contains(kind, item.identity()) {
      bail!("{} with identity {:?} already exists", kind, item.identity());
    }
    self.collections.entry(kind).or_default().push(item);
    Ok(())
  }

  /// Insert, or replace in place when the identity already exists. Returns true on replace.
  pub fn upsert(&mut self, item: ContentItem) -> bool {
    let kind = item.kind();
    match self.position(kind, item.identity()) {
      Some(idx) => {
        if let Some(items) = self.collections.get_mut(&kind) {
          items[idx] = item;
        }
        true
      }
      None => {
        self.collections.entry(kind).or_default().push(item);
        false
      }
    }
  }

  /// Mutate one item in place. The closure may not change the item's kind or identity.
  pub fn update(&mut self, kind: ContentKind, id: &str, f: impl FnOnce(&mut ContentItem)) -> Result<()> {
    let idx = self.position(kind, id).with_context(|| format!("no {} with identity {:?}", kind, id))?;
    let Some(items) = self.collections.get_mut(&kind) else {
      bail!("no {} collection", kind);
    };
    let before = items[idx].clone();
    f(&mut items[idx]);
    if items[idx].kind() != kind || items[idx].identity() != id {
      items[idx] = before;
      bail!("update of {} {:?} tried to change its identity", kind, id);
    }
    Ok(())
  }

  pub fn remove(&mut self, kind: ContentKind, id: &str) -> Option<ContentItem> {
    let idx = self.position(kind, id)?;
    self.collections.get_mut(&kind).map(|items| items.remove(idx))
  }

  /// Items of one kind in insertion order.
  pub fn items_of(&self, kind: ContentKind) -> &[ContentItem] {
    self.collections.get(&kind).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.collections.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn stats(&self, kind: ContentKind) -> KindStats {
    let mut stats = KindStats::default();
    for item in self.items_of(kind) {
      stats.count += 1;
      stats.total_duration_secs = stats.total_duration_secs.saturating_add(item.duration_secs());
      match item.status() {
        Some(status) => *stats.by_status.entry(status.to_string()).or_default() += 1,
        None => stats.without_status += 1,
      }
    }
    stats
  }

  /// Read a JSON array of tagged items. Duplicate identities are an error.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let items: Vec<ContentItem> =
      serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    let mut library = Self::new();
    for item in items {
      library.insert(item).with_context(|| format!("Invalid library {}", path.display()))?;
    }
    info!(path = %path.display(), items = library.len(), "library: loaded");
    Ok(library)
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let items: Vec<&ContentItem> = self.collections.values().flatten().collect();
    let json = serde_json::to_string_pretty(&items).context("Failed to serialize library")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), items = items.len(), "library: saved");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Benefit, Book, Video};

  fn video(path: &str, status: &str, duration: &str) -> ContentItem {
    ContentItem::Video(Video {
      file_path: path.to_string(),
      title: path.to_string(),
      status: status.to_string(),
      duration: duration.to_string(),
      ..Video::default()
    })
  }

  // --- insert ---

  #[test]
  fn insert_rejects_duplicate_identity() {
    let mut library = Library::new();
    library.insert(video("a.md", "", "")).unwrap();
    assert!(library.insert(video("a.md", "done", "")).is_err());
    assert_eq!(library.len(), 1);
  }

  #[test]
  fn identity_is_scoped_per_kind() {
    let mut library = Library::new();
    library.insert(video("a.md", "", "")).unwrap();
    let book = ContentItem::Book(Book { file_path: "a.md".to_string(), ..Book::default() });
    library.insert(book).unwrap();
    assert_eq!(library.items_of(ContentKind::Video).len(), 1);
    assert_eq!(library.items_of(ContentKind::Book).len(), 1);
  }

  #[test]
  fn insert_rejects_empty_identity() {
    let mut library = Library::new();
    assert!(library.insert(ContentItem::Benefit(Benefit::default())).is_err());
  }

  // --- upsert / update / remove ---

  #[test]
  fn upsert_replaces_in_place() {
    let mut library = Library::new();
    library.insert(video("a.md", "", "")).unwrap();
    library.insert(video("b.md", "", "")).unwrap();
    assert!(library.upsert(video("a.md", "done", "")));
    assert!(!library.upsert(video("c.md", "", "")));
    let ids: Vec<&str> = library.items_of(ContentKind::Video).iter().map(|i| i.identity()).collect();
    assert_eq!(ids, vec!["a.md", "b.md", "c.md"]);
    assert_eq!(library.get(ContentKind::Video, "a.md").and_then(|i| i.status()), Some("done"));
  }

  #[test]
  fn update_mutates_and_guards_identity() {
    let mut library = Library::new();
    library.insert(video("a.md", "", "")).unwrap();
    library.update(ContentKind::Video, "a.md", |item| item.set_status("watching")).unwrap();
    assert_eq!(library.get(ContentKind::Video, "a.md").and_then(|i| i.status()), Some("watching"));

    let err = library.update(ContentKind::Video, "a.md", |item| {
      if let ContentItem::Video(v) = item {
        v.file_path = "moved.md".to_string();
      }
    });
    assert!(err.is_err());
    assert!(library.contains(ContentKind::Video, "a.md"));
    assert!(library.update(ContentKind::Video, "missing.md", |_| {}).is_err());
  }

  #[test]
  fn remove_returns_item() {
    let mut library = Library::new();
    library.insert(video("a.md", "", "")).unwrap();
    assert!(library.remove(ContentKind::Video, "a.md").is_some());
    assert!(library.remove(ContentKind::Video, "a.md").is_none());
    assert!(library.is_empty());
  }

  // --- stats ---

  #[test]
  fn stats_sum_durations_and_statuses() {
    let mut library = Library::new();
    library.insert(video("a.md", "done", "01:00:00")).unwrap();
    library.insert(video("b.md", "done", "00:30:00")).unwrap();
    library.insert(video("c.md", "", "garbage")).unwrap();
    let stats = library.stats(ContentKind::Video);
    assert_eq!(stats.count, 3);
    assert_eq!(stats.total_duration_secs, 5400);
    assert_eq!(stats.by_status.get("done"), Some(&2));
    assert_eq!(stats.without_status, 1);
    assert_eq!(library.stats(ContentKind::Book), KindStats::default());
  }

  #[test]
  fn stats_total_saturates() {
    let mut library = Library::new();
    library.insert(video("a.md", "", "18446744073709551615")).unwrap();
    library.insert(video("b.md", "", "00:00:10")).unwrap();
    assert_eq!(library.stats(ContentKind::Video).total_duration_secs, u64::MAX);
  }

  // --- load / save ---

  #[test]
  fn save_then_load_preserves_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library.json");
    let mut library = Library::new();
    library.insert(video("a.md", "done", "00:10:00")).unwrap();
    library
      .insert(ContentItem::Benefit(Benefit { id: "b1".to_string(), text: "Patience".to_string(), ..Benefit::default() }))
      .unwrap();
    library.save(&path).unwrap();
    assert_eq!(Library::load(&path).unwrap(), library);
  }

  #[test]
  fn load_rejects_duplicates_and_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let dup = dir.path().join("dup.json");
    std::fs::write(&dup, r#"[{"kind":"video","filePath":"a.md"},{"kind":"video","filePath":"a.md"}]"#).unwrap();
    assert!(Library::load(&dup).is_err());

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{not json").unwrap();
    assert!(Library::load(&bad).is_err());
    assert!(Library::load(&dir.path().join("missing.json")).is_err());
  }
}
