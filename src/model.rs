use serde::{Deserialize, Serialize};
use std::fmt;

use crate::duration::duration_secs_or_zero;
use crate::filter::parse_item_date;

/// Discriminant of [`ContentItem`]; each kind is its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
  Video,
  Playlist,
  Book,
  Benefit,
}

impl ContentKind {
  pub const ALL: [ContentKind; 4] = [ContentKind::Video, ContentKind::Playlist, ContentKind::Book, ContentKind::Benefit];

  pub fn label(self) -> &'static str {
    match self {
      ContentKind::Video => "video",
      ContentKind::Playlist => "playlist",
      ContentKind::Book => "book",
      ContentKind::Benefit => "benefit",
    }
  }
}

impl fmt::Display for ContentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Video {
  pub file_path: String,
  pub title: String,
  pub url: String,
  pub video_id: String,
  pub presenter: String,
  /// `HH:MM:SS`
  pub duration: String,
  pub status: String,
  pub date_added: Option<String>,
  pub thumbnail: Option<String>,
  pub categories: Vec<String>,
  pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Playlist {
  pub file_path: String,
  pub title: String,
  pub url: String,
  pub playlist_id: String,
  pub presenter: String,
  pub item_count: u32,
  /// `HH:MM:SS`
  pub duration: String,
  pub status: String,
  pub date_added: Option<String>,
  pub thumbnail: Option<String>,
  pub categories: Vec<String>,
  pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
  pub file_path: String,
  pub title: String,
  pub author: String,
  pub publisher: Option<String>,
  pub isbn: Option<String>,
  pub pages: u32,
  pub pages_read: u32,
  pub status: String,
  pub date_added: Option<String>,
  pub categories: Vec<String>,
  pub tags: Vec<String>,
}

/// A note or quote extracted from a book or video.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Benefit {
  pub id: String,
  pub title: String,
  pub text: String,
  pub author: String,
  pub source_title: String,
  pub source_path: String,
  /// Page number or timestamp within the source.
  pub location: Option<String>,
  pub status: Option<String>,
  pub date_added: Option<String>,
  pub categories: Vec<String>,
  pub tags: Vec<String>,
}

/// A tracked item in the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentItem {
  Video(Video),
  Playlist(Playlist),
  Book(Book),
  Benefit(Benefit),
}

/// Comparable value of an item field, used by the sort stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
  Text(String),
  Number(f64),
}

/// Fields the engine knows how to sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
  Title,
  Presenter,
  Status,
  #[default]
  DateAdded,
  Duration,
  ItemCount,
  Pages,
  Progress,
}

impl SortField {
  pub fn is_numeric(self) -> bool {
    matches!(self, SortField::Duration | SortField::ItemCount | SortField::Pages | SortField::Progress)
  }

  pub fn from_name(s: &str) -> Option<Self> {
    match s.to_lowercase().replace(['-', '_'], "").as_str() {
      "title" => Some(SortField::Title),
      "presenter" | "author" => Some(SortField::Presenter),
      "status" => Some(SortField::Status),
      "dateadded" | "date" => Some(SortField::DateAdded),
      "duration" => Some(SortField::Duration),
      "itemcount" | "count" => Some(SortField::ItemCount),
      "pages" => Some(SortField::Pages),
      "progress" => Some(SortField::Progress),
      _ => None,
    }
  }
}

impl ContentItem {
  pub fn kind(&self) -> ContentKind {
    match self {
      ContentItem::Video(_) => ContentKind::Video,
      ContentItem::Playlist(_) => ContentKind::Playlist,
      ContentItem::Book(_) => ContentKind::Book,
      ContentItem::Benefit(_) => ContentKind::Benefit,
    }
  }

  /// Selection key and mutation target: `filePath` for notes, `id` for benefits.
  pub fn identity(&self) -> &str {
    match self {
      ContentItem::Video(v) => &v.file_path,
      ContentItem::Playlist(p) => &p.file_path,
      ContentItem::Book(b) => &b.file_path,
      ContentItem::Benefit(b) => &b.id,
    }
  }

  pub fn title(&self) -> &str {
    match self {
      ContentItem::Video(v) => &v.title,
      ContentItem::Playlist(p) => &p.title,
      ContentItem::Book(b) => &b.title,
      ContentItem::Benefit(b) => &b.title,
    }
  }

  /// Presenter for videos and playlists, author for books and benefits.
  pub fn presenter(&self) -> &str {
    match self {
      ContentItem::Video(v) => &v.presenter,
      ContentItem::Playlist(p) => &p.presenter,
      ContentItem::Book(b) => &b.author,
      ContentItem::Benefit(b) => &b.author,
    }
  }

  pub fn status(&self) -> Option<&str> {
    let status = match self {
      ContentItem::Video(v) => Some(v.status.as_str()),
      ContentItem::Playlist(p) => Some(p.status.as_str()),
      ContentItem::Book(b) => Some(b.status.as_str()),
      ContentItem::Benefit(b) => b.status.as_deref(),
    };
    status.filter(|s| !s.is_empty())
  }

  pub fn set_status(&mut self, status: &str) {
    match self {
      ContentItem::Video(v) => v.status = status.to_string(),
      ContentItem::Playlist(p) => p.status = status.to_string(),
      ContentItem::Book(b) => b.status = status.to_string(),
      ContentItem::Benefit(b) => b.status = Some(status.to_string()),
    }
  }

  pub fn date_added(&self) -> Option<&str> {
    match self {
      ContentItem::Video(v) => v.date_added.as_deref(),
      ContentItem::Playlist(p) => p.date_added.as_deref(),
      ContentItem::Book(b) => b.date_added.as_deref(),
      ContentItem::Benefit(b) => b.date_added.as_deref(),
    }
  }

  pub fn categories(&self) -> &[String] {
    match self {
      ContentItem::Video(v) => &v.categories,
      ContentItem::Playlist(p) => &p.categories,
      ContentItem::Book(b) => &b.categories,
      ContentItem::Benefit(b) => &b.categories,
    }
  }

  pub fn tags(&self) -> &[String] {
    match self {
      ContentItem::Video(v) => &v.tags,
      ContentItem::Playlist(p) => &p.tags,
      ContentItem::Book(b) => &b.tags,
      ContentItem::Benefit(b) => &b.tags,
    }
  }

  fn tags_mut(&mut self) -> &mut Vec<String> {
    match self {
      ContentItem::Video(v) => &mut v.tags,
      ContentItem::Playlist(p) => &mut p.tags,
      ContentItem::Book(b) => &mut b.tags,
      ContentItem::Benefit(b) => &mut b.tags,
    }
  }

  /// Add a tag unless already present. Returns whether the item changed.
  pub fn add_tag(&mut self, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || self.tags().iter().any(|t| t == tag) {
      return false;
    }
    self.tags_mut().push(tag.to_string());
    true
  }

  /// Duration in seconds; zero for kinds without one.
  pub fn duration_secs(&self) -> u64 {
    match self {
      ContentItem::Video(v) => duration_secs_or_zero(&v.duration),
      ContentItem::Playlist(p) => duration_secs_or_zero(&p.duration),
      ContentItem::Book(_) | ContentItem::Benefit(_) => 0,
    }
  }

  /// Secondary fields matched by free-text search, besides the title.
  pub fn search_fields(&self) -> Vec<&str> {
    let mut fields: Vec<&str> = match self {
      ContentItem::Video(v) => vec![v.presenter.as_str(), v.url.as_str()],
      ContentItem::Playlist(p) => vec![p.presenter.as_str(), p.url.as_str()],
      ContentItem::Book(b) => {
        let mut f = vec![b.author.as_str()];
        f.extend(b.publisher.as_deref());
        f.extend(b.isbn.as_deref());
        f
      }
      ContentItem::Benefit(b) => vec![b.text.as_str(), b.author.as_str(), b.source_title.as_str()],
    };
    fields.extend(self.tags().iter().map(String::as_str));
    fields.extend(self.categories().iter().map(String::as_str));
    fields
  }

  /// Value of `field` for sorting. Fields the variant lacks yield the field's zero value.
  pub fn sort_value(&self, field: SortField) -> SortValue {
    match field {
      SortField::Title => SortValue::Text(self.title().to_string()),
      SortField::Presenter => SortValue::Text(self.presenter().to_string()),
      SortField::Status => SortValue::Text(self.status().unwrap_or_default().to_string()),
      SortField::DateAdded => {
        let raw = self.date_added().unwrap_or_default();
        match parse_item_date(raw) {
          Some(added) => SortValue::Number(added.and_utc().timestamp() as f64),
          None => SortValue::Text(raw.to_string()),
        }
      }
      SortField::Duration => SortValue::Number(self.duration_secs() as f64),
      SortField::ItemCount => match self {
        ContentItem::Playlist(p) => SortValue::Number(p.item_count as f64),
        _ => SortValue::Number(0.0),
      },
      SortField::Pages => match self {
        ContentItem::Book(b) => SortValue::Number(b.pages as f64),
        _ => SortValue::Number(0.0),
      },
      SortField::Progress => match self {
        ContentItem::Book(b) if b.pages > 0 => SortValue::Number(b.pages_read as f64 / b.pages as f64),
        _ => SortValue::Number(0.0),
      },
    }
  }
}
