//! Filter/sort/paginate engine over an in-memory collection.
//!
//! Stages run in a fixed order: status, presenter, category, tag, date range,
//! free-text search, then a stable sort. Pagination is a separate slice step so
//! renderers can page over the same derived list. Nothing here touches storage.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{ContentItem, SortField, SortValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn toggled(self) -> Self {
    match self {
      SortOrder::Asc => SortOrder::Desc,
      SortOrder::Desc => SortOrder::Asc,
    }
  }
}

/// Per-view filter, sort and pagination state. Empty sets mean "no filter".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
  pub statuses: BTreeSet<String>,
  /// Presenters for videos/playlists, authors for books/benefits.
  pub presenters: BTreeSet<String>,
  pub categories: BTreeSet<String>,
  pub tags: BTreeSet<String>,
  /// Inclusive start day.
  pub date_from: Option<NaiveDate>,
  /// Inclusive end day; items added at any time on this day match.
  pub date_to: Option<NaiveDate>,
  pub search: String,
  /// 1-based.
  pub page: usize,
  pub items_per_page: usize,
  pub sort_field: SortField,
  pub sort_order: SortOrder,
}

impl FilterState {
  pub fn new(items_per_page: usize) -> Self {
    Self {
      statuses: BTreeSet::new(),
      presenters: BTreeSet::new(),
      categories: BTreeSet::new(),
      tags: BTreeSet::new(),
      date_from: None,
      date_to: None,
      search: String::new(),
      page: 1,
      items_per_page: items_per_page.max(1),
      sort_field: SortField::default(),
      sort_order: SortOrder::default(),
    }
  }

  /// Clear every filter, keeping sort and page size.
  pub fn reset_filters(&mut self) {
    self.statuses.clear();
    self.presenters.clear();
    self.categories.clear();
    self.tags.clear();
    self.date_from = None;
    self.date_to = None;
    self.search.clear();
    self.page = 1;
  }

  pub fn has_active_filters(&self) -> bool {
    !self.statuses.is_empty()
      || !self.presenters.is_empty()
      || !self.categories.is_empty()
      || !self.tags.is_empty()
      || self.date_from.is_some()
      || self.date_to.is_some()
      || !self.search.trim().is_empty()
  }
}

impl Default for FilterState {
  fn default() -> Self {
    Self::new(crate::constants::constants().items_per_page)
  }
}

/// `/`-path match: equal, or either side is an ancestor of the other.
pub fn hierarchical_match(value: &str, selected: &str) -> bool {
  value == selected
    || value.strip_prefix(selected).is_some_and(|rest| rest.starts_with('/'))
    || selected.strip_prefix(value).is_some_and(|rest| rest.starts_with('/'))
}

fn matches_hierarchy(values: &[String], selected: &BTreeSet<String>) -> bool {
  selected.is_empty() || values.iter().any(|v| selected.iter().any(|s| hierarchical_match(v, s)))
}

/// Parse a `dateAdded` value. Accepts plain dates, naive datetimes and RFC 3339.
pub fn parse_item_date(s: &str) -> Option<NaiveDateTime> {
  let s = s.trim();
  if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return Some(d.and_time(NaiveTime::MIN));
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.naive_local());
  }
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn in_date_range(item: &ContentItem, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
  if from.is_none() && to.is_none() {
    return true;
  }
  let Some(added) = item.date_added().and_then(parse_item_date) else {
    return false;
  };
  // Comparing calendar days makes `to` cover the whole day.
  let day = added.date();
  from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
}

fn matches_search(item: &ContentItem, needle: &str) -> bool {
  if item.title().to_lowercase().contains(needle) {
    return true;
  }
  item.search_fields().iter().any(|f| f.to_lowercase().contains(needle))
}

/// Run every filter stage, keeping input order.
pub fn apply_filters<'a>(items: &'a [ContentItem], state: &FilterState) -> Vec<&'a ContentItem> {
  let needle = state.search.trim().to_lowercase();
  items
    .iter()
    .filter(|item| state.statuses.is_empty() || item.status().is_some_and(|s| state.statuses.contains(s)))
    .filter(|item| state.presenters.is_empty() || state.presenters.contains(item.presenter()))
    .filter(|item| matches_hierarchy(item.categories(), &state.categories))
    .filter(|item| matches_hierarchy(item.tags(), &state.tags))
    .filter(|item| in_date_range(item, state.date_from, state.date_to))
    .filter(|item| needle.is_empty() || matches_search(item, &needle))
    .collect()
}

fn compare_values(a: &SortValue, b: &SortValue) -> Ordering {
  match (a, b) {
    (SortValue::Number(x), SortValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
    (SortValue::Text(x), SortValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
    (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
    (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
  }
}

/// Stable sort; ties keep their prior relative order in both directions.
pub fn sort_items(items: &mut [&ContentItem], field: SortField, order: SortOrder) {
  items.sort_by(|a, b| {
    let ord = compare_values(&a.sort_value(field), &b.sort_value(field));
    match order {
      SortOrder::Asc => ord,
      SortOrder::Desc => ord.reverse(),
    }
  });
}

/// Filter then sort: the full visible list before pagination.
pub fn filter_and_sort<'a>(items: &'a [ContentItem], state: &FilterState) -> Vec<&'a ContentItem> {
  let mut visible = apply_filters(items, state);
  sort_items(&mut visible, state.sort_field, state.sort_order);
  visible
}

pub fn total_pages(len: usize, items_per_page: usize) -> usize {
  len.div_ceil(items_per_page.max(1)).max(1)
}

/// Slice `[(page-1)*n, page*n)` clamped to the collection length.
pub fn paginate<T>(items: &[T], page: usize, items_per_page: usize) -> &[T] {
  let per_page = items_per_page.max(1);
  let start = page.saturating_sub(1).saturating_mul(per_page).min(items.len());
  let end = start.saturating_add(per_page).min(items.len());
  &items[start..end]
}

/// Distinct filter values still reachable from a (filtered) collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
  pub statuses: BTreeSet<String>,
  pub presenters: BTreeSet<String>,
  pub categories: BTreeSet<String>,
  pub tags: BTreeSet<String>,
}

impl FilterOptions {
  pub fn collect<'a>(items: impl IntoIterator<Item = &'a ContentItem>) -> Self {
    let mut options = Self::default();
    for item in items {
      if let Some(status) = item.status() {
        options.statuses.insert(status.to_string());
      }
      if !item.presenter().is_empty() {
        options.presenters.insert(item.presenter().to_string());
      }
      options.categories.extend(item.categories().iter().filter(|c| !c.is_empty()).cloned());
      options.tags.extend(item.tags().iter().filter(|t| !t.is_empty()).cloned());
    }
    options
  }
}
