use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Config;
use crate::filter::{FilterOptions, FilterState, SortOrder, filter_and_sort, paginate, total_pages};
use crate::library::Library;
use crate::model::{ContentItem, ContentKind, SortField};
use crate::selection::SelectionState;

/// How long a notice stays visible before `expire_notice` drops it.
const NOTICE_TTL: Duration = Duration::from_secs(5);

// --- Types ---

/// A user action, applied by [`App::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
  SwitchKind(ContentKind),
  SetSearch(String),
  ToggleStatus(String),
  TogglePresenter(String),
  ToggleCategory(String),
  ToggleTag(String),
  SetDateRange { from: Option<NaiveDate>, to: Option<NaiveDate> },
  /// Choosing the active field again flips the order.
  SortBy(SortField),
  SetSortOrder(SortOrder),
  SetPage(usize),
  NextPage,
  PrevPage,
  SetItemsPerPage(usize),
  ResetFilters,
  ToggleItem { id: String, selected: bool },
  SelectPage,
  DeselectPage,
  ClearSelection,
  SetStatusOnSelection(String),
  AddTagToSelection(String),
}

impl Intent {
  fn changes_filter(&self) -> bool {
    matches!(
      self,
      Intent::SetSearch(_)
        | Intent::ToggleStatus(_)
        | Intent::TogglePresenter(_)
        | Intent::ToggleCategory(_)
        | Intent::ToggleTag(_)
        | Intent::SetDateRange { .. }
        | Intent::SetItemsPerPage(_)
        | Intent::ResetFilters
    )
  }
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub message: String,
  pub is_error: bool,
}

/// Filter and selection state for one content kind.
#[derive(Debug)]
pub struct View {
  pub filter: FilterState,
  pub selection: SelectionState,
}

impl View {
  fn new(items_per_page: usize, default_statuses: Vec<String>) -> Self {
    let mut filter = FilterState::new(items_per_page);
    filter.statuses.extend(default_statuses);
    Self { filter, selection: SelectionState::new() }
  }
}

pub struct App {
  pub library: Library,
  kind: ContentKind,
  views: BTreeMap<ContentKind, View>,
  notice: Option<Notice>,
  notice_time: Option<Instant>,
}

fn toggle(set: &mut BTreeSet<String>, value: String) {
  if !set.remove(&value) {
    set.insert(value);
  }
}

impl App {
  pub fn new(library: Library, items_per_page: usize) -> Self {
    let views = ContentKind::ALL.iter().map(|k| (*k, View::new(items_per_page, Vec::new()))).collect();
    Self { library, kind: ContentKind::Video, views, notice: None, notice_time: None }
  }

  /// Page size and per-kind default statuses come from the user's preferences.
  pub fn with_config(library: Library, config: &Config) -> Self {
    let views = ContentKind::ALL
      .iter()
      .map(|k| (*k, View::new(config.items_per_page(), config.default_statuses_for(*k))))
      .collect();
    Self { library, kind: ContentKind::Video, views, notice: None, notice_time: None }
  }

  pub fn kind(&self) -> ContentKind {
    self.kind
  }

  pub fn view(&self) -> &View {
    self.view_of(self.kind)
  }

  pub fn view_of(&self, kind: ContentKind) -> &View {
    // Safety: every kind gets a view in the constructors and views are never removed.
    &self.views[&kind]
  }

  fn view_mut(&mut self) -> &mut View {
    self.views.entry(self.kind).or_insert_with(|| View::new(crate::constants::constants().items_per_page, Vec::new()))
  }

  pub fn filter(&self) -> &FilterState {
    &self.view().filter
  }

  pub fn selection(&self) -> &SelectionState {
    &self.view().selection
  }

  // --- Notices ---

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }

  fn set_notice(&mut self, message: String, is_error: bool) {
    if is_error {
      warn!(message = %message, "app: notice");
    }
    self.notice = Some(Notice { message, is_error });
    self.notice_time = Some(Instant::now());
  }

  pub fn clear_notice(&mut self) {
    self.notice = None;
    self.notice_time = None;
  }

  /// Drop a notice older than five seconds.
  pub fn expire_notice(&mut self) {
    if let Some(t) = self.notice_time
      && t.elapsed() >= NOTICE_TTL
    {
      self.clear_notice();
    }
  }

  // --- Derived lists ---

  /// Filtered and sorted items of the active kind, before pagination.
  pub fn visible(&self) -> Vec<&ContentItem> {
    filter_and_sort(self.library.items_of(self.kind), self.filter())
  }

  pub fn page_items(&self) -> Vec<&ContentItem> {
    let visible = self.visible();
    let filter = self.filter();
    paginate(&visible, filter.page, filter.items_per_page).to_vec()
  }

  pub fn total_pages(&self) -> usize {
    total_pages(self.visible().len(), self.filter().items_per_page)
  }

  /// Options still reachable from the current filtered list.
  pub fn filter_options(&self) -> FilterOptions {
    FilterOptions::collect(self.visible())
  }

  fn page_ids(&self) -> Vec<String> {
    self.page_items().iter().map(|item| item.identity().to_string()).collect()
  }

  fn clamp_page(&mut self) {
    let pages = self.total_pages();
    let filter = &mut self.view_mut().filter;
    filter.page = filter.page.clamp(1, pages);
  }

  // --- Dispatch ---

  /// Apply one intent. Returns true when the library itself was modified.
  pub fn dispatch(&mut self, intent: Intent) -> bool {
    debug!(?intent, kind = %self.kind, "app: dispatch");
    let resets_page = intent.changes_filter();
    let mut modified = false;

    match intent {
      Intent::SwitchKind(kind) => self.kind = kind,
      Intent::SetSearch(text) => self.view_mut().filter.search = text,
      Intent::ToggleStatus(s) => toggle(&mut self.view_mut().filter.statuses, s),
      Intent::TogglePresenter(p) => toggle(&mut self.view_mut().filter.presenters, p),
      Intent::ToggleCategory(c) => toggle(&mut self.view_mut().filter.categories, c),
      Intent::ToggleTag(t) => toggle(&mut self.view_mut().filter.tags, t),
      Intent::SetDateRange { from, to } => {
        if let (Some(f), Some(t)) = (from, to)
          && f > t
        {
          self.set_notice(format!("Date range is empty: {} is after {}", f, t), true);
          return false;
        }
        let filter = &mut self.view_mut().filter;
        filter.date_from = from;
        filter.date_to = to;
      }
      Intent::SortBy(field) => {
        let filter = &mut self.view_mut().filter;
        if filter.sort_field == field {
          filter.sort_order = filter.sort_order.toggled();
        } else {
          filter.sort_field = field;
        }
      }
      Intent::SetSortOrder(order) => self.view_mut().filter.sort_order = order,
      Intent::SetPage(page) => self.view_mut().filter.page = page,
      Intent::NextPage => {
        let filter = &mut self.view_mut().filter;
        filter.page = filter.page.saturating_add(1);
      }
      Intent::PrevPage => {
        let filter = &mut self.view_mut().filter;
        filter.page = filter.page.saturating_sub(1);
      }
      Intent::SetItemsPerPage(n) => self.view_mut().filter.items_per_page = n.max(1),
      Intent::ResetFilters => self.view_mut().filter.reset_filters(),
      Intent::ToggleItem { id, selected } => {
        if selected && !self.library.contains(self.kind, &id) {
          self.set_notice(format!("No {} with identity {}", self.kind, id), true);
          return false;
        }
        self.view_mut().selection.toggle_item(&id, selected);
      }
      Intent::SelectPage => {
        let ids = self.page_ids();
        self.view_mut().selection.select_all(ids.iter().map(String::as_str));
      }
      Intent::DeselectPage => {
        let ids = self.page_ids();
        self.view_mut().selection.deselect_all(ids.iter().map(String::as_str));
      }
      Intent::ClearSelection => self.view_mut().selection.clear(),
      Intent::SetStatusOnSelection(status) => {
        let status = status.trim().to_string();
        if status.is_empty() {
          self.set_notice("Status cannot be empty".to_string(), true);
          return false;
        }
        modified = self.apply_to_selection(&format!("status set to \"{}\"", status), |item| {
          let changed = item.status() != Some(status.as_str());
          item.set_status(&status);
          changed
        });
      }
      Intent::AddTagToSelection(tag) => {
        let tag = tag.trim().trim_start_matches('#').to_string();
        if tag.is_empty() {
          self.set_notice("Tag cannot be empty".to_string(), true);
          return false;
        }
        modified = self.apply_to_selection(&format!("tagged #{}", tag), |item| item.add_tag(&tag));
      }
    }

    if resets_page {
      self.view_mut().filter.page = 1;
    }
    self.clamp_page();
    modified
  }

  /// Run `f` on every selected item of the active kind, then prune stale ids.
  /// Returns true if any item changed.
  fn apply_to_selection(&mut self, what: &str, mut f: impl FnMut(&mut ContentItem) -> bool) -> bool {
    let kind = self.kind;
    let ids: Vec<String> = self.view().selection.selected_items().iter().cloned().collect();
    if ids.is_empty() {
      self.set_notice(format!("No {}s selected", kind), true);
      return false;
    }

    let mut changed = 0;
    let mut failed = 0;
    for id in &ids {
      let mut item_changed = false;
      match self.library.update(kind, id, |item| item_changed = f(item)) {
        Ok(()) if item_changed => changed += 1,
        Ok(()) => {}
        Err(e) => {
          warn!(err = %e, id = %id, "app: bulk update skipped item");
          failed += 1;
        }
      }
    }

    let library = &self.library;
    self.views.entry(kind).and_modify(|v| v.selection.retain(|id| library.contains(kind, id)));

    if failed > 0 {
      self.set_notice(format!("{} of {} {}s {}; {} no longer exist", changed, ids.len(), kind, what, failed), true);
    } else {
      self.set_notice(format!("{} of {} {}s {}", changed, ids.len(), kind, what), false);
    }
    changed > 0
  }
}
