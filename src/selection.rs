//! Checked-item tracking across paginated views.
//!
//! Views run on a single thread, so listeners live behind `Rc<RefCell<..>>` and
//! are invoked synchronously after each mutation.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

/// Payload delivered to listeners after every mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
  pub count: usize,
}

type Listener = Box<dyn FnMut(&SelectionChange)>;

#[derive(Default)]
struct Listeners {
  next_id: u64,
  entries: Vec<(u64, Listener)>,
  /// Set while `entries` is taken out for delivery.
  notifying: bool,
  /// Ids unsubscribed during the current delivery.
  removed: Vec<u64>,
}

/// Handle returned by [`SelectionState::subscribe`].
///
/// `unsubscribe` may be called any number of times, including from inside a
/// listener; it also works after the selection itself has been dropped.
#[derive(Debug, Clone)]
pub struct Subscription {
  id: u64,
  listeners: Weak<RefCell<Listeners>>,
}

impl Subscription {
  pub fn unsubscribe(&self) {
    if let Some(listeners) = self.listeners.upgrade() {
      let mut listeners = listeners.borrow_mut();
      listeners.entries.retain(|(id, _)| *id != self.id);
      if listeners.notifying {
        listeners.removed.push(self.id);
      }
    }
  }
}

/// Selected identities for one content kind.
#[derive(Default)]
pub struct SelectionState {
  selected: BTreeSet<String>,
  listeners: Rc<RefCell<Listeners>>,
}

impl std::fmt::Debug for SelectionState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SelectionState")
      .field("selected", &self.selected)
      .field("listeners", &self.listeners.borrow().entries.len())
      .finish()
  }
}

impl SelectionState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_selected(&self, id: &str) -> bool {
    self.selected.contains(id)
  }

  /// Make membership of `id` match `selected`.
  pub fn toggle_item(&mut self, id: &str, selected: bool) {
    if selected {
      self.selected.insert(id.to_string());
    } else {
      self.selected.remove(id);
    }
    self.notify();
  }

  pub fn select_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
    self.selected.extend(ids.into_iter().map(str::to_string));
    self.notify();
  }

  pub fn deselect_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
    for id in ids {
      self.selected.remove(id);
    }
    self.notify();
  }

  pub fn clear(&mut self) {
    self.selected.clear();
    self.notify();
  }

  pub fn has_selection(&self) -> bool {
    !self.selected.is_empty()
  }

  pub fn selection_count(&self) -> usize {
    self.selected.len()
  }

  pub fn selected_items(&self) -> &BTreeSet<String> {
    &self.selected
  }

  /// Drop selected ids the predicate rejects (e.g. items no longer in the collection).
  /// Notifies only when something was removed.
  pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
    let before = self.selected.len();
    self.selected.retain(|id| keep(id));
    if self.selected.len() != before {
      self.notify();
    }
  }

  pub fn subscribe(&self, listener: impl FnMut(&SelectionChange) + 'static) -> Subscription {
    let mut listeners = self.listeners.borrow_mut();
    let id = listeners.next_id;
    listeners.next_id += 1;
    listeners.entries.push((id, Box::new(listener)));
    Subscription { id, listeners: Rc::downgrade(&self.listeners) }
  }

  /// Listeners run with no borrow held, so they may subscribe or unsubscribe.
  /// Listeners added during delivery are first called on the next change.
  fn notify(&self) {
    let change = SelectionChange { count: self.selected.len() };
    let mut active = {
      let mut listeners = self.listeners.borrow_mut();
      listeners.notifying = true;
      std::mem::take(&mut listeners.entries)
    };
    for (id, listener) in active.iter_mut() {
      if self.listeners.borrow().removed.contains(id) {
        continue;
      }
      listener(&change);
    }
    let mut listeners = self.listeners.borrow_mut();
    listeners.notifying = false;
    let removed = std::mem::take(&mut listeners.removed);
    active.retain(|(id, _)| !removed.contains(id));
    let added = std::mem::replace(&mut listeners.entries, active);
    listeners.entries.extend(added);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  fn counter(selection: &SelectionState) -> (Rc<Cell<usize>>, Subscription) {
    let calls = Rc::new(Cell::new(0));
    let c = Rc::clone(&calls);
    let sub = selection.subscribe(move |_| c.set(c.get() + 1));
    (calls, sub)
  }

  #[test]
  fn toggle_round_trip_notifies_once_per_call() {
    let mut selection = SelectionState::new();
    let (calls, _sub) = counter(&selection);
    selection.toggle_item("x", true);
    assert!(selection.is_selected("x"));
    assert_eq!(calls.get(), 1);
    selection.toggle_item("x", false);
    assert!(!selection.is_selected("x"));
    assert_eq!(calls.get(), 2);
  }

  #[test]
  fn toggle_is_set_not_flip() {
    let mut selection = SelectionState::new();
    selection.toggle_item("x", true);
    selection.toggle_item("x", true);
    assert_eq!(selection.selection_count(), 1);
    selection.toggle_item("y", false);
    assert_eq!(selection.selection_count(), 1);
  }

  #[test]
  fn bulk_operations_are_idempotent() {
    let mut selection = SelectionState::new();
    let (calls, _sub) = counter(&selection);
    selection.select_all(["a", "b"]);
    selection.select_all(["a", "b"]);
    assert_eq!(selection.selection_count(), 2);
    selection.deselect_all(["a", "z"]);
    selection.deselect_all(["a"]);
    assert_eq!(selection.selected_items().iter().collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(calls.get(), 4);
  }

  #[test]
  fn clear_empties_and_notifies() {
    let mut selection = SelectionState::new();
    selection.select_all(["a"]);
    let (calls, _sub) = counter(&selection);
    selection.clear();
    assert!(!selection.has_selection());
    assert_eq!(calls.get(), 1);
  }

  #[test]
  fn listener_sees_post_mutation_count() {
    let mut selection = SelectionState::new();
    let seen = Rc::new(Cell::new(usize::MAX));
    let s = Rc::clone(&seen);
    let _sub = selection.subscribe(move |change| s.set(change.count));
    selection.select_all(["a", "b", "c"]);
    assert_eq!(seen.get(), 3);
  }

  #[test]
  fn unsubscribe_is_idempotent() {
    let mut selection = SelectionState::new();
    let (calls, sub) = counter(&selection);
    let (other_calls, _other) = counter(&selection);
    sub.unsubscribe();
    sub.unsubscribe();
    selection.toggle_item("x", true);
    assert_eq!(calls.get(), 0);
    assert_eq!(other_calls.get(), 1);
  }

  #[test]
  fn one_shot_listener_unsubscribes_itself() {
    let mut selection = SelectionState::new();
    let calls = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let (c, s) = (Rc::clone(&calls), Rc::clone(&slot));
    let sub = selection.subscribe(move |_| {
      c.set(c.get() + 1);
      if let Some(sub) = s.borrow().as_ref() {
        sub.unsubscribe();
      }
    });
    *slot.borrow_mut() = Some(sub);
    let (other_calls, _other) = counter(&selection);

    selection.toggle_item("x", true);
    selection.toggle_item("y", true);
    assert_eq!(calls.get(), 1);
    assert_eq!(other_calls.get(), 2);
  }

  #[test]
  fn listener_can_unsubscribe_a_later_one() {
    let mut selection = SelectionState::new();
    let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let s = Rc::clone(&slot);
    let _first = selection.subscribe(move |_| {
      if let Some(sub) = s.borrow().as_ref() {
        sub.unsubscribe();
      }
    });
    let (calls, second) = counter(&selection);
    *slot.borrow_mut() = Some(second);
    selection.toggle_item("x", true);
    selection.toggle_item("y", true);
    assert_eq!(calls.get(), 0);
  }

  #[test]
  fn listener_can_subscribe_during_notify() {
    let mut selection = SelectionState::new();
    let shared = Rc::clone(&selection.listeners);
    let added = Rc::new(Cell::new(0));
    let late_calls = Rc::new(Cell::new(0));
    let (a, l) = (Rc::clone(&added), Rc::clone(&late_calls));
    let _sub = selection.subscribe(move |_| {
      if a.get() == 0 {
        a.set(1);
        let handle = SelectionState { selected: BTreeSet::new(), listeners: Rc::clone(&shared) };
        let l = Rc::clone(&l);
        let _late = handle.subscribe(move |_| l.set(l.get() + 1));
      }
    });
    selection.toggle_item("x", true);
    assert_eq!(late_calls.get(), 0);
    selection.toggle_item("y", true);
    assert_eq!(late_calls.get(), 1);
  }

  #[test]
  fn unsubscribe_after_drop_is_safe() {
    let selection = SelectionState::new();
    let (_calls, sub) = counter(&selection);
    drop(selection);
    sub.unsubscribe();
  }

  #[test]
  fn retain_drops_stale_ids() {
    let mut selection = SelectionState::new();
    selection.select_all(["keep", "stale"]);
    let (calls, _sub) = counter(&selection);
    selection.retain(|id| id == "keep");
    assert!(selection.is_selected("keep"));
    assert!(!selection.is_selected("stale"));
    assert_eq!(calls.get(), 1);
    selection.retain(|_| true);
    assert_eq!(calls.get(), 1);
  }
}
