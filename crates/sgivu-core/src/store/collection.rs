// ── Paged collection store ──
//
// Per-resource cache of the last fetched flat list and the last fetched
// page envelope, with push-based change notification via `watch` channels.

use std::sync::Arc;

use sgivu_api::Page;
use tokio::sync::watch;

/// Cache for a single resource type.
///
/// Holds the last full listing (`list_all`, kept consistent by create /
/// update / delete) and, separately, the last page envelope (`list_page`).
/// Every mutation that actually changes the list bumps a version counter
/// and publishes a fresh snapshot to subscribers.
pub struct PagedCollectionStore<T: Clone + Send + Sync + 'static> {
    /// Flat list snapshot. Copy-on-write through `Arc::make_mut`.
    items: watch::Sender<Arc<Vec<T>>>,

    /// Last page envelope, if any page was fetched.
    pager: watch::Sender<Option<Arc<Page<T>>>>,

    /// Version counter, bumped on every effective list mutation.
    version: watch::Sender<u64>,

    /// Identifier selector for the cached records.
    id_of: fn(&T) -> i64,
}

impl<T: Clone + Send + Sync + 'static> PagedCollectionStore<T> {
    pub fn new(id_of: fn(&T) -> i64) -> Self {
        let (items, _) = watch::channel(Arc::new(Vec::new()));
        let (pager, _) = watch::channel(None);
        let (version, _) = watch::channel(0u64);

        Self {
            items,
            pager,
            version,
            id_of,
        }
    }

    // ── Read views ───────────────────────────────────────────────────

    /// Get the current list snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        self.items.borrow().clone()
    }

    /// Get the last cached page envelope.
    pub fn pager(&self) -> Option<Arc<Page<T>>> {
        self.pager.borrow().clone()
    }

    /// Look up a cached record by identifier.
    pub fn get(&self, id: i64) -> Option<T> {
        let id_of = self.id_of;
        self.items.borrow().iter().find(|item| id_of(item) == id).cloned()
    }

    /// Subscribe to list snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<T>>> {
        self.items.subscribe()
    }

    /// Subscribe to page envelope changes.
    pub fn subscribe_pager(&self) -> watch::Receiver<Option<Arc<Page<T>>>> {
        self.pager.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole list.
    pub fn replace_all(&self, items: Vec<T>) {
        self.items.send_modify(|snap| *snap = Arc::new(items));
        self.bump_version();
    }

    /// Replace the cached page envelope. The flat list is not touched.
    pub fn set_pager(&self, page: Page<T>) {
        self.pager.send_modify(|p| *p = Some(Arc::new(page)));
    }

    /// Append a record at the end of the list.
    pub fn push(&self, item: T) {
        self.items.send_modify(|snap| Arc::make_mut(snap).push(item));
        self.bump_version();
    }

    /// Replace the record whose identifier matches `item`'s.
    ///
    /// Returns `false` (and leaves the list untouched) when no cached
    /// record has that identifier; nothing is inserted.
    pub fn replace(&self, item: T) -> bool {
        let id_of = self.id_of;
        let id = id_of(&item);
        let changed = self.items.send_if_modified(|snap| {
            let Some(pos) = snap.iter().position(|existing| id_of(existing) == id) else {
                return false;
            };
            Arc::make_mut(snap)[pos] = item;
            true
        });
        if changed {
            self.bump_version();
        }
        changed
    }

    /// Remove every record with the given identifier.
    ///
    /// Returns `false` when nothing matched; the list is left as-is.
    pub fn remove(&self, id: i64) -> bool {
        let id_of = self.id_of;
        let changed = self.items.send_if_modified(|snap| {
            if !snap.iter().any(|item| id_of(item) == id) {
                return false;
            }
            Arc::make_mut(snap).retain(|item| id_of(item) != id);
            true
        });
        if changed {
            self.bump_version();
        }
        changed
    }

    /// Apply `f` to the cached record with the given identifier.
    pub fn modify(&self, id: i64, f: impl FnOnce(&mut T)) -> bool {
        let id_of = self.id_of;
        let changed = self.items.send_if_modified(|snap| {
            let Some(pos) = snap.iter().position(|item| id_of(item) == id) else {
                return false;
            };
            if let Some(item) = Arc::make_mut(snap).get_mut(pos) {
                f(item);
            }
            true
        });
        if changed {
            self.bump_version();
        }
        changed
    }

    /// Drop the list and the page envelope.
    pub fn clear(&self) {
        self.items.send_modify(|snap| *snap = Arc::new(Vec::new()));
        self.pager.send_modify(|p| *p = None);
        self.bump_version();
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: &'static str,
    }

    fn row(id: i64, name: &'static str) -> Row {
        Row { id, name }
    }

    fn store_with(rows: Vec<Row>) -> PagedCollectionStore<Row> {
        let store = PagedCollectionStore::new(|r: &Row| r.id);
        store.replace_all(rows);
        store
    }

    #[test]
    fn push_appends_at_the_end() {
        let store = store_with(vec![row(1, "a")]);
        store.push(row(2, "b"));
        assert_eq!(*store.snapshot(), vec![row(1, "a"), row(2, "b")]);
    }

    #[test]
    fn replace_swaps_only_the_matching_record() {
        let store = store_with(vec![row(4, "a"), row(5, "b"), row(6, "c")]);
        assert!(store.replace(row(5, "B")));
        assert_eq!(*store.snapshot(), vec![row(4, "a"), row(5, "B"), row(6, "c")]);
    }

    #[test]
    fn replace_with_unknown_id_is_a_noop() {
        let store = store_with(vec![row(1, "a")]);
        let before = store.version();
        assert!(!store.replace(row(99, "z")));
        assert_eq!(*store.snapshot(), vec![row(1, "a")]);
        assert_eq!(store.version(), before);
    }

    #[test]
    fn remove_drops_one_record() {
        let store = store_with(vec![row(1, "a"), row(2, "b")]);
        assert!(store.remove(1));
        assert_eq!(*store.snapshot(), vec![row(2, "b")]);
    }

    #[test]
    fn remove_of_absent_id_keeps_length() {
        let store = store_with(vec![row(1, "a"), row(2, "b")]);
        assert!(!store.remove(42));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn modify_updates_in_place() {
        let store = store_with(vec![row(1, "a")]);
        assert!(store.modify(1, |r| r.name = "renamed"));
        assert_eq!(store.get(1).unwrap().name, "renamed");
        assert!(!store.modify(2, |r| r.name = "nope"));
    }

    #[test]
    fn old_snapshots_are_not_mutated() {
        let store = store_with(vec![row(1, "a")]);
        let before = store.snapshot();
        store.replace(row(1, "changed"));
        assert_eq!(before[0].name, "a");
        assert_eq!(store.snapshot()[0].name, "changed");
    }

    #[test]
    fn set_pager_leaves_list_alone() {
        let store = store_with(vec![row(1, "a")]);
        store.set_pager(Page::from_slice(vec![row(9, "p")], 0, 10, 1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.pager().unwrap().content[0].id, 9);
    }

    #[test]
    fn subscribers_see_mutations() {
        let store = store_with(Vec::new());
        let mut rx = store.subscribe();
        store.push(row(3, "c"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let store = store_with(vec![row(1, "a")]);
        store.set_pager(Page::default());
        store.clear();
        assert!(store.is_empty());
        assert!(store.pager().is_none());
    }
}
