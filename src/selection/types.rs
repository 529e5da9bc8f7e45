use std::collections::HashSet;

use crate::fetcher::{Page, Record};

/// Ordered, duplicate-free collection of selected records.
///
/// Insertion order is preserved. The id index is kept in step with `entries`
/// on every mutation so no two entries ever share an id.
#[derive(Debug, Clone)]
pub struct SelectionSet<R: Record> {
    entries: Vec<R>,
    ids: HashSet<R::Id>,
}

impl<R: Record> Default for SelectionSet<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

impl<R: Record> SelectionSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &R::Id) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<R::Id> {
        self.entries.iter().map(Record::id).collect()
    }

    pub fn to_vec(&self) -> Vec<R> {
        self.entries.clone()
    }

    /// Append `record` unless its id is already present. Returns whether it was added.
    pub fn insert(&mut self, record: R) -> bool {
        if !self.ids.insert(record.id()) {
            return false;
        }
        self.entries.push(record);
        true
    }

    pub fn remove(&mut self, id: &R::Id) -> Option<R> {
        if !self.ids.remove(id) {
            return None;
        }
        let pos = self.entries.iter().position(|r| &r.id() == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }

    fn retain(&mut self, mut keep: impl FnMut(&R) -> bool) {
        let ids = &mut self.ids;
        self.entries.retain(|r| {
            let kept = keep(r);
            if !kept {
                ids.remove(&r.id());
            }
            kept
        });
    }

    /// Fold the grid's checked rows for one page into the selection.
    ///
    /// Entries whose id is not in `page_ids` are untouched. Entries on the
    /// page survive only if still checked. Newly checked rows are appended in
    /// the order `checked` lists them.
    pub fn merge_page(&mut self, page_ids: &HashSet<R::Id>, checked: &[R]) {
        let checked_ids: HashSet<R::Id> = checked.iter().map(Record::id).collect();
        self.retain(|r| {
            let id = r.id();
            !page_ids.contains(&id) || checked_ids.contains(&id)
        });
        for record in checked {
            self.insert(record.clone());
        }
    }

    /// Scan `candidates` in order, appending any not yet selected, and stop
    /// after `limit` candidates have been looked at (added or not).
    ///
    /// Returns `(considered, added)`.
    pub fn extend_scan(&mut self, candidates: Vec<R>, limit: usize) -> (usize, usize) {
        let mut considered = 0;
        let mut added = 0;
        for record in candidates.into_iter().take(limit) {
            considered += 1;
            if self.insert(record) {
                added += 1;
            }
        }
        (considered, added)
    }
}

/// The page currently materialized for display.
#[derive(Debug, Clone)]
pub struct CurrentPageView<R> {
    pub page_index: usize,
    pub records: Vec<R>,
}

impl<R: Record> CurrentPageView<R> {
    /// Ids on this page, computed fresh on each call.
    pub fn ids(&self) -> HashSet<R::Id> {
        self.records.iter().map(Record::id).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R> From<Page<R>> for CurrentPageView<R> {
    fn from(page: Page<R>) -> Self {
        Self {
            page_index: page.index,
            records: page.records,
        }
    }
}
