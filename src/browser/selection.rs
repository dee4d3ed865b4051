//! Selection set
//!
//! Checkbox semantics over files and folders. Members are kept in the order
//! they were selected because batch requests pair names with references by
//! position. The set is independent of navigation and only changes through
//! the operations below.

use std::collections::HashSet;

use super::types::{ItemKind, SelectionItem};

#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: Vec<SelectionItem>,
    index: HashSet<(ItemKind, String)>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert if absent, remove if present. Returns whether the item is now selected.
    pub fn toggle(&mut self, item: SelectionItem) -> bool {
        let key = (item.kind, item.identifier.clone());
        if self.index.remove(&key) {
            self.items.retain(|existing| *existing != item);
            false
        } else {
            self.index.insert(key);
            self.items.push(item);
            true
        }
    }

    /// Add every candidate not already selected; returns how many were added
    pub fn select_all<I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = SelectionItem>,
    {
        let mut added = 0;
        for item in candidates {
            if self.index.insert((item.kind, item.identifier.clone())) {
                self.items.push(item);
                added += 1;
            }
        }
        added
    }

    pub fn clear_all(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Current selection in selection order
    pub fn members(&self) -> &[SelectionItem] {
        &self.items
    }

    pub fn contains(&self, kind: ItemKind, identifier: &str) -> bool {
        self.index.contains(&(kind, identifier.to_string()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn folders(&self) -> impl Iterator<Item = &SelectionItem> {
        self.items.iter().filter(|i| i.kind == ItemKind::Folder)
    }

    pub fn files(&self) -> impl Iterator<Item = &SelectionItem> {
        self.items.iter().filter(|i| i.kind == ItemKind::File)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> SelectionItem {
        SelectionItem::new(ItemKind::File, id, format!("{}.bin", id))
    }

    fn folder(path: &str) -> SelectionItem {
        SelectionItem::new(ItemKind::Folder, path, path.trim_start_matches('/'))
    }

    #[test]
    fn test_toggle_is_self_inverse() {
        let mut set = SelectionSet::new();
        set.toggle(file("a"));
        let before: Vec<_> = set.members().to_vec();

        assert!(set.toggle(folder("/Reports")));
        assert!(!set.toggle(folder("/Reports")));
        assert_eq!(set.members(), before.as_slice());
    }

    #[test]
    fn test_same_identifier_different_kind_are_distinct() {
        let mut set = SelectionSet::new();
        set.toggle(file("/x"));
        set.toggle(folder("/x"));
        assert_eq!(set.len(), 2);
        assert!(set.contains(ItemKind::File, "/x"));
        assert!(set.contains(ItemKind::Folder, "/x"));
    }

    #[test]
    fn test_select_all_dedups() {
        let mut set = SelectionSet::new();
        set.toggle(file("b"));
        let added = set.select_all(vec![file("a"), file("b"), folder("/F"), file("a")]);
        assert_eq!(added, 2);
        let ids: Vec<_> = set.members().iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(ids, ["b", "a", "/F"]);
    }

    #[test]
    fn test_select_all_on_empty_yields_candidates() {
        let mut set = SelectionSet::new();
        let candidates = vec![folder("/A"), file("x"), file("y")];
        set.select_all(candidates.clone());
        assert_eq!(set.members(), candidates.as_slice());
    }

    #[test]
    fn test_clear_all_and_partition() {
        let mut set = SelectionSet::new();
        set.select_all(vec![file("a"), folder("/B"), file("c")]);
        assert_eq!(set.folders().count(), 1);
        assert_eq!(set.files().count(), 2);

        set.clear_all();
        assert!(set.is_empty());
        assert!(!set.contains(ItemKind::File, "a"));
    }
}
