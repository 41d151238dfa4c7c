use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Tri-state of a "select all" checkbox over the visible rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    None,
    Partial,
    All,
}

/// Ids picked for bulk actions and scoped export.
///
/// Selection is independent of filtering: narrowing the filter hides ids
/// without dropping them. `select_all` replaces rather than adds, so bulk
/// actions never pick up rows the user could not see when they clicked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Clears when the selection is exactly the visible set, otherwise
    /// replaces it with the visible set.
    pub fn select_all<'a, I>(&mut self, visible: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let visible: BTreeSet<String> = visible.into_iter().map(str::to_string).collect();
        if !visible.is_empty() && visible == self.ids {
            self.ids.clear();
        } else {
            self.ids = visible;
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Checkbox state over `visible`, counting only the intersection.
    pub fn visible_state<'a, I>(&self, visible: I) -> CheckState
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut total = 0;
        let mut selected = 0;
        for id in visible {
            total += 1;
            if self.ids.contains(id) {
                selected += 1;
            }
        }
        match selected {
            0 => CheckState::None,
            n if n == total => CheckState::All,
            _ => CheckState::Partial,
        }
    }

    /// Drops ids that no longer exist in the collection. Returns how many went.
    pub fn retain_existing<'a, I>(&mut self, existing: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let existing: BTreeSet<&str> = existing.into_iter().collect();
        let before = self.ids.len();
        self.ids.retain(|id| existing.contains(id.as_str()));
        before - self.ids.len()
    }
}

impl FromIterator<String> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("c{i}")).collect()
    }

    #[test]
    fn test_toggle() {
        let mut sel = SelectionSet::default();
        sel.toggle("c1");
        assert!(sel.is_selected("c1"));
        sel.toggle("c1");
        assert!(!sel.is_selected("c1"));
    }

    #[test]
    fn test_select_all_replaces_then_clears() {
        let visible = ids(3);
        let mut sel: SelectionSet = ["other".to_string()].into_iter().collect();
        sel.select_all(visible.iter().map(String::as_str));
        assert_eq!(sel.len(), 3);
        assert!(!sel.is_selected("other"));

        sel.select_all(visible.iter().map(String::as_str));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_narrowed_filter_shows_intersection() {
        let all_visible = ids(5);
        let mut sel = SelectionSet::default();
        sel.select_all(all_visible.iter().map(String::as_str));

        let narrowed = ["c2", "c4"];
        assert_eq!(sel.visible_state(narrowed), CheckState::All);
        assert!(narrowed.iter().all(|id| sel.is_selected(id)));
        assert_eq!(sel.len(), 5);
    }

    #[test]
    fn test_select_all_on_narrowed_view_replaces() {
        let mut sel = SelectionSet::default();
        sel.select_all(ids(5).iter().map(String::as_str));
        sel.select_all(["c2", "c4"]);
        assert_eq!(sel.len(), 2);
        assert!(sel.is_selected("c2") && sel.is_selected("c4"));
    }

    #[test]
    fn test_partial_state() {
        let mut sel = SelectionSet::default();
        sel.toggle("c1");
        assert_eq!(sel.visible_state(["c1", "c2"]), CheckState::Partial);
        assert_eq!(sel.visible_state(["c3"]), CheckState::None);
        assert_eq!(sel.visible_state(std::iter::empty()), CheckState::None);
    }

    #[test]
    fn test_retain_existing_drops_stale() {
        let mut sel: SelectionSet = ids(3).into_iter().collect();
        let removed = sel.retain_existing(["c1", "c3", "c9"]);
        assert_eq!(removed, 1);
        assert!(!sel.is_selected("c2"));
    }
}
