//! User-driven parameters of the history views.

/// Lookback window in hours. Only grows, and only through explicit user
/// action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    hours: u32,
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self::new(24)
    }
}

impl LookbackWindow {
    pub fn new(hours: u32) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Grows the window by `by` hours. Returns whether it changed.
    pub fn extend(&mut self, by: u32) -> bool {
        let next = self.hours.saturating_add(by);
        if next == self.hours {
            return false;
        }
        self.hours = next;
        true
    }
}

/// Group keys the state history has asked the backend to expand.
/// Append-only, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedGroups {
    keys: Vec<String>,
}

impl ExpandedGroups {
    /// Returns `false` when the key was already expanded.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|existing| existing == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Parameters of one state history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatesQuery {
    pub hours: u32,
    pub groups: bool,
    pub expand: Vec<String>,
}

impl StatesQuery {
    pub fn grouped(window: &LookbackWindow, expanded: &ExpandedGroups) -> Self {
        Self {
            hours: window.hours(),
            groups: true,
            expand: expanded.iter().map(str::to_string).collect(),
        }
    }

    /// Query-string pairs; `expand` repeats once per key.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("hours", self.hours.to_string())];
        if self.groups {
            pairs.push(("groups", "yes".to_string()));
        }
        pairs.extend(self.expand.iter().map(|key| ("expand", key.clone())));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extending_by_zero_is_not_a_change() {
        let mut window = LookbackWindow::default();
        assert!(!window.extend(0));
        assert_eq!(window.hours(), 24);
        assert!(window.extend(24));
        assert_eq!(window.hours(), 48);
    }

    #[test]
    fn window_saturates_instead_of_wrapping() {
        let mut window = LookbackWindow::new(u32::MAX - 1);
        assert!(window.extend(24));
        assert_eq!(window.hours(), u32::MAX);
        assert!(!window.extend(24));
    }

    #[test]
    fn expanded_groups_ignore_repeats() {
        let mut groups = ExpandedGroups::default();
        assert!(groups.insert("17"));
        assert!(!groups.insert("17"));
        assert!(groups.insert("4"));
        assert_eq!(groups.iter().collect::<Vec<_>>(), vec!["17", "4"]);
    }

    #[test]
    fn grouped_query_pairs() {
        let mut groups = ExpandedGroups::default();
        groups.insert("a");
        groups.insert("b");
        let query = StatesQuery::grouped(&LookbackWindow::new(48), &groups);
        assert_eq!(
            query.to_pairs(),
            vec![
                ("hours", "48".to_string()),
                ("groups", "yes".to_string()),
                ("expand", "a".to_string()),
                ("expand", "b".to_string()),
            ]
        );
    }
}
