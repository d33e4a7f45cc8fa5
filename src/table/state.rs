use derive_setters::Setters;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }

    /// Sort request for `key`: flips to descending when `key` is already
    /// sorted ascending, otherwise sorts ascending by `key`.
    pub fn toggle(&mut self, key: &str) {
        let direction = match (&self.key, self.direction) {
            (Some(current), SortDirection::Ascending) if current == key => {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        self.key = Some(key.to_string());
        self.direction = direction;
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.direction = SortDirection::Ascending;
    }

    pub fn is_sorted_by(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }
}

/// Per-column filter strings. Empty strings are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    filters: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter of a column, an empty `term` removes it.
    /// Returns true when the filter set changed.
    pub fn set(&mut self, key: impl Into<String>, term: impl Into<String>) -> bool {
        let key = key.into();
        let term = term.into();
        if term.is_empty() {
            self.filters.remove(&key).is_some()
        } else {
            self.filters.insert(key, term.clone()).as_deref() != Some(term.as_str())
        }
    }

    pub fn with(mut self, key: impl Into<String>, term: impl Into<String>) -> Self {
        self.set(key, term);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}~{v}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Current page (1 based) and page size. A page size of 0 disables paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Setters)]
#[setters(prefix = "with_")]
pub struct PageState {
    pub current_page: usize,
    pub page_size: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: 10,
        }
    }
}

impl PageState {
    pub fn new(current_page: usize, page_size: usize) -> Self {
        Self {
            current_page,
            page_size,
        }
    }

    pub fn first(&mut self) {
        self.current_page = 1;
    }

    pub fn next(&mut self, total_pages: usize) {
        if self.current_page < total_pages {
            self.current_page += 1;
        }
    }

    pub fn prev(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    /// Clamp the current page into `[1, total_pages]` (1 for an empty table).
    pub fn clamp_to(&mut self, total_pages: usize) {
        self.current_page = self.current_page.clamp(1, total_pages.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_direction_on_same_key() {
        let mut sort = SortState::default();
        sort.toggle("age");
        assert_eq!(sort, SortState::by("age", SortDirection::Ascending));
        sort.toggle("age");
        assert_eq!(sort, SortState::by("age", SortDirection::Descending));
        sort.toggle("age");
        assert_eq!(sort.direction, SortDirection::Ascending);
        sort.toggle("name");
        assert_eq!(sort, SortState::by("name", SortDirection::Ascending));
    }

    #[test]
    fn empty_filter_removes_entry() {
        let mut filters = FilterState::new();
        assert!(filters.set("status", "act"));
        assert!(!filters.set("status", "act"));
        assert_eq!(filters.get("status"), Some("act"));
        assert!(filters.set("status", ""));
        assert!(filters.is_empty());
        assert!(!filters.set("status", ""));
    }

    #[test]
    fn page_clamping() {
        let mut page = PageState::new(7, 2);
        page.clamp_to(3);
        assert_eq!(page.current_page, 3);
        page.next(3);
        assert_eq!(page.current_page, 3);
        page.prev();
        page.prev();
        page.prev();
        assert_eq!(page.current_page, 1);
        page.clamp_to(0);
        assert_eq!(page.current_page, 1);
        assert_eq!(PageState::default().with_page_size(5).page_size, 5);
    }
}
