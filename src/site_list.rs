//! Line-per-pattern site list.

use std::sync::Arc;

use crate::format::RecordLayout;
use crate::index::{BuildReport, SiteIndex};
use crate::pattern::nonstandard_matches;
use crate::RuleCategory;

/// Set of URL patterns answered with a yes/no membership check.
#[derive(Debug)]
pub struct SiteListIndex {
    index: SiteIndex,
}

impl SiteListIndex {
    /// Index a list of patterns, one per line.
    pub fn build(
        category: RuleCategory,
        base: Arc<str>,
        overrides: Option<Arc<str>>,
    ) -> (Self, BuildReport) {
        let (index, report) = SiteIndex::build(category, RecordLayout::Lines, base, overrides);
        (Self { index }, report)
    }

    /// Check if a normalized host is covered by any pattern.
    ///
    /// Nonstandard entries are read back from the list and checked one by one.
    pub fn contains(&self, host: &str) -> bool {
        self.index.matches(host)
            || self.index.nonstandard().iter().any(|&ordinal| {
                self.index
                    .record(ordinal)
                    .is_some_and(|pattern| nonstandard_matches(pattern, host))
            })
    }

    /// The underlying domain index.
    pub fn index(&self) -> &SiteIndex {
        &self.index
    }

    /// Number of listed patterns.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_list() {
        let text = "# Already dark\nblocked.test\n*.dark.example\nhttps://night.example/path\n";
        let (list, report) = SiteListIndex::build(RuleCategory::DarkSites, text.into(), None);

        assert_eq!(report.indexed, 3);
        assert!(list.contains("blocked.test"));
        assert!(list.contains("a.dark.example"));
        assert!(list.contains("night.example"));
        assert!(!list.contains("dark.example"));
        assert!(!list.contains("other.test"));
    }

    #[test]
    fn test_nonstandard_entries_match_only_their_host() {
        let text = "blocked.test\n192.168.1.1\n//cdn.example.com/lib.js\nfoo*.bar\n";
        let (list, report) = SiteListIndex::build(RuleCategory::DarkSites, text.into(), None);

        assert_eq!(report.indexed, 4);
        assert!(!list.contains("other.org"));
        assert!(!list.contains("example.com"));
        assert!(!list.contains("foo.bar"));
        assert!(list.contains("192.168.1.1"));
        assert!(list.contains("cdn.example.com"));
        assert!(list.contains("blocked.test"));
    }

    #[test]
    fn test_match_all_entry() {
        let (list, _) =
            SiteListIndex::build(RuleCategory::DarkSites, "blocked.test\n*\n".into(), None);
        assert!(list.contains("other.org"));
    }

    #[test]
    fn test_override_entries() {
        let (list, _) = SiteListIndex::build(
            RuleCategory::DarkSites,
            "a.test\n".into(),
            Some("b.test\n".into()),
        );
        assert!(list.contains("a.test"));
        assert!(list.contains("b.test"));
        assert_eq!(list.len(), 2);
    }
}
