//! Single-pass domain index construction.

use ahash::AHashMap;

use super::offsets::OffsetTable;
use super::raw::RawStore;
use super::{LabelEntry, SiteIndex};
use crate::error::{RecordErrorKind, RecordParseError, TextSource};
use crate::format::{record_patterns, scan_records, RecordLayout};
use crate::pattern::{classify, wildcard_label_keys, PatternKind};
use crate::RuleCategory;

/// Outcome of building one category index.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Records that received an ordinal
    pub indexed: usize,
    /// Records that were skipped
    pub errors: Vec<RecordParseError>,
}

/// A wildcard pattern waiting for its label key.
struct LabelMember {
    ordinal: u32,
    pattern: String,
    keys: Vec<String>,
}

/// Builds a [`SiteIndex`] from base and override text.
///
/// Label keys are assigned in [`finish`](IndexBuilder::finish), once the
/// frequency of every candidate key across the corpus is known.
pub struct IndexBuilder {
    category: RuleCategory,
    layout: RecordLayout,
    offsets: OffsetTable,
    override_offsets: OffsetTable,
    domains: AHashMap<String, Vec<u32>>,
    members: Vec<LabelMember>,
    key_frequency: AHashMap<String, usize>,
    nonstandard: Vec<u32>,
    errors: Vec<RecordParseError>,
}

impl IndexBuilder {
    /// Create a builder for a category.
    pub fn new(category: RuleCategory, layout: RecordLayout) -> Self {
        Self {
            category,
            layout,
            offsets: OffsetTable::new(),
            override_offsets: OffsetTable::new(),
            domains: AHashMap::new(),
            members: Vec::new(),
            key_frequency: AHashMap::new(),
            nonstandard: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Index every record of a text.
    ///
    /// Base text must be added before override text so that override
    /// ordinals follow base ordinals.
    pub fn add_text(&mut self, text: &str, source: TextSource) {
        for (record, range) in scan_records(text, self.layout).into_iter().enumerate() {
            let slice = &text[range.clone()];

            let patterns = match self.layout {
                RecordLayout::Blocks => record_patterns(slice),
                RecordLayout::Lines => Ok(vec![slice.trim()]),
            };

            let result = patterns.and_then(|patterns| {
                self.assign_ordinal(range.clone(), source)
                    .map(|ordinal| (ordinal, patterns))
            });

            match result {
                Ok((ordinal, patterns)) => self.index_patterns(ordinal, &patterns),
                Err(kind) => {
                    let error = RecordParseError {
                        category: self.category,
                        record,
                        offset: range.start,
                        text: source,
                        kind,
                    };
                    log::warn!("Skipping malformed record: {}", error);
                    self.errors.push(error);
                }
            }
        }
    }

    fn assign_ordinal(
        &mut self,
        range: std::ops::Range<usize>,
        source: TextSource,
    ) -> Result<u32, RecordErrorKind> {
        let too_large = RecordErrorKind::RecordTooLarge {
            start: range.start,
            len: range.len(),
        };
        match source {
            TextSource::Base => {
                if !self.override_offsets.is_empty() {
                    log::debug!("Base text added after override text");
                }
                self.offsets.push(range).ok_or(too_large)
            }
            TextSource::Override => {
                let base = self.offsets.len() as u32;
                self.override_offsets
                    .push(range)
                    .map(|local| base + local)
                    .ok_or(too_large)
            }
        }
    }

    fn index_patterns(&mut self, ordinal: u32, patterns: &[&str]) {
        let mut record_keys: Vec<String> = Vec::new();
        let mut nonstandard = false;

        for pattern in patterns {
            match classify(pattern) {
                PatternKind::Exact(host) => {
                    let ordinals = self.domains.entry(host).or_default();
                    if ordinals.last() != Some(&ordinal) {
                        ordinals.push(ordinal);
                    }
                }
                PatternKind::Wildcard(pattern) => {
                    let keys = wildcard_label_keys(&pattern);
                    for key in &keys {
                        if !record_keys.contains(key) {
                            record_keys.push(key.clone());
                        }
                    }
                    self.members.push(LabelMember {
                        ordinal,
                        pattern,
                        keys,
                    });
                }
                PatternKind::Nonstandard => nonstandard = true,
            }
        }

        if nonstandard {
            self.nonstandard.push(ordinal);
        }
        for key in record_keys {
            *self.key_frequency.entry(key).or_default() += 1;
        }
    }

    /// Assign label keys and produce the index.
    pub fn finish(self, raw: RawStore) -> (SiteIndex, BuildReport) {
        let mut domain_labels: AHashMap<String, Vec<LabelEntry>> = AHashMap::new();

        for member in self.members {
            // Least frequent candidate; ties keep the earliest
            let key = member
                .keys
                .iter()
                .min_by_key(|key| self.key_frequency.get(*key).copied().unwrap_or(0));
            let Some(key) = key else {
                continue;
            };

            let entries = domain_labels.entry(key.clone()).or_default();
            let duplicate = entries
                .last()
                .is_some_and(|e| e.ordinal == member.ordinal && *e.pattern == *member.pattern);
            if !duplicate {
                entries.push(LabelEntry {
                    ordinal: member.ordinal,
                    pattern: member.pattern.into_boxed_str(),
                });
            }
        }

        let indexed = self.offsets.len() + self.override_offsets.len();
        log::debug!(
            "Indexed {}: {} records, {} domains, {} labels, {} nonstandard, {} skipped",
            self.category,
            indexed,
            self.domains.len(),
            domain_labels.len(),
            self.nonstandard.len(),
            self.errors.len()
        );

        let index = SiteIndex {
            category: self.category,
            raw,
            offsets: self.offsets,
            override_offsets: self.override_offsets,
            domains: self.domains,
            domain_labels,
            nonstandard: self.nonstandard,
        };
        let report = BuildReport {
            indexed,
            errors: self.errors,
        };
        (index, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str) -> (SiteIndex, BuildReport) {
        let mut builder = IndexBuilder::new(RuleCategory::DynamicThemeFixes, RecordLayout::Blocks);
        builder.add_text(text, TextSource::Base);
        builder.finish(RawStore::new(text, None))
    }

    #[test]
    fn test_maps_by_pattern_kind() {
        let text = "example.com\n\nCSS\na\n===\n*.example.com\n\nCSS\nb\n===\n*\n\nCSS\nc\n";
        let (index, report) = build(text);

        assert_eq!(report.indexed, 3);
        assert!(report.errors.is_empty());
        assert_eq!(index.domains().get("example.com"), Some(&vec![0]));
        let labels = index.domain_labels().get("example.com").unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].ordinal(), 1);
        assert_eq!(labels[0].pattern(), "*.example.com");
        assert_eq!(index.nonstandard(), &[2]);
    }

    #[test]
    fn test_record_in_several_maps() {
        let text = "a.com\n*.b.com\n//cdn.c.com\na.com\n\nINVERT\nx\n";
        let (index, _) = build(text);

        assert_eq!(index.domains().get("a.com"), Some(&vec![0]));
        assert!(index.domain_labels().contains_key("b.com"));
        assert_eq!(index.nonstandard(), &[0]);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let text = "a.com\n\nCSS\nx\n===\nno-commands.com\n===\nINVERT\n.x\n===\nd.com\n\nCSS\ny\n";
        let (index, report) = build(text);

        assert_eq!(report.indexed, 2);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].record, 1);
        assert_eq!(report.errors[0].kind, RecordErrorKind::NoCommands);
        assert_eq!(report.errors[1].kind, RecordErrorKind::NoUrlPatterns);
        // Surviving records keep consecutive ordinals
        assert_eq!(index.domains().get("d.com"), Some(&vec![1]));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_least_frequent_label_key() {
        // "com" appears in both wildcard records, "mail" only in one
        let text = "mail.*.com\n\nCSS\nx\n===\n*.shop.com\nnews.*.com\n\nCSS\ny\n";
        let (index, _) = build(text);

        let mail = index.domain_labels().get("mail").unwrap();
        assert_eq!(mail[0].ordinal(), 0);
        assert!(index.domain_labels().contains_key("shop.com"));
        assert!(index.domain_labels().contains_key("news"));
        assert!(!index.domain_labels().contains_key("com"));
    }

    #[test]
    fn test_override_ordinals_follow_base() {
        let base = "a.com\n\nCSS\nx\n===\nb.com\n\nCSS\ny\n";
        let overrides = "a.com\n\nCSS\nz\n";
        let mut builder = IndexBuilder::new(RuleCategory::InversionFixes, RecordLayout::Blocks);
        builder.add_text(base, TextSource::Base);
        builder.add_text(overrides, TextSource::Override);
        let (index, report) = builder.finish(RawStore::new(base, Some(overrides.into())));

        assert_eq!(report.indexed, 3);
        assert_eq!(index.domains().get("a.com"), Some(&vec![0, 2]));
        assert_eq!(index.record(2).map(str::trim), Some("a.com\n\nCSS\nz"));
    }

    #[test]
    fn test_line_layout() {
        let text = "blocked.test\n*.dark.example\n192.168.0.1\n";
        let mut builder = IndexBuilder::new(RuleCategory::DarkSites, RecordLayout::Lines);
        builder.add_text(text, TextSource::Base);
        let (index, report) = builder.finish(RawStore::new(text, None));

        assert_eq!(report.indexed, 3);
        assert_eq!(index.domains().get("blocked.test"), Some(&vec![0]));
        assert!(index.domain_labels().contains_key("dark.example"));
        assert_eq!(index.nonstandard(), &[2]);
        assert_eq!(index.record(1), Some("*.dark.example"));
    }
}
