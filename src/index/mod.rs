//! Domain index over a category's raw rule text.
//!
//! The index keeps the raw text and four derived structures:
//!
//! - **Offset table**: ordinal → byte range, encoded as text
//! - **Domains**: exact host → ordinals
//! - **Domain labels**: label key → wildcard entries
//! - **Nonstandard**: ordinals always included in a lookup
//!
//! # Lookup
//!
//! A host is resolved in three tiers and the union is returned in ascending
//! ordinal (declaration) order:
//!
//! 1. Exact host lookup
//! 2. Label keys derived from the host (every suffix and every label),
//!    verified against the stored wildcard pattern
//! 3. The whole nonstandard list

mod builder;
mod offsets;
mod raw;

pub use builder::{BuildReport, IndexBuilder};
pub use offsets::{OffsetTable, MAX_LEN, MAX_START};
pub use raw::RawStore;

use ahash::AHashMap;
use std::sync::Arc;

use crate::error::TextSource;
use crate::format::RecordLayout;
use crate::pattern::{host_label_keys, wildcard_matches};
use crate::RuleCategory;

/// A wildcard pattern filed under a label key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    ordinal: u32,
    pattern: Box<str>,
}

impl LabelEntry {
    /// Ordinal of the record declaring the pattern.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Normalized wildcard pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Immutable domain index of one category.
#[derive(Debug)]
pub struct SiteIndex {
    category: RuleCategory,
    raw: RawStore,
    offsets: OffsetTable,
    override_offsets: OffsetTable,
    domains: AHashMap<String, Vec<u32>>,
    domain_labels: AHashMap<String, Vec<LabelEntry>>,
    nonstandard: Vec<u32>,
}

impl SiteIndex {
    /// Build an index from base text and optional override text.
    pub fn build(
        category: RuleCategory,
        layout: RecordLayout,
        base: Arc<str>,
        overrides: Option<Arc<str>>,
    ) -> (Self, BuildReport) {
        let mut builder = IndexBuilder::new(category, layout);
        builder.add_text(&base, TextSource::Base);
        if let Some(ref text) = overrides {
            builder.add_text(text, TextSource::Override);
        }
        builder.finish(RawStore::new(base, overrides))
    }

    /// Category this index was built for.
    pub fn category(&self) -> RuleCategory {
        self.category
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.offsets.len() + self.override_offsets.len()
    }

    /// Check if no record was indexed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw text the index was built from.
    pub fn raw(&self) -> &RawStore {
        &self.raw
    }

    /// Source text slice of a record.
    pub fn record(&self, ordinal: u32) -> Option<&str> {
        let base_len = self.offsets.len() as u32;
        if ordinal < base_len {
            let range = self.offsets.get(ordinal)?;
            self.raw.base().get(range)
        } else {
            let range = self.override_offsets.get(ordinal - base_len)?;
            self.raw.overrides()?.get(range)
        }
    }

    /// Resolve a normalized host to matching ordinals, ascending.
    pub fn lookup(&self, host: &str) -> Vec<u32> {
        let mut ordinals = Vec::new();

        if let Some(exact) = self.domains.get(host) {
            ordinals.extend_from_slice(exact);
        }

        for key in host_label_keys(host) {
            if let Some(entries) = self.domain_labels.get(key) {
                ordinals.extend(
                    entries
                        .iter()
                        .filter(|e| wildcard_matches(&e.pattern, host))
                        .map(|e| e.ordinal),
                );
            }
        }

        ordinals.extend_from_slice(&self.nonstandard);

        ordinals.sort_unstable();
        ordinals.dedup();
        ordinals
    }

    /// Check if an exact or wildcard entry matches a normalized host.
    ///
    /// Nonstandard records are not consulted; they are only candidates.
    pub fn matches(&self, host: &str) -> bool {
        if self.domains.contains_key(host) {
            return true;
        }
        host_label_keys(host).into_iter().any(|key| {
            self.domain_labels
                .get(key)
                .is_some_and(|entries| entries.iter().any(|e| wildcard_matches(&e.pattern, host)))
        })
    }

    /// Exact host map.
    pub fn domains(&self) -> &AHashMap<String, Vec<u32>> {
        &self.domains
    }

    /// Label key map.
    pub fn domain_labels(&self) -> &AHashMap<String, Vec<LabelEntry>> {
        &self.domain_labels
    }

    /// Ordinals included in every lookup.
    pub fn nonstandard(&self) -> &[u32] {
        &self.nonstandard
    }

    /// Summary numbers for diagnostics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            records: self.len(),
            override_records: self.override_offsets.len(),
            domains: self.domains.len(),
            domain_labels: self.domain_labels.len(),
            nonstandard: self.nonstandard.len(),
            raw_bytes: self.raw.byte_len(),
            offset_bytes: self.offsets.as_str().len() + self.override_offsets.as_str().len(),
        }
    }
}

/// Index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IndexStats {
    /// Indexed records, base and override
    pub records: usize,
    /// Indexed records from the override text
    pub override_records: usize,
    /// Distinct exact hosts
    pub domains: usize,
    /// Distinct label keys
    pub domain_labels: usize,
    /// Nonstandard records
    pub nonstandard: usize,
    /// Retained raw text
    pub raw_bytes: usize,
    /// Encoded offset tables
    pub offset_bytes: usize,
}
