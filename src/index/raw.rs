//! Raw rule text of one category.

use std::sync::Arc;

use crate::error::TextSource;

/// Immutable base text plus an optional caller-supplied override text.
#[derive(Debug, Clone)]
pub struct RawStore {
    base: Arc<str>,
    overrides: Option<Arc<str>>,
}

impl RawStore {
    /// Create a store from base text and optional override text.
    pub fn new(base: impl Into<Arc<str>>, overrides: Option<Arc<str>>) -> Self {
        Self {
            base: base.into(),
            overrides,
        }
    }

    /// The base (bundled or remote) text.
    pub fn base(&self) -> &Arc<str> {
        &self.base
    }

    /// The override text, if one was supplied.
    pub fn overrides(&self) -> Option<&Arc<str>> {
        self.overrides.as_ref()
    }

    /// Text for a source, if present.
    pub fn text(&self, source: TextSource) -> Option<&str> {
        match source {
            TextSource::Base => Some(&self.base),
            TextSource::Override => self.overrides.as_deref(),
        }
    }

    /// Total size of retained text in bytes.
    pub fn byte_len(&self) -> usize {
        self.base.len() + self.overrides.as_ref().map_or(0, |s| s.len())
    }
}
