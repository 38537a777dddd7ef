//! Error types for sitefix.

use thiserror::Error;

use crate::RuleCategory;

/// Error type for sitefix operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Rule text could not be retrieved
    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for sitefix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structural problem found while indexing one record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordErrorKind {
    /// No URL pattern precedes the first command
    #[error("record has no URL patterns")]
    NoUrlPatterns,

    /// Record contains no command line
    #[error("record has no commands")]
    NoCommands,

    /// Record offset or length does not fit the offset table cell
    #[error("record too large to index ({len} bytes at offset {start})")]
    RecordTooLarge { start: usize, len: usize },
}

/// A malformed record that was skipped while building an index.
///
/// The record keeps no ordinal; indexing continues with the next record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category}: {text} record #{record} at byte {offset}: {kind}")]
pub struct RecordParseError {
    pub category: RuleCategory,
    /// Position of the record in the text, counting skipped records
    pub record: usize,
    /// Byte offset of the record in its source text
    pub offset: usize,
    /// Which text the record came from
    pub text: TextSource,
    pub kind: RecordErrorKind,
}

/// Which of a category's two texts a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextSource {
    /// Bundled or remote rule text
    Base,
    /// Caller-supplied override text
    Override,
}

impl std::fmt::Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextSource::Base => write!(f, "base"),
            TextSource::Override => write!(f, "override"),
        }
    }
}

/// Error raised when a record's sections cannot form a fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixParseError {
    /// Command not understood by this category
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Same command appears twice in one record
    #[error("duplicate section: {0}")]
    DuplicateSection(String),

    /// Flag section body is not a boolean
    #[error("invalid value for {command}: {value}")]
    InvalidFlag { command: String, value: String },

    /// Record has no URL patterns
    #[error("record has no URL patterns")]
    NoUrlPatterns,

    /// Ordinal is not in the index
    #[error("no record with this ordinal")]
    MissingRecord,
}

/// Failure to materialize an indexed ordinal into a fix object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{category}: fix #{ordinal} unavailable: {source}")]
pub struct FixMaterializeError {
    pub category: RuleCategory,
    pub ordinal: u32,
    #[source]
    pub source: FixParseError,
}

/// Error type for color scheme records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorSchemeError {
    /// Record does not start with a scheme name
    #[error("color scheme record has no name")]
    MissingName,

    /// Section other than LIGHT or DARK
    #[error("unknown color scheme section: {0}")]
    UnknownSection(String),

    /// Variant is missing a color
    #[error("{scheme}: missing {field} color")]
    MissingColor { scheme: String, field: &'static str },

    /// Color is not `#rgb` or `#rrggbb`
    #[error("{scheme}: invalid color {value}")]
    InvalidColor { scheme: String, value: String },

    /// Line inside a variant is not `key: value`
    #[error("{scheme}: malformed line {line}")]
    MalformedLine { scheme: String, line: String },

    /// Scheme name defined twice for the same variant
    #[error("duplicate color scheme: {0}")]
    Duplicate(String),

    /// Record defines neither LIGHT nor DARK
    #[error("{0}: no LIGHT or DARK section")]
    NoVariants(String),
}
