//! Rule text grammar.
//!
//! # Block layout
//!
//! Used by dynamic theme fixes, inversion fixes, static themes and color
//! schemes. Records are separated by a line of three or more `=`:
//!
//! ```text
//! example.com
//! *.example.org
//!
//! INVERT
//! .logo
//!
//! CSS
//! body { color: ${black}; }
//!
//! ================================
//!
//! other.net
//!
//! NO INVERT
//! img
//! ```
//!
//! Lines before the first command are URL patterns. A command is a line of
//! upper-case words separated by single spaces; its section runs until the
//! next command.
//!
//! # Line layout
//!
//! Used by the dark-site list: every non-blank line that does not start with
//! `#` is one record holding one URL pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::error::{FixParseError, RecordErrorKind};

static COMMAND_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]+( [A-Z]+)*$").expect("command pattern is valid"));

/// How records are delimited in a category's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// `====` separated records with command sections
    Blocks,
    /// One URL pattern per line
    Lines,
}

/// Check if a line is a record separator.
pub fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.bytes().all(|b| b == b'=')
}

/// Check if a line starts a section.
pub fn is_command(line: &str) -> bool {
    COMMAND_LINE.is_match(line.trim_end_matches('\r'))
}

/// Iterate over lines with the byte offset where each starts.
///
/// The yielded line excludes its `\n` and any trailing `\r`.
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        (start, line.strip_suffix('\r').unwrap_or(line))
    })
}

/// Split text into record byte ranges, in declaration order.
///
/// Blank records (only whitespace between separators) are dropped.
pub fn scan_records(text: &str, layout: RecordLayout) -> Vec<Range<usize>> {
    match layout {
        RecordLayout::Blocks => scan_blocks(text),
        RecordLayout::Lines => scan_lines(text),
    }
}

fn scan_blocks(text: &str) -> Vec<Range<usize>> {
    let mut records = Vec::new();
    let mut start = 0;

    for (offset, line) in lines_with_offsets(text) {
        if is_separator(line) {
            push_block(text, start..offset, &mut records);
            start = offset + line.len();
            // Skip the line terminator
            start = text[start..]
                .find('\n')
                .map(|pos| start + pos + 1)
                .unwrap_or(text.len());
        }
    }
    push_block(text, start..text.len(), &mut records);

    records
}

fn push_block(text: &str, range: Range<usize>, records: &mut Vec<Range<usize>>) {
    if range.start < range.end && !text[range.clone()].trim().is_empty() {
        records.push(range);
    }
}

fn scan_lines(text: &str) -> Vec<Range<usize>> {
    lines_with_offsets(text)
        .filter_map(|(offset, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            let lead = line.len() - line.trim_start().len();
            Some(offset + lead..offset + lead + trimmed.len())
        })
        .collect()
}

/// Extract the URL patterns of a block record without parsing its sections.
///
/// This is the index-time check: a record needs at least one pattern and at
/// least one command.
pub fn record_patterns(record: &str) -> Result<Vec<&str>, RecordErrorKind> {
    let mut patterns = Vec::new();
    for (_, line) in lines_with_offsets(record) {
        if is_command(line) {
            if patterns.is_empty() {
                return Err(RecordErrorKind::NoUrlPatterns);
            }
            return Ok(patterns);
        }
        let line = line.trim();
        if !line.is_empty() {
            patterns.push(line);
        }
    }
    Err(RecordErrorKind::NoCommands)
}

/// One command section of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    /// Command name, e.g. `IGNORE INLINE STYLE`
    pub command: &'a str,
    /// Raw text between this command and the next
    pub body: &'a str,
}

impl<'a> Section<'a> {
    /// Non-blank body lines, trimmed.
    pub fn entries(&self) -> Vec<String> {
        self.body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Body text with surrounding blank space removed.
    pub fn text(&self) -> String {
        self.body.trim().to_string()
    }

    /// Flag value: present means `true` unless the body says otherwise.
    pub fn flag(&self) -> Result<bool, FixParseError> {
        match self.body.trim().to_lowercase().as_str() {
            "" | "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(FixParseError::InvalidFlag {
                command: self.command.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// A block record split into patterns and sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    /// Lines before the first command
    pub head: Vec<&'a str>,
    /// Command sections in order
    pub sections: Vec<Section<'a>>,
}

impl<'a> Record<'a> {
    /// Parse a block record.
    pub fn parse(record: &'a str) -> Self {
        let mut head = Vec::new();
        let mut sections: Vec<Section<'a>> = Vec::new();
        let mut current: Option<(&'a str, usize)> = None;

        for (offset, line) in lines_with_offsets(record) {
            if is_command(line) {
                if let Some((command, body_start)) = current.take() {
                    sections.push(Section {
                        command,
                        body: &record[body_start..offset],
                    });
                }
                let body_start = (offset + line.len() + 1).min(record.len());
                current = Some((line.trim_end_matches('\r'), body_start));
            } else if current.is_none() {
                let line = line.trim();
                if !line.is_empty() {
                    head.push(line);
                }
            }
        }

        if let Some((command, body_start)) = current {
            sections.push(Section {
                command,
                body: &record[body_start..],
            });
        }

        Self { head, sections }
    }

    /// Head lines as owned URL patterns.
    pub fn urls(&self) -> Vec<String> {
        self.head.iter().map(|s| s.to_string()).collect()
    }
}

/// Tracks section commands already seen in a record.
#[derive(Default)]
pub(crate) struct SeenCommands(Vec<&'static str>);

impl SeenCommands {
    /// Record `command`, failing if it appeared before.
    pub(crate) fn mark(&mut self, command: &'static str) -> Result<(), FixParseError> {
        if self.0.contains(&command) {
            return Err(FixParseError::DuplicateSection(command.to_string()));
        }
        self.0.push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "example.com\n*.example.org\n\nINVERT\n.logo\n.icon\n\nCSS\nbody {\n  color: red;\n}\n\n====================\n\nother.net\n\nNO INVERT\nimg\n";

    #[test]
    fn test_command_detection() {
        assert!(is_command("INVERT"));
        assert!(is_command("IGNORE INLINE STYLE"));
        assert!(is_command("CSS\r"));
        assert!(!is_command("example.com"));
        assert!(!is_command("Invert"));
        assert!(!is_command("NO  INVERT"));
        assert!(!is_command(""));
    }

    #[test]
    fn test_separator_detection() {
        assert!(is_separator("==="));
        assert!(is_separator("  ==========  "));
        assert!(!is_separator("=="));
        assert!(!is_separator("=== x"));
    }

    #[test]
    fn test_scan_blocks() {
        let records = scan_records(TEXT, RecordLayout::Blocks);
        assert_eq!(records.len(), 2);
        assert!(TEXT[records[0].clone()].starts_with("example.com"));
        assert!(TEXT[records[1].clone()].trim().starts_with("other.net"));
        assert!(!TEXT[records[0].clone()].contains("===="));
    }

    #[test]
    fn test_scan_blocks_skips_blank_records() {
        let text = "====\n\n====\na.com\n\nCSS\nx\n====\n";
        let records = scan_records(text, RecordLayout::Blocks);
        assert_eq!(records.len(), 1);
        assert_eq!(text[records[0].clone()].trim(), "a.com\n\nCSS\nx");
    }

    #[test]
    fn test_scan_lines() {
        let text = "# dark sites\nblocked.test\n\n  *.dark.example  \r\n";
        let records = scan_records(text, RecordLayout::Lines);
        let lines: Vec<&str> = records.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(lines, vec!["blocked.test", "*.dark.example"]);
    }

    #[test]
    fn test_record_patterns() {
        let records = scan_records(TEXT, RecordLayout::Blocks);
        let patterns = record_patterns(&TEXT[records[0].clone()]).unwrap();
        assert_eq!(patterns, vec!["example.com", "*.example.org"]);

        assert_eq!(
            record_patterns("INVERT\n.a\n"),
            Err(RecordErrorKind::NoUrlPatterns)
        );
        assert_eq!(
            record_patterns("example.com\nfoo.com\n"),
            Err(RecordErrorKind::NoCommands)
        );
    }

    #[test]
    fn test_record_parse_sections() {
        let records = scan_records(TEXT, RecordLayout::Blocks);
        let record = Record::parse(&TEXT[records[0].clone()]);

        assert_eq!(record.urls(), vec!["example.com", "*.example.org"]);
        assert_eq!(record.sections.len(), 2);
        assert_eq!(record.sections[0].command, "INVERT");
        assert_eq!(record.sections[0].entries(), vec![".logo", ".icon"]);
        assert_eq!(record.sections[1].command, "CSS");
        assert_eq!(record.sections[1].text(), "body {\n  color: red;\n}");
    }

    #[test]
    fn test_section_flag() {
        let present = Section { command: "NO COMMON", body: "\n" };
        assert_eq!(present.flag(), Ok(true));

        let off = Section { command: "NO COMMON", body: "false\n" };
        assert_eq!(off.flag(), Ok(false));

        let bad = Section { command: "NO COMMON", body: "maybe" };
        assert!(bad.flag().is_err());
    }

    #[test]
    fn test_seen_commands() {
        let mut seen = SeenCommands::default();
        assert!(seen.mark("CSS").is_ok());
        assert!(seen.mark("INVERT").is_ok());
        assert_eq!(
            seen.mark("CSS"),
            Err(FixParseError::DuplicateSection("CSS".to_string()))
        );
    }
}
