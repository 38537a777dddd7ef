//! Inversion fix.

use serde::Serialize;
use std::sync::Arc;

use super::{FixRecord, SiteFix, SiteProps};
use crate::error::FixParseError;
use crate::format::{Record, SeenCommands};
use crate::RuleCategory;

/// Per-site fix applied by the filter (inversion) engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InversionFix {
    pub url: Vec<String>,
    /// Selectors to invert again
    pub invert: Vec<String>,
    /// Selectors excluded from inversion
    pub noinvert: Vec<String>,
    /// Selectors whose background is removed
    pub removebg: Vec<String>,
    pub css: String,
}

impl SiteProps for InversionFix {
    fn url(&self) -> &[String] {
        &self.url
    }
}

impl FixRecord for InversionFix {
    const CATEGORY: RuleCategory = RuleCategory::InversionFixes;

    fn from_record(record: &Record<'_>) -> Result<Self, FixParseError> {
        let mut fix = InversionFix {
            url: record.urls(),
            ..Default::default()
        };
        let mut seen = SeenCommands::default();

        for section in &record.sections {
            match section.command {
                "INVERT" => {
                    seen.mark("INVERT")?;
                    fix.invert = section.entries();
                }
                "NO INVERT" => {
                    seen.mark("NO INVERT")?;
                    fix.noinvert = section.entries();
                }
                "REMOVE BG" => {
                    seen.mark("REMOVE BG")?;
                    fix.removebg = section.entries();
                }
                "CSS" => {
                    seen.mark("CSS")?;
                    fix.css = section.text();
                }
                other => return Err(FixParseError::UnknownCommand(other.to_string())),
            }
        }

        Ok(fix)
    }

    fn into_site_fix(fix: Arc<Self>) -> SiteFix {
        SiteFix::Inversion(fix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inversion_fix() {
        let text = "docs.example.com\n\nINVERT\n.diagram\n\nNO INVERT\nimg\nvideo\n\nREMOVE BG\n.banner\n\nCSS\n.x { filter: none; }\n";
        let fix = InversionFix::parse(text).unwrap();

        assert_eq!(fix.url, vec!["docs.example.com"]);
        assert_eq!(fix.invert, vec![".diagram"]);
        assert_eq!(fix.noinvert, vec!["img", "video"]);
        assert_eq!(fix.removebg, vec![".banner"]);
        assert_eq!(fix.css, ".x { filter: none; }");
    }

    #[test]
    fn test_rejects_dynamic_only_command() {
        let err = InversionFix::parse("a.com\n\nIGNORE INLINE STYLE\n.x\n").unwrap_err();
        assert!(matches!(err, FixParseError::UnknownCommand(_)));
    }
}
