//! Site fix shapes and their record parsers.

mod dynamic;
mod inversion;
mod static_theme;

pub use dynamic::DynamicThemeFix;
pub use inversion::InversionFix;
pub use static_theme::{StaticTheme, ThemeBucket};

use serde::Serialize;
use std::sync::Arc;

use crate::error::FixParseError;
use crate::format::Record;
use crate::RuleCategory;

/// Properties shared by every site fix.
pub trait SiteProps {
    /// URL patterns the fix applies to.
    fn url(&self) -> &[String];
}

/// A site fix that can be materialized from one block record.
pub trait FixRecord: SiteProps + Send + Sync + Sized + 'static {
    /// Category whose records parse into this fix.
    const CATEGORY: RuleCategory;

    /// Build the fix from parsed record sections.
    fn from_record(record: &Record<'_>) -> Result<Self, FixParseError>;

    /// Parse record text into the fix.
    fn parse(text: &str) -> Result<Self, FixParseError> {
        let record = Record::parse(text);
        if record.head.is_empty() {
            return Err(FixParseError::NoUrlPatterns);
        }
        Self::from_record(&record)
    }

    /// Wrap into the tagged union.
    fn into_site_fix(fix: Arc<Self>) -> SiteFix;
}

/// Any site fix, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum SiteFix {
    /// Dynamic theme fix
    Dynamic(Arc<DynamicThemeFix>),
    /// Inversion (filter) fix
    Inversion(Arc<InversionFix>),
    /// Static theme
    Static(Arc<StaticTheme>),
}

impl SiteFix {
    /// Category the fix belongs to.
    pub fn category(&self) -> RuleCategory {
        match self {
            SiteFix::Dynamic(_) => RuleCategory::DynamicThemeFixes,
            SiteFix::Inversion(_) => RuleCategory::InversionFixes,
            SiteFix::Static(_) => RuleCategory::StaticThemes,
        }
    }
}

impl SiteProps for SiteFix {
    fn url(&self) -> &[String] {
        match self {
            SiteFix::Dynamic(fix) => fix.url(),
            SiteFix::Inversion(fix) => fix.url(),
            SiteFix::Static(fix) => fix.url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_fix_common_url() {
        let fix = DynamicThemeFix::parse("example.com\n\nCSS\nbody {}\n").unwrap();
        let tagged = DynamicThemeFix::into_site_fix(Arc::new(fix));
        assert_eq!(tagged.category(), RuleCategory::DynamicThemeFixes);
        assert_eq!(tagged.url(), &["example.com".to_string()]);
    }

    #[test]
    fn test_parse_requires_urls() {
        assert_eq!(
            InversionFix::parse("INVERT\n.a\n"),
            Err(FixParseError::NoUrlPatterns)
        );
    }

    #[test]
    fn test_site_fix_serializes_tagged() {
        let fix = InversionFix::parse("a.com\n\nINVERT\n.x\n").unwrap();
        let json = serde_json::to_value(InversionFix::into_site_fix(Arc::new(fix))).unwrap();
        assert_eq!(json["category"], "inversion");
        assert_eq!(json["invert"][0], ".x");
    }
}
