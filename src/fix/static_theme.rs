//! Static theme.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{FixRecord, SiteFix, SiteProps};
use crate::error::FixParseError;
use crate::format::{Record, SeenCommands};
use crate::RuleCategory;

/// Selector bucket of a static theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ThemeBucket {
    NeutralBg,
    NeutralBgActive,
    NeutralText,
    NeutralTextActive,
    NeutralBorder,
    RedBg,
    RedBgActive,
    RedText,
    RedTextActive,
    RedBorder,
    GreenBg,
    GreenBgActive,
    GreenText,
    GreenTextActive,
    GreenBorder,
    BlueBg,
    BlueBgActive,
    BlueText,
    BlueTextActive,
    BlueBorder,
    FadeBg,
    FadeText,
    TransparentBg,
    NoImage,
    Invert,
}

impl ThemeBucket {
    /// All buckets in declaration order
    pub const ALL: [ThemeBucket; 25] = [
        ThemeBucket::NeutralBg,
        ThemeBucket::NeutralBgActive,
        ThemeBucket::NeutralText,
        ThemeBucket::NeutralTextActive,
        ThemeBucket::NeutralBorder,
        ThemeBucket::RedBg,
        ThemeBucket::RedBgActive,
        ThemeBucket::RedText,
        ThemeBucket::RedTextActive,
        ThemeBucket::RedBorder,
        ThemeBucket::GreenBg,
        ThemeBucket::GreenBgActive,
        ThemeBucket::GreenText,
        ThemeBucket::GreenTextActive,
        ThemeBucket::GreenBorder,
        ThemeBucket::BlueBg,
        ThemeBucket::BlueBgActive,
        ThemeBucket::BlueText,
        ThemeBucket::BlueTextActive,
        ThemeBucket::BlueBorder,
        ThemeBucket::FadeBg,
        ThemeBucket::FadeText,
        ThemeBucket::TransparentBg,
        ThemeBucket::NoImage,
        ThemeBucket::Invert,
    ];

    /// Section command naming this bucket.
    pub fn command(&self) -> &'static str {
        match self {
            ThemeBucket::NeutralBg => "NEUTRAL BG",
            ThemeBucket::NeutralBgActive => "NEUTRAL BG ACTIVE",
            ThemeBucket::NeutralText => "NEUTRAL TEXT",
            ThemeBucket::NeutralTextActive => "NEUTRAL TEXT ACTIVE",
            ThemeBucket::NeutralBorder => "NEUTRAL BORDER",
            ThemeBucket::RedBg => "RED BG",
            ThemeBucket::RedBgActive => "RED BG ACTIVE",
            ThemeBucket::RedText => "RED TEXT",
            ThemeBucket::RedTextActive => "RED TEXT ACTIVE",
            ThemeBucket::RedBorder => "RED BORDER",
            ThemeBucket::GreenBg => "GREEN BG",
            ThemeBucket::GreenBgActive => "GREEN BG ACTIVE",
            ThemeBucket::GreenText => "GREEN TEXT",
            ThemeBucket::GreenTextActive => "GREEN TEXT ACTIVE",
            ThemeBucket::GreenBorder => "GREEN BORDER",
            ThemeBucket::BlueBg => "BLUE BG",
            ThemeBucket::BlueBgActive => "BLUE BG ACTIVE",
            ThemeBucket::BlueText => "BLUE TEXT",
            ThemeBucket::BlueTextActive => "BLUE TEXT ACTIVE",
            ThemeBucket::BlueBorder => "BLUE BORDER",
            ThemeBucket::FadeBg => "FADE BG",
            ThemeBucket::FadeText => "FADE TEXT",
            ThemeBucket::TransparentBg => "TRANSPARENT BG",
            ThemeBucket::NoImage => "NO IMAGE",
            ThemeBucket::Invert => "INVERT",
        }
    }

    /// Look up a bucket by its section command.
    pub fn from_command(command: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.command() == command)
    }
}

impl fmt::Display for ThemeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Static theme overrides for a site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticTheme {
    pub url: Vec<String>,
    /// Selectors per bucket; buckets without a section are absent
    pub buckets: BTreeMap<ThemeBucket, Vec<String>>,
    /// Skip the common theme rules for this site
    pub no_common: bool,
}

impl StaticTheme {
    /// Selectors of a bucket, empty when the record has no such section.
    pub fn selectors(&self, bucket: ThemeBucket) -> &[String] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl SiteProps for StaticTheme {
    fn url(&self) -> &[String] {
        &self.url
    }
}

impl FixRecord for StaticTheme {
    const CATEGORY: RuleCategory = RuleCategory::StaticThemes;

    fn from_record(record: &Record<'_>) -> Result<Self, FixParseError> {
        let mut theme = StaticTheme {
            url: record.urls(),
            ..Default::default()
        };
        let mut seen = SeenCommands::default();

        for section in &record.sections {
            if section.command == "NO COMMON" {
                seen.mark("NO COMMON")?;
                theme.no_common = section.flag()?;
                continue;
            }
            let bucket = ThemeBucket::from_command(section.command)
                .ok_or_else(|| FixParseError::UnknownCommand(section.command.to_string()))?;
            seen.mark(bucket.command())?;
            theme.buckets.insert(bucket, section.entries());
        }

        Ok(theme)
    }

    fn into_site_fix(theme: Arc<Self>) -> SiteFix {
        SiteFix::Static(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_commands_round_trip() {
        for bucket in ThemeBucket::ALL {
            assert_eq!(ThemeBucket::from_command(bucket.command()), Some(bucket));
        }
        assert_eq!(ThemeBucket::from_command("PURPLE BG"), None);
    }

    #[test]
    fn test_parse_static_theme() {
        let text = "news.example\n\nNEUTRAL BG\nbody\n.card\n\nRED TEXT\n.error\n\nNO IMAGE\n.hero\n\nNO COMMON\n";
        let theme = StaticTheme::parse(text).unwrap();

        assert_eq!(theme.url, vec!["news.example"]);
        assert_eq!(theme.selectors(ThemeBucket::NeutralBg), &["body", ".card"]);
        assert_eq!(theme.selectors(ThemeBucket::RedText), &[".error"]);
        assert_eq!(theme.selectors(ThemeBucket::NoImage), &[".hero"]);
        assert!(theme.selectors(ThemeBucket::BlueBorder).is_empty());
        assert!(theme.no_common);
    }

    #[test]
    fn test_duplicate_bucket() {
        let err = StaticTheme::parse("a.com\n\nFADE BG\n.a\n\nFADE BG\n.b\n").unwrap_err();
        assert_eq!(err, FixParseError::DuplicateSection("FADE BG".to_string()));
    }

    #[test]
    fn test_serialize_bucket_keys() {
        let theme = StaticTheme::parse("a.com\n\nTRANSPARENT BG\n.x\n").unwrap();
        let json = serde_json::to_value(&theme).unwrap();
        assert_eq!(json["buckets"]["transparentBg"][0], ".x");
        assert_eq!(json["noCommon"], false);
    }
}
