//! Dynamic theme fix.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use super::{FixRecord, SiteFix, SiteProps};
use crate::error::FixParseError;
use crate::format::{Record, SeenCommands};
use crate::RuleCategory;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Per-site fix applied by the dynamic theme engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicThemeFix {
    /// URL patterns of the sites where the fix applies
    pub url: Vec<String>,
    /// Selectors to invert, usually icons in sprites
    pub invert: Vec<String>,
    /// Additional CSS; `${color}` placeholders are resolved by the theme engine
    pub css: String,
    /// Selectors whose inline style is not analyzed
    pub ignore_inline_style: Vec<String>,
    /// Selectors whose images are not analyzed
    pub ignore_image_analysis: Vec<String>,
    /// Disable the `document.styleSheets` proxy
    pub disable_style_sheets_proxy: bool,
    /// Disable the `CustomElementRegistry` proxy
    pub disable_custom_element_registry_proxy: bool,
}

impl DynamicThemeFix {
    /// Template variables referenced by the CSS, in order of first use.
    pub fn css_placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.css) {
            if let Some(name) = caps.get(1) {
                let name = name.as_str().trim();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl SiteProps for DynamicThemeFix {
    fn url(&self) -> &[String] {
        &self.url
    }
}

impl FixRecord for DynamicThemeFix {
    const CATEGORY: RuleCategory = RuleCategory::DynamicThemeFixes;

    fn from_record(record: &Record<'_>) -> Result<Self, FixParseError> {
        let mut fix = DynamicThemeFix {
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
                "CSS" => {
                    seen.mark("CSS")?;
                    fix.css = section.text();
                }
                "IGNORE INLINE STYLE" => {
                    seen.mark("IGNORE INLINE STYLE")?;
                    fix.ignore_inline_style = section.entries();
                }
                "IGNORE IMAGE ANALYSIS" => {
                    seen.mark("IGNORE IMAGE ANALYSIS")?;
                    fix.ignore_image_analysis = section.entries();
                }
                "DISABLE STYLESHEETS PROXY" => {
                    seen.mark("DISABLE STYLESHEETS PROXY")?;
                    fix.disable_style_sheets_proxy = section.flag()?;
                }
                "DISABLE CUSTOM ELEMENT REGISTRY PROXY" => {
                    seen.mark("DISABLE CUSTOM ELEMENT REGISTRY PROXY")?;
                    fix.disable_custom_element_registry_proxy = section.flag()?;
                }
                other => return Err(FixParseError::UnknownCommand(other.to_string())),
            }
        }

        Ok(fix)
    }

    fn into_site_fix(fix: Arc<Self>) -> SiteFix {
        SiteFix::Dynamic(fix)
    }
}
