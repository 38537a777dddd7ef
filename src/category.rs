//! Rule category definitions.

use std::fmt;

/// RuleCategory identifies one of the independent rule databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleCategory {
    /// Sites that are already dark and should be left alone
    DarkSites,
    /// Per-site fixes for the dynamic theme engine
    DynamicThemeFixes,
    /// Per-site fixes for the filter (inversion) engine
    InversionFixes,
    /// Per-site static theme overrides
    StaticThemes,
    /// Named light/dark color schemes (not domain-indexed)
    ColorSchemes,
}

impl RuleCategory {
    /// All categories, in load order.
    pub const ALL: [RuleCategory; 5] = [
        RuleCategory::DarkSites,
        RuleCategory::DynamicThemeFixes,
        RuleCategory::InversionFixes,
        RuleCategory::StaticThemes,
        RuleCategory::ColorSchemes,
    ];

    /// Parse a category from its name (case-insensitive, `-` or `_`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "dark_sites" | "darksites" => Some(RuleCategory::DarkSites),
            "dynamic_theme_fixes" | "dynamic" => Some(RuleCategory::DynamicThemeFixes),
            "inversion_fixes" | "inversion" => Some(RuleCategory::InversionFixes),
            "static_themes" | "static" => Some(RuleCategory::StaticThemes),
            "color_schemes" | "colorschemes" => Some(RuleCategory::ColorSchemes),
            _ => None,
        }
    }

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::DarkSites => "dark_sites",
            RuleCategory::DynamicThemeFixes => "dynamic_theme_fixes",
            RuleCategory::InversionFixes => "inversion_fixes",
            RuleCategory::StaticThemes => "static_themes",
            RuleCategory::ColorSchemes => "color_schemes",
        }
    }

    /// Get the display name for diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            RuleCategory::DarkSites => "Dark sites",
            RuleCategory::DynamicThemeFixes => "Dynamic theme fixes",
            RuleCategory::InversionFixes => "Inversion fixes",
            RuleCategory::StaticThemes => "Static themes",
            RuleCategory::ColorSchemes => "Color schemes",
        }
    }

    /// File name of the bundled rule text for this category.
    pub fn bundled_file(&self) -> &'static str {
        match self {
            RuleCategory::DarkSites => "dark-sites.config",
            RuleCategory::DynamicThemeFixes => "dynamic-theme-fixes.config",
            RuleCategory::InversionFixes => "inversion-fixes.config",
            RuleCategory::StaticThemes => "static-themes.config",
            RuleCategory::ColorSchemes => "color-schemes.drconf",
        }
    }

    /// Whether this category is resolved through a domain index.
    pub fn is_domain_indexed(&self) -> bool {
        !matches!(self, RuleCategory::ColorSchemes)
    }

    /// Whether a caller-supplied override text is merged into this category.
    pub fn accepts_override(&self) -> bool {
        self.is_domain_indexed()
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
