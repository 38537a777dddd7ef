//! Sitefix - Domain-indexed site fix resolution for dark-mode engines.
//!
//! This crate loads the per-site rule databases of a dark-mode engine and
//! answers, for a given URL, which fixes apply to it.
//!
//! # Features
//!
//! - **Domain index**: Exact hosts, wildcard label keys and match-all
//!   patterns, resolved in declaration order
//! - **Lazy parsing**: Records are kept as raw text and parsed on first use
//! - **Idle eviction**: Lookup and fix caches are dropped after an idle interval
//! - **Hot reload**: Categories are replaced atomically; overlapping loads
//!   resolve to the one started last
//! - **Remote rules**: Download with bundled fallback and gzip support
//!
//! # Quick Start
//!
//! ```no_run
//! use sitefix::{ConfigManager, FileFetcher, HttpFetcher, LoadOptions, ManagerConfig, RuleCategory};
//! use std::sync::Arc;
//!
//! # async fn run() -> sitefix::Result<()> {
//! let config = ManagerConfig::default().with_remote(
//!     RuleCategory::DarkSites,
//!     "https://example.com/config/dark-sites.config",
//! );
//! let manager = ConfigManager::new(config, Arc::new(FileFetcher::new("config")))
//!     .with_remote(Arc::new(HttpFetcher::new()?));
//!
//! manager.load(LoadOptions::remote()).await;
//!
//! let dark = manager.is_url_in_dark_list("https://night.example/");
//! let fixes = manager.inversion_fixes_for("https://docs.example.com/intro");
//! # Ok(())
//! # }
//! ```
//!
//! # Rule Categories
//!
//! - **Dark sites**: One URL pattern per line
//! - **Dynamic theme fixes**: `INVERT`, `CSS`, `IGNORE INLINE STYLE`, ...
//! - **Inversion fixes**: `INVERT`, `NO INVERT`, `REMOVE BG`, `CSS`
//! - **Static themes**: Selector buckets such as `NEUTRAL BG` or `RED TEXT`
//! - **Color schemes**: Named `LIGHT`/`DARK` color pairs
//!
//! # Resolution Order
//!
//! Fixes are returned in the order their records appear in the rule text,
//! base text first, then override text. A generic `*` record matches every
//! site and is returned in its declared position.

mod category;
mod error;

pub mod color_scheme;
pub mod config;
pub mod eviction;
pub mod fetch;
pub mod fix;
pub mod format;
pub mod index;
pub mod manager;
pub mod pattern;
pub mod props;
pub mod site_list;

// Re-export core types
pub use category::RuleCategory;
pub use error::{
    ColorSchemeError, Error, FixMaterializeError, FixParseError, RecordErrorKind,
    RecordParseError, Result, TextSource,
};

// Re-export rule shapes
pub use color_scheme::{ColorSchemeConfig, ColorSchemeVariant};
pub use fix::{DynamicThemeFix, FixRecord, InversionFix, SiteFix, SiteProps, StaticTheme, ThemeBucket};

// Re-export indexes
pub use index::{IndexStats, SiteIndex};
pub use props::{CacheStats, FixIndex};
pub use site_list::SiteListIndex;

// Re-export loading API
pub use config::{LoadOptions, ManagerConfig, SourceConfig};
pub use fetch::{Fetcher, FileFetcher, HttpFetcher, MemoryFetcher};
pub use manager::{CategoryStatus, ConfigManager, LoadState};
