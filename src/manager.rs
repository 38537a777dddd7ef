//! Category loading and the public resolution API.
//!
//! A [`ConfigManager`] owns one slot per [`RuleCategory`]. Each slot holds
//! its installed state behind an [`ArcSwap`], so readers always see one whole
//! index and never block on a load.
//!
//! Loads are independent per category. When two loads of the same category
//! overlap, the one started last is installed and the other is discarded,
//! whatever order they finish in.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::color_scheme::ColorSchemeConfig;
use crate::config::{LoadOptions, ManagerConfig};
use crate::fetch::Fetcher;
use crate::fix::{DynamicThemeFix, FixRecord, InversionFix, SiteFix, StaticTheme};
use crate::index::IndexStats;
use crate::pattern::normalize_host;
use crate::props::{CacheStats, FixIndex};
use crate::site_list::SiteListIndex;
use crate::{Error, Result, RuleCategory};

/// Installed state of one category.
#[derive(Debug)]
pub enum LoadState<T> {
    /// Never loaded
    Unloaded,
    /// Ready for queries
    Loaded(Arc<T>),
    /// First load failed
    Failed(String),
}

impl<T> LoadState<T> {
    /// The loaded value, if any.
    pub fn loaded(&self) -> Option<&Arc<T>> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// Observable status of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    Unloaded,
    /// A load is in flight; queries use the previous state
    Loading,
    Loaded,
    Failed(String),
}

struct Slot<T> {
    /// Generation of the most recently started load
    started: AtomicU64,
    /// Generation of the most recently finished current load; guarded install
    settled: Mutex<u64>,
    state: ArcSwap<LoadState<T>>,
    /// Base text of the installed state
    raw: Mutex<Option<Arc<str>>>,
    /// Override text the installed state was built with
    installed_override: Mutex<Option<Arc<str>>>,
    /// Caller-supplied override for the next load
    pending_override: Mutex<Option<Arc<str>>>,
}

/// Built value, base text and the override merged into it.
type Built<T> = (T, Arc<str>, Option<Arc<str>>);

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            started: AtomicU64::new(0),
            settled: Mutex::new(0),
            state: ArcSwap::from_pointee(LoadState::Unloaded),
            raw: Mutex::new(None),
            installed_override: Mutex::new(None),
            pending_override: Mutex::new(None),
        }
    }

    fn begin(&self) -> u64 {
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn loaded(&self) -> Option<Arc<T>> {
        self.state.load().loaded().cloned()
    }

    fn status(&self) -> CategoryStatus {
        let settled = *self.settled.lock();
        if self.started.load(Ordering::SeqCst) > settled {
            return CategoryStatus::Loading;
        }
        match &**self.state.load() {
            LoadState::Unloaded => CategoryStatus::Unloaded,
            LoadState::Loaded(_) => CategoryStatus::Loaded,
            LoadState::Failed(reason) => CategoryStatus::Failed(reason.clone()),
        }
    }

    /// Install the outcome of generation `generation`.
    ///
    /// Returns `false` when a newer load has started since.
    fn settle(&self, generation: u64, outcome: std::result::Result<Built<T>, String>) -> bool {
        let mut settled = self.settled.lock();
        if self.started.load(Ordering::SeqCst) != generation {
            return false;
        }
        match outcome {
            Ok((value, raw, overrides)) => {
                self.state.store(Arc::new(LoadState::Loaded(Arc::new(value))));
                *self.raw.lock() = Some(raw);
                *self.installed_override.lock() = overrides;
            }
            Err(reason) => {
                if self.state.load().loaded().is_none() {
                    self.state.store(Arc::new(LoadState::Failed(reason)));
                }
            }
        }
        *settled = generation;
        true
    }
}

/// Loads all rule categories and answers per-site queries.
///
/// # Example
///
/// ```no_run
/// use sitefix::{ConfigManager, FileFetcher, LoadOptions, ManagerConfig};
/// use std::sync::Arc;
///
/// # async fn run() {
/// let manager = ConfigManager::new(
///     ManagerConfig::default(),
///     Arc::new(FileFetcher::new("config")),
/// );
/// manager.load(LoadOptions::local()).await;
///
/// if manager.is_url_in_dark_list("https://night.example/") {
///     return;
/// }
/// for fix in manager.dynamic_theme_fixes_for("https://docs.example.com/page") {
///     println!("{}", fix.css);
/// }
/// # }
/// ```
pub struct ConfigManager {
    config: ManagerConfig,
    bundled: Arc<dyn Fetcher>,
    remote: Option<Arc<dyn Fetcher>>,
    dark_sites: Slot<SiteListIndex>,
    dynamic_theme_fixes: Slot<FixIndex<DynamicThemeFix>>,
    inversion_fixes: Slot<FixIndex<InversionFix>>,
    static_themes: Slot<FixIndex<StaticTheme>>,
    color_schemes: Slot<ColorSchemeConfig>,
}

impl ConfigManager {
    /// Create a manager reading bundled text through `bundled`.
    pub fn new(config: ManagerConfig, bundled: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            bundled,
            remote: None,
            dark_sites: Slot::new(),
            dynamic_theme_fixes: Slot::new(),
            inversion_fixes: Slot::new(),
            static_themes: Slot::new(),
            color_schemes: Slot::new(),
        }
    }

    /// Fetch configured remote locations through `remote`.
    pub fn with_remote(mut self, remote: Arc<dyn Fetcher>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Load every category concurrently.
    ///
    /// Never fails as a whole: a category whose text cannot be retrieved keeps
    /// its previous state (or becomes failed on first load), and malformed
    /// records are skipped.
    pub async fn load(&self, options: LoadOptions) {
        let idle = self.config.cache_idle();
        tokio::join!(
            self.load_category(&self.dark_sites, RuleCategory::DarkSites, options, |base, overrides| {
                let (list, report) = SiteListIndex::build(RuleCategory::DarkSites, base, overrides);
                (list, report.indexed, report.errors.len())
            }),
            self.load_category(
                &self.dynamic_theme_fixes,
                RuleCategory::DynamicThemeFixes,
                options,
                move |base, overrides| build_fixes(base, overrides, idle),
            ),
            self.load_category(
                &self.inversion_fixes,
                RuleCategory::InversionFixes,
                options,
                move |base, overrides| build_fixes(base, overrides, idle),
            ),
            self.load_category(
                &self.static_themes,
                RuleCategory::StaticThemes,
                options,
                move |base, overrides| build_fixes(base, overrides, idle),
            ),
            self.load_category(&self.color_schemes, RuleCategory::ColorSchemes, options, |base, _| {
                let (config, errors) = ColorSchemeConfig::parse(&base);
                let count = config.len();
                (config, count, errors.len())
            }),
        );
    }

    async fn load_category<T, B>(
        &self,
        slot: &Slot<T>,
        category: RuleCategory,
        options: LoadOptions,
        build: B,
    ) where
        B: FnOnce(Arc<str>, Option<Arc<str>>) -> (T, usize, usize),
    {
        let generation = slot.begin();
        let overrides = if options.local || !category.accepts_override() {
            None
        } else {
            slot.pending_override.lock().clone()
        };

        let outcome = match self.fetch_text(category, options).await {
            Ok(text) => {
                let base: Arc<str> = text.into();
                let (value, indexed, skipped) = build(Arc::clone(&base), overrides.clone());
                log::info!(
                    "Loaded {}: {} entries, {} skipped",
                    category.display_name(),
                    indexed,
                    skipped
                );
                Ok((value, base, overrides))
            }
            Err(e) => {
                log::error!("Failed to load {}: {}", category.display_name(), e);
                Err(e.to_string())
            }
        };

        if !slot.settle(generation, outcome) {
            log::debug!(
                "Discarding stale {} load (generation {})",
                category,
                generation
            );
        }
    }

    async fn fetch_text(&self, category: RuleCategory, options: LoadOptions) -> Result<String> {
        let source = self.config.source(category);
        if !options.local {
            if let (Some(location), Some(remote)) = (&source.remote, &self.remote) {
                match remote.fetch_text(location).await {
                    Ok(text) => return Ok(text),
                    Err(e) => log::warn!(
                        "Remote {} unavailable, using bundled text: {}",
                        category.display_name(),
                        e
                    ),
                }
            }
        }
        self.bundled.fetch_text(&source.bundled).await
    }

    /// Store override text merged into a category by the next load.
    ///
    /// `None` removes the override.
    pub fn set_override(&self, category: RuleCategory, text: Option<String>) -> Result<()> {
        if !category.accepts_override() {
            return Err(Error::Config(format!(
                "{} does not accept override text",
                category.display_name()
            )));
        }
        let text = text.map(Arc::<str>::from);
        match category {
            RuleCategory::DarkSites => *self.dark_sites.pending_override.lock() = text,
            RuleCategory::DynamicThemeFixes => {
                *self.dynamic_theme_fixes.pending_override.lock() = text
            }
            RuleCategory::InversionFixes => *self.inversion_fixes.pending_override.lock() = text,
            RuleCategory::StaticThemes => *self.static_themes.pending_override.lock() = text,
            RuleCategory::ColorSchemes => {}
        }
        Ok(())
    }

    /// Check if the site of `url` is already dark.
    ///
    /// `false` when the list is not loaded or no host can be extracted.
    pub fn is_url_in_dark_list(&self, url: &str) -> bool {
        let Some(host) = normalize_host(url) else {
            return false;
        };
        self.dark_sites
            .loaded()
            .is_some_and(|list| list.contains(&host))
    }

    /// Dynamic theme fixes for `url`, in declaration order.
    pub fn dynamic_theme_fixes_for(&self, url: &str) -> Vec<Arc<DynamicThemeFix>> {
        resolve(&self.dynamic_theme_fixes, url)
    }

    /// Inversion fixes for `url`, in declaration order.
    pub fn inversion_fixes_for(&self, url: &str) -> Vec<Arc<InversionFix>> {
        resolve(&self.inversion_fixes, url)
    }

    /// Static themes for `url`, in declaration order.
    pub fn static_themes_for(&self, url: &str) -> Vec<Arc<StaticTheme>> {
        resolve(&self.static_themes, url)
    }

    /// Fixes of any fix category for `url`.
    ///
    /// Categories without per-site fixes yield nothing.
    pub fn fixes_for(&self, category: RuleCategory, url: &str) -> Vec<SiteFix> {
        match category {
            RuleCategory::DynamicThemeFixes => tagged(self.dynamic_theme_fixes_for(url)),
            RuleCategory::InversionFixes => tagged(self.inversion_fixes_for(url)),
            RuleCategory::StaticThemes => tagged(self.static_themes_for(url)),
            RuleCategory::DarkSites | RuleCategory::ColorSchemes => Vec::new(),
        }
    }

    /// Loaded color schemes.
    pub fn color_schemes(&self) -> Option<Arc<ColorSchemeConfig>> {
        self.color_schemes.loaded()
    }

    /// Base text of the installed category.
    pub fn raw(&self, category: RuleCategory) -> Option<Arc<str>> {
        let raw = match category {
            RuleCategory::DarkSites => &self.dark_sites.raw,
            RuleCategory::DynamicThemeFixes => &self.dynamic_theme_fixes.raw,
            RuleCategory::InversionFixes => &self.inversion_fixes.raw,
            RuleCategory::StaticThemes => &self.static_themes.raw,
            RuleCategory::ColorSchemes => &self.color_schemes.raw,
        };
        raw.lock().clone()
    }

    /// Override text merged into the installed category.
    ///
    /// Text passed to [`set_override`](Self::set_override) shows up here only
    /// once a load has used it.
    pub fn override_text(&self, category: RuleCategory) -> Option<Arc<str>> {
        let text = match category {
            RuleCategory::DarkSites => &self.dark_sites.installed_override,
            RuleCategory::DynamicThemeFixes => &self.dynamic_theme_fixes.installed_override,
            RuleCategory::InversionFixes => &self.inversion_fixes.installed_override,
            RuleCategory::StaticThemes => &self.static_themes.installed_override,
            RuleCategory::ColorSchemes => &self.color_schemes.installed_override,
        };
        text.lock().clone()
    }

    /// Load status of a category.
    pub fn state(&self, category: RuleCategory) -> CategoryStatus {
        match category {
            RuleCategory::DarkSites => self.dark_sites.status(),
            RuleCategory::DynamicThemeFixes => self.dynamic_theme_fixes.status(),
            RuleCategory::InversionFixes => self.inversion_fixes.status(),
            RuleCategory::StaticThemes => self.static_themes.status(),
            RuleCategory::ColorSchemes => self.color_schemes.status(),
        }
    }

    /// Index statistics of a loaded domain-indexed category.
    pub fn index_stats(&self, category: RuleCategory) -> Option<IndexStats> {
        match category {
            RuleCategory::DarkSites => self.dark_sites.loaded().map(|l| l.index().stats()),
            RuleCategory::DynamicThemeFixes => {
                self.dynamic_theme_fixes.loaded().map(|f| f.index().stats())
            }
            RuleCategory::InversionFixes => self.inversion_fixes.loaded().map(|f| f.index().stats()),
            RuleCategory::StaticThemes => self.static_themes.loaded().map(|f| f.index().stats()),
            RuleCategory::ColorSchemes => None,
        }
    }

    /// Cache sizes of a loaded fix category.
    pub fn cache_stats(&self, category: RuleCategory) -> Option<CacheStats> {
        match category {
            RuleCategory::DynamicThemeFixes => {
                self.dynamic_theme_fixes.loaded().map(|f| f.cache_stats())
            }
            RuleCategory::InversionFixes => self.inversion_fixes.loaded().map(|f| f.cache_stats()),
            RuleCategory::StaticThemes => self.static_themes.loaded().map(|f| f.cache_stats()),
            RuleCategory::DarkSites | RuleCategory::ColorSchemes => None,
        }
    }

    /// Drop every cached lookup and parsed fix.
    pub fn clear_caches(&self) {
        if let Some(index) = self.dynamic_theme_fixes.loaded() {
            index.clear_caches();
        }
        if let Some(index) = self.inversion_fixes.loaded() {
            index.clear_caches();
        }
        if let Some(index) = self.static_themes.loaded() {
            index.clear_caches();
        }
    }

    /// Cancel every pending eviction timer.
    pub fn shutdown(&self) {
        if let Some(index) = self.dynamic_theme_fixes.loaded() {
            index.cancel_eviction();
        }
        if let Some(index) = self.inversion_fixes.loaded() {
            index.cancel_eviction();
        }
        if let Some(index) = self.static_themes.loaded() {
            index.cancel_eviction();
        }
        log::debug!("Eviction timers cancelled");
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ConfigManager");
        for category in RuleCategory::ALL {
            s.field(category.as_str(), &self.state(category));
        }
        s.finish()
    }
}

fn build_fixes<F: FixRecord>(
    base: Arc<str>,
    overrides: Option<Arc<str>>,
    idle: std::time::Duration,
) -> (FixIndex<F>, usize, usize) {
    let (index, report) = FixIndex::build(base, overrides, idle);
    (index, report.indexed, report.errors.len())
}

fn resolve<F: FixRecord>(slot: &Slot<FixIndex<F>>, url: &str) -> Vec<Arc<F>> {
    let Some(host) = normalize_host(url) else {
        return Vec::new();
    };
    match slot.loaded() {
        Some(index) => index.fixes_for_host(&host),
        None => Vec::new(),
    }
}

fn tagged<F: FixRecord>(fixes: Vec<Arc<F>>) -> Vec<SiteFix> {
    fixes.into_iter().map(F::into_site_fix).collect()
}
