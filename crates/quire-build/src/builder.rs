//! Full site builds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use quire_config::{CliSettings, SiteConfig};
use quire_content::{Discovery, Page};
use quire_plugin::{Asset, PageDraft, PluginComposer, PluginRegistry, PluginSet};
use quire_site::{NavTree, NavWarning, NavigationError, NavigationResolver, ResolverOptions};
use rayon::prelude::*;

use crate::base_path::BasePath;
use crate::output::{StagedFile, asset_to_path, route_to_path, write_atomic};
use crate::theme::{DefaultTheme, RenderContext, ThemeRenderer};
use crate::{BuildError, BuildReport, BuildState, BuildWarning, PageError};

/// Build policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    /// Navigation resolution policy.
    pub resolver: ResolverOptions,
    /// Write the pages that succeed and report the rest, instead of writing
    /// nothing when any page fails.
    pub keep_going: bool,
}

/// Everything a render needs, shared by all render threads.
#[derive(Clone)]
pub(crate) struct SiteSnapshot {
    pub(crate) config: Arc<SiteConfig>,
    pub(crate) base: BasePath,
    pub(crate) pages: Arc<[Page]>,
    pub(crate) sidebar: Arc<NavTree>,
    pub(crate) navbar: Arc<NavTree>,
    pub(crate) plugins: Arc<PluginSet>,
}

impl SiteSnapshot {
    pub(crate) fn page(&self, route: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.route == route)
    }
}

/// Output of one page render, not yet written.
#[derive(Debug)]
pub(crate) struct RenderedPage {
    pub(crate) route: String,
    pub(crate) html: String,
    pub(crate) assets: Vec<Asset>,
}

impl RenderedPage {
    pub(crate) fn write(&self, dest_dir: &Path) -> Result<(), PageError> {
        let staged = self.stage(dest_dir)?;
        let path = staged.path().to_path_buf();
        staged.commit().map_err(|source| self.write_error(path, source))
    }

    /// Write the HTML beside its destination without replacing it yet.
    pub(crate) fn stage(&self, dest_dir: &Path) -> Result<StagedFile, PageError> {
        let path = route_to_path(dest_dir, &self.route);
        StagedFile::stage(&path, self.html.as_bytes())
            .map_err(|source| self.write_error(path, source))
    }

    pub(crate) fn write_error(&self, path: PathBuf, source: std::io::Error) -> PageError {
        PageError::Write {
            route: self.route.clone(),
            path,
            source,
        }
    }
}

/// Runs builds for one theme and plugin registry.
///
/// # Example
///
/// ```ignore
/// use quire_build::{BuildOptions, Builder};
///
/// let builder = Builder::new(BuildOptions::default());
/// let report = builder.build(None, None)?;
/// println!("{} pages written", report.pages_written);
/// ```
pub struct Builder {
    options: BuildOptions,
    registry: PluginRegistry,
    theme: Arc<dyn ThemeRenderer>,
    state: Mutex<BuildState>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Create a builder with the built-in plugins and the default theme.
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            registry: PluginRegistry::builtin(),
            theme: Arc::new(DefaultTheme),
            state: Mutex::new(BuildState::Idle),
        }
    }

    /// Replace the plugin registry.
    #[must_use]
    pub fn with_registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the theme.
    #[must_use]
    pub fn with_theme(mut self, theme: impl ThemeRenderer + 'static) -> Self {
        self.theme = Arc::new(theme);
        self
    }

    /// Build policy.
    #[must_use]
    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Stage of the current or last build.
    ///
    /// # Panics
    ///
    /// Panics if the state lock is poisoned.
    #[must_use]
    pub fn state(&self) -> BuildState {
        *self.state.lock().unwrap()
    }

    pub(crate) fn theme(&self) -> Arc<dyn ThemeRenderer> {
        Arc::clone(&self.theme)
    }

    fn set_state(&self, state: BuildState) {
        *self.state.lock().unwrap() = state;
        tracing::info!(state = %state, "Build stage");
    }

    /// Load the configuration and build the site.
    ///
    /// See [`SiteConfig::load`] for how `config_path` and `cli_settings`
    /// are used.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: configuration, discovery, navigation,
    /// page failures (unless `keep_going` is set), or output I/O.
    pub fn build(
        &self,
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<BuildReport, BuildError> {
        self.set_state(BuildState::Loading);
        let config = match SiteConfig::load(config_path, cli_settings) {
            Ok(config) => config,
            Err(e) => {
                self.set_state(BuildState::Failed);
                return Err(e.into());
            }
        };
        self.build_config(config)
    }

    /// Build the site for an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::build`], minus configuration loading.
    pub fn build_config(&self, config: SiteConfig) -> Result<BuildReport, BuildError> {
        self.run(Arc::new(config), self.options.keep_going)
            .map(|(report, _)| report)
    }

    /// Full build, returning the site snapshot for reuse by a dev session.
    pub(crate) fn run(
        &self,
        config: Arc<SiteConfig>,
        keep_going: bool,
    ) -> Result<(BuildReport, SiteSnapshot), BuildError> {
        let started = Instant::now();
        let mut result = self.run_stages(config, keep_going);
        match &mut result {
            Ok((report, _)) => {
                report.elapsed = started.elapsed();
                self.set_state(BuildState::Done);
                tracing::info!(
                    pages = report.pages_written,
                    assets = report.assets_written,
                    warnings = report.warnings.len(),
                    failures = report.failures.len(),
                    elapsed_ms = report.elapsed.as_millis(),
                    "Build finished"
                );
            }
            Err(e) => {
                self.set_state(BuildState::Failed);
                tracing::error!(error = %e, "Build failed");
            }
        }
        result
    }

    fn run_stages(
        &self,
        config: Arc<SiteConfig>,
        keep_going: bool,
    ) -> Result<(BuildReport, SiteSnapshot), BuildError> {
        self.set_state(BuildState::Discovering);
        let pages = Discovery::new(&config.source_dir).discover()?;

        self.set_state(BuildState::ResolvingNav);
        let nav = resolve_navigation(&config, &pages, self.options.resolver)?;
        let mut warnings: Vec<BuildWarning> = nav.warnings.into_iter().map(Into::into).collect();

        self.set_state(BuildState::Composing);
        let composition = PluginComposer::new(&self.registry).compose(&config);
        warnings.extend(composition.warnings.into_iter().map(BuildWarning::from));

        let site = SiteSnapshot {
            base: BasePath::new(&config.base_path),
            config,
            pages: pages.into(),
            sidebar: Arc::new(nav.sidebar),
            navbar: Arc::new(nav.navbar),
            plugins: Arc::new(composition.plugins),
        };

        self.set_state(BuildState::Rendering);
        let (rendered, failures) = render_all(&site, self.theme.as_ref(), &site.pages[..]);
        if !failures.is_empty() && !keep_going {
            return Err(BuildError::Pages(failures));
        }

        let mut report = BuildReport {
            warnings,
            failures,
            ..BuildReport::default()
        };
        self.commit(&site, &rendered, keep_going, &mut report)?;
        Ok((report, site))
    }

    fn commit(
        &self,
        site: &SiteSnapshot,
        rendered: &[RenderedPage],
        keep_going: bool,
        report: &mut BuildReport,
    ) -> Result<(), BuildError> {
        let dest = site.config.dest_dir.as_path();
        std::fs::create_dir_all(dest).map_err(|source| BuildError::Output {
            path: dest.to_path_buf(),
            source,
        })?;

        let written: Vec<_> = rendered.par_iter().map(|page| page.write(dest)).collect();
        let mut write_failures = Vec::new();
        for result in written {
            match result {
                Ok(()) => report.pages_written += 1,
                Err(e) => write_failures.push(e),
            }
        }
        if !write_failures.is_empty() && !keep_going {
            return Err(BuildError::Pages(write_failures));
        }
        report.failures.extend(write_failures);

        let assets = collect_assets(self.theme.assets(), rendered);
        let (count, warnings) = write_assets(dest, &assets)?;
        report.assets_written = count;
        report.warnings.extend(warnings);
        Ok(())
    }
}

/// Resolved sidebar and navbar for one discovery pass.
pub(crate) struct Navigation {
    pub(crate) sidebar: NavTree,
    pub(crate) navbar: NavTree,
    pub(crate) warnings: Vec<NavWarning>,
}

pub(crate) fn resolve_navigation(
    config: &SiteConfig,
    pages: &[Page],
    options: ResolverOptions,
) -> Result<Navigation, NavigationError> {
    let resolver = NavigationResolver::new(pages, options);
    let sidebar = resolver.resolve_sidebar(config.sidebar())?;
    let navbar = resolver.resolve_navbar(config.nav())?;
    let mut warnings = sidebar.warnings;
    warnings.extend(navbar.warnings);
    Ok(Navigation {
        sidebar: sidebar.tree,
        navbar: navbar.tree,
        warnings,
    })
}

/// Render pages in parallel, keeping input order in both outputs.
pub(crate) fn render_all<'a, I>(
    site: &SiteSnapshot,
    theme: &dyn ThemeRenderer,
    pages: I,
) -> (Vec<RenderedPage>, Vec<PageError>)
where
    I: IntoParallelIterator<Item = &'a Page>,
{
    let results: Vec<_> = pages
        .into_par_iter()
        .map(|page| render_page(site, theme, page))
        .collect();

    let mut rendered = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(page) => rendered.push(page),
            Err(e) => {
                tracing::warn!(route = %e.route(), error = %e, "Page failed");
                failures.push(e);
            }
        }
    }
    (rendered, failures)
}

/// Run plugin hooks and the theme for one page, then prefix its links.
pub(crate) fn render_page(
    site: &SiteSnapshot,
    theme: &dyn ThemeRenderer,
    page: &Page,
) -> Result<RenderedPage, PageError> {
    let mut draft = PageDraft::from_page(page);
    let assets = site
        .plugins
        .process_page(&mut draft)
        .map_err(|source| PageError::Plugin {
            route: page.route.clone(),
            source,
        })?;

    let ctx = RenderContext {
        config: &site.config,
        sidebar: &site.sidebar,
        navbar: &site.navbar,
        neighbours: site.sidebar.neighbours(&page.route),
    };
    let html = theme
        .render(&draft, &ctx)
        .map_err(|source| PageError::Render {
            route: page.route.clone(),
            source,
        })?;

    Ok(RenderedPage {
        route: page.route.clone(),
        html: site.base.rewrite_html(&html).into_owned(),
        assets,
    })
}

/// Theme assets, then page assets in page order; the first asset for a
/// path wins.
pub(crate) fn collect_assets(theme_assets: Vec<Asset>, rendered: &[RenderedPage]) -> Vec<Asset> {
    let mut by_path = BTreeMap::new();
    let page_assets = rendered.iter().flat_map(|p| p.assets.iter().cloned());
    for asset in theme_assets.into_iter().chain(page_assets) {
        by_path.entry(asset.path.clone()).or_insert(asset);
    }
    by_path.into_values().collect()
}

/// Write assets under `dest`, skipping paths that would leave it.
pub(crate) fn write_assets(
    dest: &Path,
    assets: &[Asset],
) -> Result<(usize, Vec<BuildWarning>), BuildError> {
    let mut written = 0;
    let mut warnings = Vec::new();
    for asset in assets {
        let Some(path) = asset_to_path(dest, &asset.path) else {
            tracing::warn!(path = %asset.path, "Asset path outside the output directory; skipped");
            warnings.push(BuildWarning::UnsafeAsset(asset.path.clone()));
            continue;
        };
        write_atomic(&path, &asset.contents)
            .map_err(|source| BuildError::Output { path, source })?;
        written += 1;
    }
    Ok((written, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rendered(route: &str, assets: &[(&str, &str)]) -> RenderedPage {
        RenderedPage {
            route: route.to_owned(),
            html: String::new(),
            assets: assets.iter().map(|(p, c)| Asset::text(*p, c)).collect(),
        }
    }

    #[test]
    fn test_collect_assets_first_wins() {
        let pages = vec![
            rendered("/", &[("assets/js/a.js", "first"), ("assets/js/b.js", "b")]),
            rendered("/cli/", &[("assets/js/a.js", "second")]),
        ];

        let assets = collect_assets(vec![Asset::text("assets/css/quire.css", "css")], &pages);

        let summary: Vec<_> = assets
            .iter()
            .map(|a| (a.path.as_str(), String::from_utf8_lossy(&a.contents).into_owned()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("assets/css/quire.css", "css".to_owned()),
                ("assets/js/a.js", "first".to_owned()),
                ("assets/js/b.js", "b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_write_assets_skips_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let assets = vec![Asset::text("ok.js", "1"), Asset::text("../evil.js", "2")];

        let (written, warnings) = write_assets(dir.path(), &assets).unwrap();

        assert_eq!(written, 1);
        assert!(matches!(&warnings[..], [BuildWarning::UnsafeAsset(p)] if p == "../evil.js"));
        assert!(dir.path().join("ok.js").exists());
    }

    #[test]
    fn test_state_starts_idle() {
        let builder = Builder::new(BuildOptions::default());
        assert_eq!(builder.state(), BuildState::Idle);
        assert!(!builder.options().keep_going);
        assert!(builder.options().resolver.strict);
    }
}
