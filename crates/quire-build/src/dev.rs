//! Incremental rebuilds for a running dev session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use quire_config::SiteConfig;
use quire_content::{Discovery, Page};
use quire_site::ResolverOptions;
use rayon::prelude::*;

use crate::builder::{
    Builder, RenderedPage, SiteSnapshot, collect_assets, render_page, resolve_navigation,
    write_assets,
};
use crate::generation::{GenerationTracker, RenderToken};
use crate::output::remove_route;
use crate::theme::ThemeRenderer;
use crate::{BuildError, BuildReport, BuildWarning, PageError, SourceChange};

/// How the page set changed between two discovery passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDiff {
    /// Routes that are new.
    pub added: Vec<String>,
    /// Routes that are gone.
    pub removed: Vec<String>,
    /// Routes whose page changed.
    pub changed: Vec<String>,
}

impl PageDiff {
    /// Compare two discovery passes. Routes keep the order of the pass they
    /// come from.
    #[must_use]
    pub fn between(old: &[Page], new: &[Page]) -> Self {
        let old_by_route: HashMap<&str, &Page> = old.iter().map(|p| (p.route.as_str(), p)).collect();
        let new_by_route: HashMap<&str, &Page> = new.iter().map(|p| (p.route.as_str(), p)).collect();

        let mut diff = Self::default();
        for page in new {
            match old_by_route.get(page.route.as_str()) {
                None => diff.added.push(page.route.clone()),
                Some(previous) if *previous != page => diff.changed.push(page.route.clone()),
                Some(_) => {}
            }
        }
        diff.removed = old
            .iter()
            .filter(|p| !new_by_route.contains_key(p.route.as_str()))
            .map(|p| p.route.clone())
            .collect();
        diff
    }

    /// Check whether the set of routes is the same.
    #[must_use]
    pub fn same_routes(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Check whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.same_routes() && self.changed.is_empty()
    }
}

/// Outcome of one background rebuild.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Routes whose output was replaced.
    pub written: Vec<String>,
    /// Routes whose output was deleted.
    pub removed: Vec<String>,
    /// Pages that failed; their previous output is untouched.
    pub failures: Vec<PageError>,
    /// Renders dropped because a newer one was issued for the same route.
    pub superseded: usize,
    /// Navigation and asset warnings.
    pub warnings: Vec<BuildWarning>,
}

/// Running background rebuild.
#[derive(Debug)]
pub struct RebuildHandle {
    handle: JoinHandle<RebuildReport>,
}

impl RebuildHandle {
    /// Check whether the rebuild has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the rebuild and return its report.
    ///
    /// # Panics
    ///
    /// Re-raises a panic from the rebuild thread.
    #[must_use]
    pub fn wait(self) -> RebuildReport {
        match self.handle.join() {
            Ok(report) => report,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Keeps a built site current as its sources change.
///
/// Plugins are composed once, at [`DevSession::start`]. Each call to
/// [`DevSession::apply_changes`] runs a full discovery pass, diffs it
/// against the previous one and re-renders only the affected pages on a
/// background thread. Page failures are logged and leave the previous
/// output in place.
pub struct DevSession {
    site: Mutex<SiteSnapshot>,
    theme: Arc<dyn ThemeRenderer>,
    resolver: ResolverOptions,
    tracker: Arc<GenerationTracker>,
}

impl std::fmt::Debug for DevSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevSession")
            .field("resolver", &self.resolver)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl DevSession {
    /// Run an initial full build and start a session from it.
    ///
    /// The initial build always keeps going past page failures.
    ///
    /// # Errors
    ///
    /// Returns the fatal errors of the initial build: discovery, navigation,
    /// or output I/O.
    pub fn start(builder: &Builder, config: SiteConfig) -> Result<(Self, BuildReport), BuildError> {
        let (report, site) = builder.run(Arc::new(config), true)?;
        let session = Self {
            site: Mutex::new(site),
            theme: builder.theme(),
            resolver: builder.options().resolver,
            tracker: Arc::new(GenerationTracker::new()),
        };
        Ok((session, report))
    }

    /// Discovery over the session's source directory, as used by rebuilds.
    ///
    /// # Panics
    ///
    /// Panics if the session lock is poisoned.
    #[must_use]
    pub fn discovery(&self) -> Discovery {
        Discovery::new(&self.site.lock().unwrap().config.source_dir)
    }

    /// Routes of the current pages in discovery order.
    ///
    /// # Panics
    ///
    /// Panics if the session lock is poisoned.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        let site = self.site.lock().unwrap();
        site.pages.iter().map(|p| p.route.clone()).collect()
    }

    /// Update the session after source changes and start re-rendering.
    ///
    /// `changes` is informational; the page set is always rediscovered in
    /// full. When routes are unchanged, edited pages are swapped into their
    /// navigation subtrees; otherwise navigation is resolved again. Only
    /// edited pages are re-rendered unless a title or the route set changed,
    /// in which case every page is, since navigation appears on all of them.
    ///
    /// # Errors
    ///
    /// Returns discovery and navigation errors. The session keeps its
    /// previous state when this fails.
    ///
    /// # Panics
    ///
    /// Panics if the session lock is poisoned.
    pub fn apply_changes(&self, changes: &[SourceChange]) -> Result<RebuildHandle, BuildError> {
        let mut site = self.site.lock().unwrap();
        tracing::info!(changes = changes.len(), "Rebuilding after source changes");

        let pages = Discovery::new(&site.config.source_dir).discover()?;
        let diff = PageDiff::between(&site.pages, &pages);
        let mut warnings = Vec::new();

        let render_all = if diff.same_routes() {
            let mut sidebar = (*site.sidebar).clone();
            let mut navbar = (*site.navbar).clone();
            let mut titles_changed = false;
            for route in &diff.changed {
                let (Some(old), Some(new)) = (
                    site.page(route),
                    pages.iter().find(|p| &p.route == route),
                ) else {
                    continue;
                };
                titles_changed |= old.title != new.title;
                if let Some(subtree) = sidebar.replace_page(new.clone()) {
                    tracing::debug!(route = %route, subtree, "Sidebar subtree updated");
                }
                navbar.replace_page(new.clone());
            }
            site.sidebar = Arc::new(sidebar);
            site.navbar = Arc::new(navbar);
            titles_changed
        } else {
            let nav = resolve_navigation(&site.config, &pages, self.resolver)?;
            tracing::info!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                "Route set changed; navigation resolved again"
            );
            warnings.extend(nav.warnings.into_iter().map(BuildWarning::from));
            site.sidebar = Arc::new(nav.sidebar);
            site.navbar = Arc::new(nav.navbar);
            true
        };
        site.pages = pages.into();

        let routes: Vec<String> = if render_all {
            site.pages.iter().map(|p| p.route.clone()).collect()
        } else {
            diff.changed.clone()
        };
        let renders: Vec<RenderToken> = routes.iter().map(|r| self.tracker.issue(r)).collect();
        let removals: Vec<RenderToken> = diff.removed.iter().map(|r| self.tracker.issue(r)).collect();

        let snapshot = site.clone();
        drop(site);

        let theme = Arc::clone(&self.theme);
        let tracker = Arc::clone(&self.tracker);
        let handle = std::thread::spawn(move || {
            rebuild(&snapshot, theme.as_ref(), &tracker, renders, &removals, warnings)
        });
        Ok(RebuildHandle { handle })
    }
}

enum Outcome {
    Written(RenderedPage),
    Failed(PageError),
    Superseded,
}

fn rebuild(
    site: &SiteSnapshot,
    theme: &dyn ThemeRenderer,
    tracker: &GenerationTracker,
    renders: Vec<RenderToken>,
    removals: &[RenderToken],
    warnings: Vec<BuildWarning>,
) -> RebuildReport {
    let dest = site.config.dest_dir.as_path();
    let outcomes: Vec<Outcome> = renders
        .into_par_iter()
        .map(|token| {
            if !tracker.is_current(&token) {
                return Outcome::Superseded;
            }
            let Some(page) = site.page(token.route()) else {
                return Outcome::Superseded;
            };
            let rendered = match render_page(site, theme, page) {
                Ok(rendered) => rendered,
                Err(e) => return Outcome::Failed(e),
            };
            // Only the rename happens under the tracker lock.
            let staged = match rendered.stage(dest) {
                Ok(staged) => staged,
                Err(e) => return Outcome::Failed(e),
            };
            let path = staged.path().to_path_buf();
            let committed = tracker.commit(&token, || {
                staged
                    .commit()
                    .map_err(|source| rendered.write_error(path, source))
            });
            match committed {
                None => Outcome::Superseded,
                Some(Ok(())) => Outcome::Written(rendered),
                Some(Err(e)) => Outcome::Failed(e),
            }
        })
        .collect();

    let mut report = RebuildReport {
        warnings,
        ..RebuildReport::default()
    };
    let mut written = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Written(page) => {
                report.written.push(page.route.clone());
                written.push(page);
            }
            Outcome::Failed(e) => {
                tracing::warn!(route = %e.route(), error = %e, "Page failed; keeping previous output");
                report.failures.push(e);
            }
            Outcome::Superseded => report.superseded += 1,
        }
    }

    match write_assets(dest, &collect_assets(theme.assets(), &written)) {
        Ok((_, warnings)) => report.warnings.extend(warnings),
        Err(e) => tracing::warn!(error = %e, "Failed to write assets"),
    }

    for token in removals {
        match tracker.commit(token, || remove_route(dest, token.route())) {
            Some(Ok(())) => report.removed.push(token.route().to_owned()),
            Some(Err(e)) => {
                tracing::warn!(route = %token.route(), error = %e, "Failed to remove output");
            }
            None => report.superseded += 1,
        }
    }

    tracing::info!(
        written = report.written.len(),
        removed = report.removed.len(),
        failures = report.failures.len(),
        superseded = report.superseded,
        "Rebuild finished"
    );
    report
}
