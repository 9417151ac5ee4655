//! Build orchestration for quire.
//!
//! This crate provides:
//! - [`Builder`]: full builds, from configuration to files in `destDir`
//! - [`DevSession`]: incremental rebuilds driven by [`watch_sources`]
//! - [`ThemeRenderer`]: the page layout capability, with [`DefaultTheme`]
//! - [`BasePath`]: base-path prefixing of internal links
//!
//! A full build runs configuration loading, discovery, navigation
//! resolution and plugin composition in sequence, then renders every page
//! in parallel and writes the results.
//!
//! # Quick Start
//!
//! ```ignore
//! use quire_build::{BuildOptions, Builder};
//!
//! let report = Builder::new(BuildOptions::default()).build(None, None)?;
//! for warning in &report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```

mod base_path;
mod builder;
mod debouncer;
mod dev;
mod generation;
mod output;
mod state;
mod theme;
mod watch;

use std::path::PathBuf;
use std::time::Duration;

use quire_config::ConfigError;
use quire_content::DiscoveryError;
use quire_plugin::{HookError, PluginWarning};
use quire_site::{NavWarning, NavigationError};

pub use base_path::BasePath;
pub use builder::{BuildOptions, Builder};
pub use debouncer::{ChangeKind, SourceChange};
pub use dev::{DevSession, PageDiff, RebuildHandle, RebuildReport};
pub use generation::{GenerationTracker, RenderToken};
pub use output::{asset_to_path, route_to_path};
pub use state::BuildState;
pub use theme::{DefaultTheme, RenderContext, RenderError, ThemeRenderer};
pub use watch::{ChangeReceiver, WatchError, WatchHandle, WatchOptions, watch_sources};

/// Error that stops a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Source directory could not be discovered.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Declared navigation does not match the pages.
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    /// One or more pages failed.
    #[error("{} page(s) failed:\n{}", .0.len(), list_failures(.0))]
    Pages(Vec<PageError>),
    /// Output directory or asset could not be written.
    #[error("Cannot write {}: {source}", path.display())]
    Output {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

fn list_failures(failures: &[PageError]) -> String {
    failures
        .iter()
        .map(|f| format!("  {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failure of a single page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// A plugin hook failed.
    #[error("{route}: {source}")]
    Plugin {
        /// Page route.
        route: String,
        /// Hook error naming the plugin.
        source: HookError,
    },
    /// The theme failed.
    #[error("{route}: {source}")]
    Render {
        /// Page route.
        route: String,
        /// Theme error.
        source: RenderError,
    },
    /// The output file could not be written.
    #[error("{route}: cannot write {}: {source}", path.display())]
    Write {
        /// Page route.
        route: String,
        /// Output file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl PageError {
    /// Route of the failed page.
    #[must_use]
    pub fn route(&self) -> &str {
        match self {
            Self::Plugin { route, .. } | Self::Render { route, .. } | Self::Write { route, .. } => {
                route
            }
        }
    }

    /// Name of the failing plugin, for plugin failures.
    #[must_use]
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Plugin { source, .. } => Some(source.plugin()),
            _ => None,
        }
    }
}

/// Problem that did not stop the build.
#[derive(Debug, thiserror::Error)]
pub enum BuildWarning {
    /// Navigation entry skipped or repeated.
    #[error(transparent)]
    Navigation(#[from] NavWarning),
    /// Plugin left out.
    #[error(transparent)]
    Plugin(#[from] PluginWarning),
    /// Plugin asset with a path outside the output directory.
    #[error("Asset {0} is outside the output directory; skipped")]
    UnsafeAsset(String),
}

/// Summary of a finished build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Pages written to the output directory.
    pub pages_written: usize,
    /// Assets written to the output directory.
    pub assets_written: usize,
    /// Non-fatal problems, in the order they were found.
    pub warnings: Vec<BuildWarning>,
    /// Pages that failed in a keep-going build.
    pub failures: Vec<PageError>,
    /// Wall time of the build.
    pub elapsed: Duration,
}

impl BuildReport {
    /// Check whether every page was written.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
