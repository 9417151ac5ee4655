//! Build-time plugins for quire.
//!
//! A plugin is a typed value implementing [`Plugin`]. Plugins are created
//! by name from a [`PluginRegistry`], which validates each plugin's options
//! at registration. [`PluginComposer`] orders and initializes the plugins a
//! site declares; the resulting [`PluginSet`] runs their page hooks during
//! rendering.
//!
//! # Example
//!
//! ```
//! use quire_plugin::{PageDraft, Plugin, PluginError, PluginRegistry};
//! use serde_json::Value;
//!
//! struct Banner;
//!
//! impl Plugin for Banner {
//!     fn name(&self) -> &str { "banner" }
//!
//!     fn transform_page(&self, page: &mut PageDraft) -> Result<(), PluginError> {
//!         page.markdown.insert_str(0, "> Preview build\n\n");
//!         Ok(())
//!     }
//! }
//!
//! fn banner(_options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
//!     Ok(Box::new(Banner))
//! }
//!
//! let registry = PluginRegistry::builtin().with("banner", banner);
//! assert!(registry.contains("vuepress-plugin-banner"));
//! ```

mod builtin;
mod composer;
mod draft;
mod registry;

use quire_config::SiteConfig;

pub use builtin::{BACK_TO_TOP, MEDIUM_ZOOM};
pub use composer::{Composition, PluginComposer, PluginSet};
pub use draft::{Asset, PageDraft, escape_html};
pub use registry::{PluginFactory, PluginRegistry, normalize_name};

/// Build-time plugin.
///
/// `init` runs once per build before any page is rendered. The page hooks
/// run for every page, possibly on several threads at once.
pub trait Plugin: Send + Sync {
    /// Plugin name, used in logs and warnings.
    fn name(&self) -> &str;

    /// Prepare the plugin for a build.
    fn init(&mut self, _config: &SiteConfig) -> Result<(), PluginError> {
        Ok(())
    }

    /// Edit a page before it is rendered.
    fn transform_page(&self, _page: &mut PageDraft) -> Result<(), PluginError> {
        Ok(())
    }

    /// Files to write alongside a page.
    ///
    /// Assets with the same path from different pages are written once.
    fn emit_assets(&self, _page: &PageDraft) -> Result<Vec<Asset>, PluginError> {
        Ok(Vec::new())
    }
}

/// Error raised by a plugin or its factory.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// No factory registered under the name.
    #[error("Unknown plugin: {0}")]
    Unknown(String),
    /// Options rejected by the factory.
    #[error("Invalid plugin options: {0}")]
    InvalidOptions(String),
    /// Plugin failed while running.
    #[error("{0}")]
    Failed(String),
}

/// Plugin left out of the build.
#[derive(Debug, thiserror::Error)]
pub enum PluginWarning {
    /// No factory registered under the name.
    #[error("Plugin {name} is not available; skipped")]
    Unavailable {
        /// Plugin name as declared.
        name: String,
    },
    /// Factory rejected the registration.
    #[error("Plugin {name} could not be registered: {source}; skipped")]
    Registration {
        /// Plugin name as declared.
        name: String,
        /// Factory error.
        source: PluginError,
    },
    /// `init` failed.
    #[error("Plugin {name} failed to initialize: {source}; skipped")]
    Init {
        /// Plugin name as declared.
        name: String,
        /// Init error.
        source: PluginError,
    },
}

impl PluginWarning {
    /// Name of the skipped plugin.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unavailable { name }
            | Self::Registration { name, .. }
            | Self::Init { name, .. } => name,
        }
    }
}

/// Page hook failure, naming the plugin.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// `transform_page` failed.
    #[error("Plugin {plugin} failed to transform page: {source}")]
    Transform {
        /// Plugin name.
        plugin: String,
        /// Plugin error.
        source: PluginError,
    },
    /// `emit_assets` failed.
    #[error("Plugin {plugin} failed to emit assets: {source}")]
    Emit {
        /// Plugin name.
        plugin: String,
        /// Plugin error.
        source: PluginError,
    },
}

impl HookError {
    /// Name of the failing plugin.
    #[must_use]
    pub fn plugin(&self) -> &str {
        match self {
            Self::Transform { plugin, .. } | Self::Emit { plugin, .. } => plugin,
        }
    }
}
