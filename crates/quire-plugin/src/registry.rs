//! Plugin factories keyed by name.

use std::collections::HashMap;

use serde_json::Value;

use crate::{Plugin, PluginError, builtin};

/// Creates a plugin from its validated options.
pub type PluginFactory = fn(&Value) -> Result<Box<dyn Plugin>, PluginError>;

/// Registry of available plugins.
///
/// Names are normalized on both registration and lookup, so
/// `@vuepress/plugin-back-to-top`, `plugin-back-to-top`, and `back-to-top`
/// refer to the same factory.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in plugins.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .with(builtin::BACK_TO_TOP, builtin::back_to_top)
            .with(builtin::MEDIUM_ZOOM, builtin::medium_zoom)
    }

    /// Register a factory, replacing any previous one with the same name.
    #[must_use]
    pub fn with(mut self, name: &str, factory: PluginFactory) -> Self {
        self.register(name, factory);
        self
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, factory: PluginFactory) {
        self.factories.insert(normalize_name(name), factory);
    }

    /// Check whether a plugin is available.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize_name(name))
    }

    /// Create a plugin by name.
    ///
    /// # Errors
    ///
    /// Returns `Unknown` if no factory is registered under the name, or the
    /// factory's error if the options are invalid.
    pub fn create(&self, name: &str, options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
        let factory = self
            .factories
            .get(&normalize_name(name))
            .ok_or_else(|| PluginError::Unknown(name.to_owned()))?;
        factory(options)
    }
}

/// Reduce a plugin name to its canonical form.
///
/// Strips an npm scope (`@vuepress/`) and a `vuepress-plugin-` or `plugin-`
/// prefix, then lowercases.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let unscoped = match name.strip_prefix('@') {
        Some(scoped) => scoped.split_once('/').map_or(scoped, |(_, rest)| rest),
        None => name,
    };
    unscoped
        .strip_prefix("vuepress-plugin-")
        .or_else(|| unscoped.strip_prefix("plugin-"))
        .unwrap_or(unscoped)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("@vuepress/plugin-back-to-top"), "back-to-top");
        assert_eq!(normalize_name("plugin-back-to-top"), "back-to-top");
        assert_eq!(normalize_name("vuepress-plugin-medium-zoom"), "medium-zoom");
        assert_eq!(normalize_name("Medium-Zoom"), "medium-zoom");
        assert_eq!(
            normalize_name("@vuepress/plugin-google-analytics"),
            "google-analytics"
        );
    }

    #[test]
    fn test_builtin_registry_contains_plugins() {
        let registry = PluginRegistry::builtin();
        assert!(registry.contains("@vuepress/plugin-back-to-top"));
        assert!(registry.contains("@vuepress/plugin-medium-zoom"));
        assert!(!registry.contains("@vuepress/plugin-google-analytics"));
    }

    #[test]
    fn test_create_unknown() {
        let err = PluginRegistry::new()
            .create("search", &json!({}))
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Unknown(ref n) if n == "search"));
    }

    #[test]
    fn test_create_by_alias() {
        let plugin = PluginRegistry::builtin()
            .create("plugin-back-to-top", &json!({}))
            .unwrap();
        assert_eq!(plugin.name(), "back-to-top");
    }
}
