//! Ordering, initialization, and dispatch of configured plugins.

use quire_config::{PluginRegistration, SiteConfig};

use crate::registry::{PluginRegistry, normalize_name};
use crate::{Asset, HookError, PageDraft, Plugin, PluginError, PluginWarning};

/// Builds the ordered plugin set for a site.
#[derive(Debug, Clone, Copy)]
pub struct PluginComposer<'a> {
    registry: &'a PluginRegistry,
}

/// Plugins that survived composition, plus the ones that did not.
#[derive(Debug)]
pub struct Composition {
    /// Initialized plugins in execution order.
    pub plugins: PluginSet,
    /// One warning per skipped plugin.
    pub warnings: Vec<PluginWarning>,
}

impl<'a> PluginComposer<'a> {
    /// Create a composer backed by `registry`.
    #[must_use]
    pub fn new(registry: &'a PluginRegistry) -> Self {
        Self { registry }
    }

    /// Order, create, and initialize the configured plugins.
    ///
    /// Plugins run by `priority`, falling back to their registration index,
    /// with ties broken by registration index. A plugin that is unknown,
    /// rejects its options, or fails `init` is skipped with a warning; the
    /// rest are unaffected.
    #[must_use]
    pub fn compose(&self, config: &SiteConfig) -> Composition {
        let mut plugins = Vec::new();
        let mut warnings = Vec::new();

        for registration in execution_order(&config.plugins) {
            match self.instantiate(registration, config) {
                Ok(plugin) => {
                    tracing::info!(plugin = %plugin.name(), "Plugin enabled");
                    plugins.push(plugin);
                }
                Err(warning) => {
                    tracing::warn!(plugin = %registration.name, %warning, "Plugin skipped");
                    warnings.push(warning);
                }
            }
        }

        Composition {
            plugins: PluginSet { plugins },
            warnings,
        }
    }

    fn instantiate(
        &self,
        registration: &PluginRegistration,
        config: &SiteConfig,
    ) -> Result<Box<dyn Plugin>, PluginWarning> {
        let name = registration.name.clone();
        let mut plugin = match self.registry.create(&registration.name, &registration.options) {
            Ok(plugin) => plugin,
            Err(PluginError::Unknown(_)) => return Err(PluginWarning::Unavailable { name }),
            Err(source) => return Err(PluginWarning::Registration { name, source }),
        };
        plugin
            .init(config)
            .map_err(|source| PluginWarning::Init { name, source })?;
        Ok(plugin)
    }
}

/// Registrations sorted into execution order.
fn execution_order(registrations: &[PluginRegistration]) -> Vec<&PluginRegistration> {
    let mut ordered: Vec<_> = registrations.iter().collect();
    ordered.sort_by_key(|r| {
        let index = i64::try_from(r.index).unwrap_or(i64::MAX);
        (r.priority.unwrap_or(index), r.index)
    });
    ordered
}

/// Initialized plugins in a fixed execution order.
///
/// Hooks take `&self`, so one set is shared by every render thread.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Box<dyn Plugin>>,
}

impl std::fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl PluginSet {
    /// Names of the plugins in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Number of plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Check whether a plugin is enabled.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.plugins.iter().any(|p| normalize_name(p.name()) == name)
    }

    /// Run every plugin's `transform_page` in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing plugin.
    pub fn transform_page(&self, page: &mut PageDraft) -> Result<(), HookError> {
        for plugin in &self.plugins {
            plugin
                .transform_page(page)
                .map_err(|source| HookError::Transform {
                    plugin: plugin.name().to_owned(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Collect every plugin's assets in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing plugin.
    pub fn emit_assets(&self, page: &PageDraft) -> Result<Vec<Asset>, HookError> {
        let mut assets = Vec::new();
        for plugin in &self.plugins {
            let emitted = plugin.emit_assets(page).map_err(|source| HookError::Emit {
                plugin: plugin.name().to_owned(),
                source,
            })?;
            assets.extend(emitted);
        }
        Ok(assets)
    }

    /// Run all hooks for one page: every `transform_page`, then every
    /// `emit_assets`.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure.
    pub fn process_page(&self, page: &mut PageDraft) -> Result<Vec<Asset>, HookError> {
        self.transform_page(page)?;
        self.emit_assets(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::path::Path;

    /// Appends its `tag` option to the page body.
    struct Tagger {
        tag: String,
    }

    impl Plugin for Tagger {
        fn name(&self) -> &str {
            &self.tag
        }

        fn transform_page(&self, page: &mut PageDraft) -> Result<(), PluginError> {
            page.markdown.push_str(&self.tag);
            Ok(())
        }
    }

    fn tagger(options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
        let tag = options
            .get("tag")
            .and_then(Value::as_str)
            .ok_or_else(|| PluginError::InvalidOptions("tag is required".to_owned()))?;
        Ok(Box::new(Tagger {
            tag: tag.to_owned(),
        }))
    }

    /// Fails during `init`.
    struct Broken;

    impl Plugin for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn init(&mut self, _config: &SiteConfig) -> Result<(), PluginError> {
            Err(PluginError::Failed("cannot reach analytics host".to_owned()))
        }
    }

    fn broken(_options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
        Ok(Box::new(Broken))
    }

    /// Fails in every page hook.
    struct Faulty;

    impl Plugin for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        fn transform_page(&self, _page: &mut PageDraft) -> Result<(), PluginError> {
            Err(PluginError::Failed("boom".to_owned()))
        }
    }

    fn faulty(_options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
        Ok(Box::new(Faulty))
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::builtin()
            .with("tagger", tagger)
            .with("broken", broken)
            .with("faulty", faulty)
    }

    fn config(plugins: Value) -> SiteConfig {
        SiteConfig::from_value(
            &json!({
                "basePath": "/",
                "destDir": "out",
                "title": "Docs",
                "description": "",
                "plugins": plugins,
            }),
            Path::new("/site"),
        )
        .unwrap()
    }

    fn draft() -> PageDraft {
        PageDraft::from_page(&quire_content::Page::new(
            "index.md".into(),
            "/".to_owned(),
            quire_content::Frontmatter::new(),
            None,
            String::new(),
        ))
    }

    #[test]
    fn test_transform_runs_in_registration_order() {
        let config = config(json!([
            ["tagger", {"tag": "A"}],
            ["tagger", {"tag": "B"}],
            ["tagger", {"tag": "C"}],
        ]));
        let registry = registry();

        let composition = PluginComposer::new(&registry).compose(&config);
        let mut page = draft();
        composition.plugins.transform_page(&mut page).unwrap();

        assert_eq!(page.markdown, "ABC");
        assert!(composition.warnings.is_empty());
    }

    #[test]
    fn test_priority_orders_before_index() {
        let config = config(json!([
            ["tagger", {"tag": "A"}],
            ["tagger", {"tag": "B"}],
            {"name": "tagger", "options": {"tag": "C"}, "priority": -1},
            {"name": "tagger", "options": {"tag": "D"}, "priority": 1},
        ]));
        let registry = registry();

        let composition = PluginComposer::new(&registry).compose(&config);

        // C: -1, A: 0, B: 1 (index), D: 1 (priority, index 3)
        assert_eq!(composition.plugins.names(), vec!["C", "A", "B", "D"]);
    }

    #[test]
    fn test_init_failure_skips_only_that_plugin() {
        let config = config(json!([
            ["tagger", {"tag": "A"}],
            "broken",
            ["tagger", {"tag": "B"}],
        ]));
        let registry = registry();

        let composition = PluginComposer::new(&registry).compose(&config);

        assert_eq!(composition.plugins.names(), vec!["A", "B"]);
        assert_eq!(composition.warnings.len(), 1);
        assert_eq!(composition.warnings[0].name(), "broken");
        assert!(composition.warnings[0].to_string().contains("broken"));
    }

    #[test]
    fn test_unknown_and_invalid_plugins_warn() {
        let config = config(json!([
            "@vuepress/plugin-back-to-top",
            "@vuepress/plugin-medium-zoom",
            ["@vuepress/plugin-google-analytics", {"ga": "UA-0000"}],
            ["tagger", {}],
        ]));
        let registry = registry();

        let composition = PluginComposer::new(&registry).compose(&config);

        assert_eq!(
            composition.plugins.names(),
            vec!["back-to-top", "medium-zoom"]
        );
        assert!(matches!(
            &composition.warnings[0],
            PluginWarning::Unavailable { name } if name == "@vuepress/plugin-google-analytics"
        ));
        assert!(matches!(
            &composition.warnings[1],
            PluginWarning::Registration { name, .. } if name == "tagger"
        ));
        assert!(composition.plugins.contains("@vuepress/plugin-back-to-top"));
    }

    #[test]
    fn test_hook_failure_names_plugin() {
        let config = config(json!(["faulty"]));
        let registry = registry();
        let composition = PluginComposer::new(&registry).compose(&config);

        let err = composition
            .plugins
            .process_page(&mut draft())
            .unwrap_err();

        assert!(matches!(err, HookError::Transform { ref plugin, .. } if plugin == "faulty"));
    }

    #[test]
    fn test_process_page_collects_assets_in_order() {
        let config = config(json!(["medium-zoom", "back-to-top"]));
        let registry = registry();
        let composition = PluginComposer::new(&registry).compose(&config);

        let assets = composition.plugins.process_page(&mut draft()).unwrap();

        let paths: Vec<_> = assets.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["assets/js/medium-zoom.js", "assets/js/back-to-top.js"]
        );
    }
}
