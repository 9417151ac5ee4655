//! Site configuration for quire.
//!
//! Parses `quire.toml` (or a `.json` document) and provides auto-discovery
//! of the config file in parent directories. Keys are camelCase:
//!
//! ```toml
//! basePath = "/swagger-brake/"
//! destDir = "../docs"
//! title = "Swagger Brake"
//! description = "Breaking change checker"
//!
//! [themeConfig]
//! sidebar = ["/", "/configuration/", "/cli/"]
//! ```
//!
//! Every structural value (head tags, nav and sidebar entries, plugins) is
//! parsed once into a typed entry. Errors name the offending field with its
//! dotted path.
//!
//! CLI settings can be applied during load via [`CliSettings`].

mod entries;

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

pub use entries::{HeadTag, NavEntry, PluginRegistration, is_external};
use entries::{expect_str, invalid, parse_nav_list, type_name};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "quire.toml";

/// Default source directory, relative to the config file.
const DEFAULT_SOURCE_DIR: &str = "docs";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliSettings {
    /// Override source directory.
    pub source_dir: Option<PathBuf>,
    /// Override output directory.
    pub dest_dir: Option<PathBuf>,
    /// Override base path.
    pub base_path: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// Required field absent.
    #[error("Missing required field: {0}")]
    MissingField(String),
    /// Field present with the wrong type or an invalid value.
    #[error("Invalid field {field}: {message}")]
    InvalidField {
        /// Dotted field path (e.g., "`themeConfig.sidebar[2]`").
        field: String,
        /// What is wrong with the value.
        message: String,
    },
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Dotted path of the offending field, when the error concerns one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField(field) | Self::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Theme options from the `themeConfig` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeConfig {
    /// Repository slug or URL shown in the navbar.
    pub repo: Option<String>,
    /// Whether pages show an edit link.
    pub edit_links: bool,
    /// Directory of the sources inside the repository.
    pub docs_dir: Option<String>,
    /// Edit link label.
    pub edit_link_text: Option<String>,
    /// Whether pages show their last modification time.
    pub last_updated: bool,
    /// Label for the last-updated stamp, when given as a string.
    pub last_updated_text: Option<String>,
    /// Top navbar entries.
    pub nav: Vec<NavEntry>,
    /// Sidebar entries.
    pub sidebar: Vec<NavEntry>,
}

/// Validated, normalized site configuration.
///
/// Immutable once loaded; a build shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    /// Base path prefixed to every internal link. Starts and ends with `/`.
    pub base_path: String,
    /// Site title.
    pub title: String,
    /// Site description.
    pub description: String,
    /// Directory holding markdown sources.
    pub source_dir: PathBuf,
    /// Directory receiving rendered output.
    pub dest_dir: PathBuf,
    /// Tags injected into every page's `<head>`, in declared order.
    pub head_tags: Vec<HeadTag>,
    /// Theme options, including nav and sidebar.
    pub theme: ThemeConfig,
    /// Plugin registrations in declared order.
    pub plugins: Vec<PluginRegistration>,
    /// Path to the config file (set after loading).
    pub config_path: Option<PathBuf>,
}

/// Raw configuration as parsed from the file, before typed extraction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSiteConfig {
    #[serde(alias = "base")]
    base_path: Option<Value>,
    #[serde(alias = "dest")]
    dest_dir: Option<Value>,
    source_dir: Option<Value>,
    title: Option<Value>,
    description: Option<Value>,
    #[serde(alias = "head")]
    head_tags: Option<Value>,
    theme_config: Option<Value>,
    plugins: Option<Value>,
    #[serde(flatten)]
    unknown: Map<String, Value>,
}

impl SiteConfig {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `quire.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if no config file can be found, parsing fails, or the
    /// resolved configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                path.to_path_buf()
            }
            None => {
                let cwd = std::env::current_dir()?;
                discover_config_from(&cwd).ok_or_else(|| ConfigError::NotFound(cwd.join(CONFIG_FILENAME)))?
            }
        };

        let path = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        let mut config = Self::load_from_file(&normalize_path(&path))?;

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
            config.validate()?;
        }

        Ok(config)
    }

    /// Parse configuration from TOML text, resolving paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or the configuration is invalid.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let value: Value = toml::from_str(content)?;
        Self::from_value(&value, base_dir)
    }

    /// Parse configuration from JSON text, resolving paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid JSON or the configuration is invalid.
    pub fn from_json_str(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(&value, base_dir)
    }

    /// Build configuration from an in-memory value.
    ///
    /// Relative `sourceDir` and `destDir` are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` or `InvalidField` naming the offending field, or
    /// `Validation` if the resolved directories overlap.
    pub fn from_value(value: &Value, base_dir: &Path) -> Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::Validation(format!(
                "configuration root must be a table, found {}",
                type_name(value)
            )));
        }
        let raw = RawSiteConfig::deserialize(value)?;

        for key in raw.unknown.keys() {
            tracing::warn!(key = %key, "Unknown configuration key ignored");
        }

        let title = required_str(raw.title.as_ref(), "title")?;
        require_non_empty(&title, "title")?;
        let description = required_str(raw.description.as_ref(), "description")?;
        let base_path = normalize_base_path(&required_str(raw.base_path.as_ref(), "basePath")?)?;
        let dest_dir = required_str(raw.dest_dir.as_ref(), "destDir")?;
        require_non_empty(&dest_dir, "destDir")?;
        let source_dir = optional_str(raw.source_dir.as_ref(), "sourceDir")?
            .unwrap_or_else(|| DEFAULT_SOURCE_DIR.to_owned());
        require_non_empty(&source_dir, "sourceDir")?;

        let head_tags = match &raw.head_tags {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| HeadTag::parse(item, &format!("head[{i}]")))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(invalid(
                    "head",
                    format!("expected an array, found {}", type_name(other)),
                ));
            }
        };

        let theme = match &raw.theme_config {
            None | Some(Value::Null) => ThemeConfig::default(),
            Some(Value::Object(map)) => parse_theme(map)?,
            Some(other) => {
                return Err(invalid(
                    "themeConfig",
                    format!("expected a table, found {}", type_name(other)),
                ));
            }
        };

        let plugins = match &raw.plugins {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| PluginRegistration::parse(item, i, &format!("plugins[{i}]")))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(invalid(
                    "plugins",
                    format!("expected an array, found {}", type_name(other)),
                ));
            }
        };

        let config = Self {
            base_path,
            title,
            description,
            source_dir: normalize_path(&base_dir.join(source_dir)),
            dest_dir: normalize_path(&base_dir.join(dest_dir)),
            head_tags,
            theme,
            plugins,
            config_path: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Declared top navbar entries.
    #[must_use]
    pub fn nav(&self) -> &[NavEntry] {
        &self.theme.nav
    }

    /// Declared sidebar entries.
    #[must_use]
    pub fn sidebar(&self) -> &[NavEntry] {
        &self.theme.sidebar
    }

    /// Apply CLI settings to the configuration.
    ///
    /// Relative directories are resolved against the current directory.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        let cwd = std::env::current_dir()?;
        self.apply_cli_settings_in(settings, &cwd)
    }

    fn apply_cli_settings_in(
        &mut self,
        settings: &CliSettings,
        cwd: &Path,
    ) -> Result<(), ConfigError> {
        if let Some(source_dir) = &settings.source_dir {
            self.source_dir = normalize_path(&cwd.join(source_dir));
        }
        if let Some(dest_dir) = &settings.dest_dir {
            self.dest_dir = normalize_path(&cwd.join(dest_dir));
        }
        if let Some(base_path) = &settings.base_path {
            self.base_path = normalize_base_path(base_path)?;
        }
        Ok(())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config = if is_json {
            Self::from_json_str(&content, config_dir)?
        } else {
            Self::from_toml_str(&content, config_dir)?
        };
        config.config_path = Some(path.to_path_buf());

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that the source and output directories do not overlap. Called
    /// automatically after loading and after CLI settings are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_path.starts_with('/') || !self.base_path.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "basePath must start and end with '/': {}",
                self.base_path
            )));
        }
        if self.dest_dir.starts_with(&self.source_dir) || self.source_dir.starts_with(&self.dest_dir)
        {
            return Err(ConfigError::Validation(format!(
                "destDir {} overlaps sourceDir {}",
                self.dest_dir.display(),
                self.source_dir.display()
            )));
        }
        Ok(())
    }
}

/// Search for the config file in `start` and its parents.
#[must_use]
pub fn discover_config_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Normalize a base path to start and end with `/`.
///
/// # Errors
///
/// Returns `InvalidField` for `basePath` if the value does not start with `/`.
pub fn normalize_base_path(base_path: &str) -> Result<String, ConfigError> {
    if !base_path.starts_with('/') {
        return Err(invalid(
            "basePath",
            format!("must start with '/', got {base_path:?}"),
        ));
    }
    if base_path.ends_with('/') {
        Ok(base_path.to_owned())
    } else {
        Ok(format!("{base_path}/"))
    }
}

fn parse_theme(map: &Map<String, Value>) -> Result<ThemeConfig, ConfigError> {
    let string = |key: &str| {
        map.get(key)
            .map(|v| expect_str(v, &format!("themeConfig.{key}")).map(str::to_owned))
            .transpose()
    };
    let flag = |key: &str| {
        map.get(key).map_or(Ok(false), |v| {
            v.as_bool().ok_or_else(|| {
                invalid(
                    &format!("themeConfig.{key}"),
                    format!("expected a boolean, found {}", type_name(v)),
                )
            })
        })
    };

    let (last_updated, last_updated_text) = match map.get("lastUpdated") {
        None | Some(Value::Bool(false)) => (false, None),
        Some(Value::Bool(true)) => (true, None),
        Some(Value::String(label)) => (true, Some(label.clone())),
        Some(other) => {
            return Err(invalid(
                "themeConfig.lastUpdated",
                format!("expected a boolean or label, found {}", type_name(other)),
            ));
        }
    };

    let nav = map
        .get("nav")
        .map(|v| parse_nav_list(v, "themeConfig.nav"))
        .transpose()?
        .unwrap_or_default();
    let sidebar = map
        .get("sidebar")
        .map(|v| parse_nav_list(v, "themeConfig.sidebar"))
        .transpose()?
        .unwrap_or_default();

    Ok(ThemeConfig {
        repo: string("repo")?,
        edit_links: flag("editLinks")?,
        docs_dir: string("docsDir")?,
        edit_link_text: string("editLinkText")?,
        last_updated,
        last_updated_text,
        nav,
        sidebar,
    })
}

fn required_str(value: Option<&Value>, field: &str) -> Result<String, ConfigError> {
    optional_str(value, field)?.ok_or_else(|| ConfigError::MissingField(field.to_owned()))
}

fn optional_str(value: Option<&Value>, field: &str) -> Result<Option<String>, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => expect_str(v, field).map(|s| Some(s.to_owned())),
    }
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "cannot be empty".to_owned()));
    }
    Ok(())
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}
