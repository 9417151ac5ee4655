//! Typed configuration entries: navigation links, head tags, plugins.
//!
//! Each entry is parsed exactly once from the raw configuration value.
//! Parse errors carry the dotted path of the offending value so that a
//! broken `themeConfig.sidebar[2]` is reported as such.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::ConfigError;

/// Declared navigation entry from `themeConfig.nav` or `themeConfig.sidebar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEntry {
    /// Link to a page or an external URL.
    Link {
        /// Display text. `None` for bare-string entries; the page title is used.
        text: Option<String>,
        /// Link target as written in the configuration.
        target: String,
        /// Whether the target points outside the site.
        external: bool,
    },
    /// Titled group of nested entries.
    Group {
        /// Group heading.
        title: String,
        /// Nested entries in declared order.
        children: Vec<NavEntry>,
    },
}

impl NavEntry {
    /// Create a link entry, detecting external targets.
    #[must_use]
    pub fn link(target: impl Into<String>, text: Option<String>) -> Self {
        let target = target.into();
        let external = is_external(&target);
        Self::Link {
            text,
            target,
            external,
        }
    }

    /// Parse a single entry.
    ///
    /// Accepted forms:
    /// - `"/path/"`
    /// - `["/path/", "Text"]`
    /// - `{ text, link }`
    /// - `{ title | text, children | items }`
    pub(crate) fn parse(value: &Value, field: &str) -> Result<Self, ConfigError> {
        match value {
            Value::String(target) => {
                require_target(target, field)?;
                Ok(Self::link(target.as_str(), None))
            }
            Value::Array(items) => parse_tuple_link(items, field),
            Value::Object(map) => parse_object_entry(map, field),
            other => Err(invalid(
                field,
                format!(
                    "expected a string, [target, text] pair, or table, found {}",
                    type_name(other)
                ),
            )),
        }
    }
}

fn parse_tuple_link(items: &[Value], field: &str) -> Result<NavEntry, ConfigError> {
    let [target, text] = items else {
        return Err(invalid(
            field,
            format!("expected [target, text] pair, found {} items", items.len()),
        ));
    };
    let target = expect_str(target, &format!("{field}[0]"))?;
    let text = expect_str(text, &format!("{field}[1]"))?;
    require_target(target, &format!("{field}[0]"))?;
    Ok(NavEntry::link(target, Some(text.to_owned())))
}

fn parse_object_entry(map: &Map<String, Value>, field: &str) -> Result<NavEntry, ConfigError> {
    let children = map
        .get("children")
        .map(|v| ("children", v))
        .or_else(|| map.get("items").map(|v| ("items", v)));

    if let Some((key, children)) = children {
        let title = match (map.get("title"), map.get("text")) {
            (Some(title), _) => expect_str(title, &format!("{field}.title"))?,
            (None, Some(text)) => expect_str(text, &format!("{field}.text"))?,
            (None, None) => return Err(ConfigError::MissingField(format!("{field}.title"))),
        };
        let children = parse_nav_list(children, &format!("{field}.{key}"))?;
        return Ok(NavEntry::Group {
            title: title.to_owned(),
            children,
        });
    }

    let Some(link) = map.get("link") else {
        return Err(invalid(field, "expected `link` or `children`".to_owned()));
    };
    let target = expect_str(link, &format!("{field}.link"))?;
    require_target(target, &format!("{field}.link"))?;
    let text = map
        .get("text")
        .map(|t| expect_str(t, &format!("{field}.text")).map(str::to_owned))
        .transpose()?;
    Ok(NavEntry::link(target, text))
}

/// Parse a list of navigation entries.
pub(crate) fn parse_nav_list(value: &Value, field: &str) -> Result<Vec<NavEntry>, ConfigError> {
    let Value::Array(items) = value else {
        return Err(invalid(
            field,
            format!("expected an array, found {}", type_name(value)),
        ));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| NavEntry::parse(item, &format!("{field}[{i}]")))
        .collect()
}

/// Check whether a link target points outside the site.
///
/// A target is external when it carries a URL scheme (`https:`, `mailto:`)
/// or is protocol-relative (`//host/path`).
#[must_use]
pub fn is_external(target: &str) -> bool {
    if target.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = target.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Tag injected into every page's `<head>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadTag {
    /// Element name (`meta`, `link`, `script`).
    pub name: String,
    /// Attributes ordered by key.
    pub attrs: BTreeMap<String, String>,
    /// Inner content for non-void elements.
    pub content: Option<String>,
}

impl HeadTag {
    /// Parse `[tag, {attrs}]` or `[tag, {attrs}, content]`.
    pub(crate) fn parse(value: &Value, field: &str) -> Result<Self, ConfigError> {
        let Value::Array(items) = value else {
            return Err(invalid(
                field,
                format!("expected [tag, attrs] array, found {}", type_name(value)),
            ));
        };
        let (name, attrs, content) = match items.as_slice() {
            [name, attrs] => (name, attrs, None),
            [name, attrs, content] => (name, attrs, Some(content)),
            _ => {
                return Err(invalid(
                    field,
                    format!("expected 2 or 3 items, found {}", items.len()),
                ));
            }
        };

        let name = expect_str(name, &format!("{field}[0]"))?;
        if !is_markup_name(name, &[]) {
            return Err(invalid(
                &format!("{field}[0]"),
                format!("invalid tag name {name:?}"),
            ));
        }

        let attrs_field = format!("{field}[1]");
        let Value::Object(map) = attrs else {
            return Err(invalid(
                &attrs_field,
                format!("expected a table of attributes, found {}", type_name(attrs)),
            ));
        };
        let attrs = map
            .iter()
            .map(|(key, value)| {
                if !is_markup_name(key, &['_', ':', '.']) {
                    return Err(invalid(&attrs_field, format!("invalid attribute name {key:?}")));
                }
                scalar_to_string(value, &format!("{attrs_field}.{key}")).map(|v| (key.clone(), v))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let content = content
            .map(|c| expect_str(c, &format!("{field}[2]")).map(str::to_owned))
            .transpose()?;

        Ok(Self {
            name: name.to_owned(),
            attrs,
            content,
        })
    }
}

/// Check for an ASCII letter followed by letters, digits, `-`, or `extra`.
fn is_markup_name(name: &str, extra: &[char]) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || extra.contains(&c))
}

/// Plugin declared in the `plugins` list.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginRegistration {
    /// Plugin name as written in the configuration.
    pub name: String,
    /// Plugin options, an empty table when none are given.
    pub options: Value,
    /// Explicit ordering priority. Lower runs first.
    pub priority: Option<i64>,
    /// Position in the `plugins` list.
    pub index: usize,
}

impl PluginRegistration {
    /// Parse `"name"`, `["name", {options}]`, or `{ name, options, priority }`.
    pub(crate) fn parse(value: &Value, index: usize, field: &str) -> Result<Self, ConfigError> {
        let (name, options, priority) = match value {
            Value::String(name) => (name.as_str(), None, None),
            Value::Array(items) => match items.as_slice() {
                [name] => (expect_str(name, &format!("{field}[0]"))?, None, None),
                [name, options] => (
                    expect_str(name, &format!("{field}[0]"))?,
                    Some((options, format!("{field}[1]"))),
                    None,
                ),
                _ => {
                    return Err(invalid(
                        field,
                        format!("expected [name, options] pair, found {} items", items.len()),
                    ));
                }
            },
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .ok_or_else(|| ConfigError::MissingField(format!("{field}.name")))?;
                let priority = map
                    .get("priority")
                    .map(|p| {
                        p.as_i64().ok_or_else(|| {
                            invalid(&format!("{field}.priority"), "expected an integer".to_owned())
                        })
                    })
                    .transpose()?;
                (
                    expect_str(name, &format!("{field}.name"))?,
                    map.get("options").map(|o| (o, format!("{field}.options"))),
                    priority,
                )
            }
            other => {
                return Err(invalid(
                    field,
                    format!("expected a plugin name, pair, or table, found {}", type_name(other)),
                ));
            }
        };

        if name.is_empty() {
            return Err(invalid(field, "plugin name cannot be empty".to_owned()));
        }

        let options = match options {
            None | Some((Value::Null, _)) => Value::Object(Map::new()),
            Some((options @ Value::Object(_), _)) => options.clone(),
            Some((other, options_field)) => {
                return Err(invalid(
                    &options_field,
                    format!("expected a table of options, found {}", type_name(other)),
                ));
            }
        };

        Ok(Self {
            name: name.to_owned(),
            options,
            priority,
            index,
        })
    }
}

fn require_target(target: &str, field: &str) -> Result<(), ConfigError> {
    if target.trim().is_empty() {
        return Err(invalid(field, "link target cannot be empty".to_owned()));
    }
    Ok(())
}

pub(crate) fn expect_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, ConfigError> {
    value.as_str().ok_or_else(|| {
        invalid(
            field,
            format!("expected a string, found {}", type_name(value)),
        )
    })
}

fn scalar_to_string(value: &Value, field: &str) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(invalid(
            field,
            format!("expected a scalar value, found {}", type_name(other)),
        )),
    }
}

pub(crate) fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::InvalidField {
        field: field.to_owned(),
        message,
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}
