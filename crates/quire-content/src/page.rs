//! Discovered source page.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde_json::Value;

/// Frontmatter fields keyed by name.
pub type Frontmatter = BTreeMap<String, Value>;

/// One source file, as seen by a single discovery pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Path relative to the source directory.
    pub source_path: PathBuf,
    /// Site route, starting and ending with `/`.
    pub route: String,
    /// Parsed YAML frontmatter.
    pub frontmatter: Frontmatter,
    /// Modification time of the source file.
    pub last_modified: Option<SystemTime>,
    /// Display title.
    pub title: String,
    /// Markdown after the frontmatter block.
    pub body: String,
}

impl Page {
    /// Create a page, deriving its title.
    ///
    /// The title comes from the frontmatter `title` field, then the first
    /// level-one heading of the body, then the last route segment.
    #[must_use]
    pub fn new(
        source_path: PathBuf,
        route: String,
        frontmatter: Frontmatter,
        last_modified: Option<SystemTime>,
        body: String,
    ) -> Self {
        let title = derive_title(&frontmatter, &body, &route);
        Self {
            source_path,
            route,
            frontmatter,
            last_modified,
            title,
            body,
        }
    }

    /// Route segments, empty for the root page.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.route.split('/').filter(|s| !s.is_empty())
    }
}

fn derive_title(frontmatter: &Frontmatter, body: &str, route: &str) -> String {
    if let Some(Value::String(title)) = frontmatter.get("title")
        && !title.trim().is_empty()
    {
        return title.trim().to_owned();
    }
    if let Some(heading) = first_heading(body) {
        return heading;
    }
    match route.trim_end_matches('/').rsplit_once('/') {
        Some((_, slug)) if !slug.is_empty() => titlecase_from_slug(slug),
        _ => "Home".to_owned(),
    }
}

/// Text of the first non-empty H1, skipping code blocks and inline markup.
fn first_heading(body: &str) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();
    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let heading = text.trim();
                if !heading.is_empty() {
                    return Some(heading.to_owned());
                }
                in_heading = false;
                text.clear();
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }
    None
}

/// Convert a slug (kebab-case or `snake_case`) to title case.
fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}
