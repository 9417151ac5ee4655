//! Page drafts and emitted assets.

use std::path::PathBuf;
use std::time::SystemTime;

use quire_content::{Frontmatter, Page};

/// Page on its way to the renderer.
///
/// Plugins edit the draft in `transform_page`; the theme renders it
/// afterwards. HTML fragments in `head` and `body_end` are inserted
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    /// Site route.
    pub route: String,
    /// Source path relative to the source directory.
    pub source_path: PathBuf,
    /// Display title.
    pub title: String,
    /// Frontmatter fields.
    pub frontmatter: Frontmatter,
    /// Markdown body.
    pub markdown: String,
    /// Modification time of the source file.
    pub last_modified: Option<SystemTime>,
    /// Extra HTML for the `<head>` element.
    pub head: Vec<String>,
    /// Extra HTML inserted before `</body>`.
    pub body_end: Vec<String>,
}

impl PageDraft {
    /// Start a draft from a discovered page.
    #[must_use]
    pub fn from_page(page: &Page) -> Self {
        Self {
            route: page.route.clone(),
            source_path: page.source_path.clone(),
            title: page.title.clone(),
            frontmatter: page.frontmatter.clone(),
            markdown: page.body.clone(),
            last_modified: page.last_modified,
            head: Vec::new(),
            body_end: Vec::new(),
        }
    }
}

/// File emitted by a plugin, written under the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the output directory, `/`-separated.
    pub path: String,
    /// File contents.
    pub contents: Vec<u8>,
}

impl Asset {
    /// Create an asset from text.
    #[must_use]
    pub fn text(path: impl Into<String>, contents: &str) -> Self {
        Self {
            path: path.into(),
            contents: contents.as_bytes().to_vec(),
        }
    }
}

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
