//! YAML frontmatter extraction.

use crate::page::Frontmatter;

/// Split a document into its frontmatter block and body.
///
/// The block must open on the first line with `---` and close with a line of
/// `---` or `...`. Without a complete block the whole input is the body.
pub(crate) fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, content)
}

/// Parse a frontmatter block into a field map.
///
/// Empty content yields an empty map.
///
/// # Errors
///
/// Returns a message if the YAML is malformed or is not a mapping.
pub(crate) fn parse_frontmatter(yaml: &str) -> Result<Frontmatter, String> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::new());
    }
    serde_yaml::from_str(yaml).map_err(|e| format!("Invalid YAML: {e}"))
}
