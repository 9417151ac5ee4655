//! Page rendering.
//!
//! A [`ThemeRenderer`] turns a page draft and the site navigation into a
//! complete HTML document. [`DefaultTheme`] is a minimal built-in layout:
//! navbar, sidebar, content, previous/next links and the last-updated stamp.

use std::fmt::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use quire_config::{HeadTag, SiteConfig};
use quire_content::file_path_to_route;
use quire_plugin::{Asset, PageDraft, escape_html};
use quire_site::{NavNode, NavTree, Neighbours};

/// Error raised by a theme.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Formatting into the output buffer failed.
    #[error("Formatting failed: {0}")]
    Fmt(#[from] fmt::Error),
    /// Theme-specific failure.
    #[error("{0}")]
    Theme(String),
}

/// Site-wide data available while rendering one page.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Site configuration.
    pub config: &'a SiteConfig,
    /// Resolved sidebar.
    pub sidebar: &'a NavTree,
    /// Resolved navbar.
    pub navbar: &'a NavTree,
    /// Pages before and after this one in sidebar order.
    pub neighbours: Neighbours<'a>,
}

/// Renders pages to HTML.
///
/// Called from several threads at once. Links in the output are
/// root-relative; the build prefixes them with the base path afterwards.
pub trait ThemeRenderer: Send + Sync {
    /// Render a full HTML document for `page`.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be rendered.
    fn render(&self, page: &PageDraft, ctx: &RenderContext<'_>) -> Result<String, RenderError>;

    /// Static files the theme needs, written once per build.
    fn assets(&self) -> Vec<Asset> {
        Vec::new()
    }
}

/// Path of the default theme's stylesheet.
const STYLESHEET: &str = "assets/css/quire.css";

const CSS: &str = "body{margin:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;color:#2c3e50}
.navbar{display:flex;align-items:center;justify-content:space-between;height:3.6rem;padding:0 1.5rem;border-bottom:1px solid #eaecef}
.navbar .site-name{font-size:1.3rem;font-weight:600;color:#2c3e50;text-decoration:none}
.nav-links>ul{display:flex;gap:1.5rem;list-style:none;margin:0;padding:0}
.nav-links ul ul{display:none}
.nav-links li:hover>ul{display:block;position:absolute;background:#fff;border:1px solid #ddd;padding:.5rem 1rem;list-style:none}
.sidebar{position:fixed;top:3.6rem;bottom:0;width:20rem;overflow-y:auto;border-right:1px solid #eaecef}
.sidebar ul{list-style:none;padding-left:1rem}
.sidebar-heading{font-weight:700;margin:.5rem 0}
.sidebar a.active{color:#3eaf7c;font-weight:600}
.page{margin-left:20rem;padding:2rem 2.5rem}
.content{max-width:740px}
.page-meta{margin-top:2rem;color:#767676;font-size:.9rem}
.page-nav{display:flex;justify-content:space-between;margin-top:2rem;border-top:1px solid #eaecef;padding-top:1rem}
a{color:#3eaf7c}
";

/// Built-in layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTheme;

impl ThemeRenderer for DefaultTheme {
    fn render(&self, page: &PageDraft, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let config = ctx.config;
        let mut html = String::with_capacity(8192);

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        writeln!(html, "<title>{}</title>", escape_html(&document_title(page, config)))?;
        if !config.description.is_empty() {
            writeln!(
                html,
                "<meta name=\"description\" content=\"{}\">",
                escape_html(&config.description)
            )?;
        }
        writeln!(html, "<link rel=\"stylesheet\" href=\"/{STYLESHEET}\">")?;
        for tag in &config.head_tags {
            render_head_tag(&mut html, tag)?;
        }
        for fragment in &page.head {
            html.push_str(fragment);
            html.push('\n');
        }
        html.push_str("</head>\n<body>\n");

        render_navbar(&mut html, ctx)?;
        render_sidebar(&mut html, ctx.sidebar, &page.route)?;

        html.push_str("<main class=\"page\">\n<div class=\"content\">\n");
        html.push_str(&markdown_to_html(&page.markdown, &page.source_path));
        html.push_str("</div>\n");

        if config.theme.last_updated
            && let Some(date) = page.last_modified.and_then(format_date)
        {
            let label = config.theme.last_updated_text.as_deref().unwrap_or("Last Updated");
            writeln!(
                html,
                "<div class=\"page-meta\"><span class=\"last-updated\">{}: {date}</span></div>",
                escape_html(label)
            )?;
        }

        render_page_nav(&mut html, ctx.neighbours)?;
        html.push_str("</main>\n");

        for fragment in &page.body_end {
            html.push_str(fragment);
            html.push('\n');
        }
        html.push_str("</body>\n</html>\n");
        Ok(html)
    }

    fn assets(&self) -> Vec<Asset> {
        vec![Asset::text(STYLESHEET, CSS)]
    }
}

fn document_title(page: &PageDraft, config: &SiteConfig) -> String {
    if page.route == "/" || page.title == config.title {
        config.title.clone()
    } else {
        format!("{} | {}", page.title, config.title)
    }
}

/// Elements written without a closing tag.
const VOID_ELEMENTS: [&str; 4] = ["meta", "link", "base", "br"];

fn render_head_tag(html: &mut String, tag: &HeadTag) -> fmt::Result {
    write!(html, "<{}", tag.name)?;
    for (name, value) in &tag.attrs {
        write!(html, " {name}=\"{}\"", escape_html(value))?;
    }
    html.push('>');
    if !VOID_ELEMENTS.contains(&tag.name.as_str()) {
        if let Some(content) = &tag.content {
            html.push_str(content);
        }
        write!(html, "</{}>", tag.name)?;
    }
    html.push('\n');
    Ok(())
}

fn render_navbar(html: &mut String, ctx: &RenderContext<'_>) -> fmt::Result {
    html.push_str("<header class=\"navbar\">\n");
    writeln!(
        html,
        "<a class=\"site-name\" href=\"/\">{}</a>",
        escape_html(&ctx.config.title)
    )?;
    html.push_str("<nav class=\"nav-links\">\n<ul>\n");
    render_nav_nodes(html, ctx.navbar.nodes(), None)?;
    if let Some(repo) = &ctx.config.theme.repo {
        writeln!(
            html,
            "<li><a class=\"repo-link\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>",
            escape_html(&repo_url(repo)),
            repo_label(repo)
        )?;
    }
    html.push_str("</ul>\n</nav>\n</header>\n");
    Ok(())
}

fn render_sidebar(html: &mut String, sidebar: &NavTree, route: &str) -> fmt::Result {
    html.push_str("<aside class=\"sidebar\">\n<ul>\n");
    render_nav_nodes(html, sidebar.nodes(), Some(route))?;
    html.push_str("</ul>\n</aside>\n");
    Ok(())
}

fn render_nav_nodes(html: &mut String, nodes: &[NavNode], active: Option<&str>) -> fmt::Result {
    for node in nodes {
        let label = escape_html(node.label());
        match node {
            NavNode::Leaf { page, .. } => {
                let class = if active == Some(page.route.as_str()) {
                    " class=\"active\""
                } else {
                    ""
                };
                writeln!(
                    html,
                    "<li><a href=\"{}\"{class}>{label}</a></li>",
                    escape_html(&page.route)
                )?;
            }
            NavNode::Group { children, .. } => {
                writeln!(html, "<li class=\"nav-group\"><p class=\"sidebar-heading\">{label}</p>")?;
                html.push_str("<ul>\n");
                render_nav_nodes(html, children, active)?;
                html.push_str("</ul>\n</li>\n");
            }
            NavNode::External { href, .. } => {
                writeln!(
                    html,
                    "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{label}</a></li>",
                    escape_html(href)
                )?;
            }
        }
    }
    Ok(())
}

fn render_page_nav(html: &mut String, neighbours: Neighbours<'_>) -> fmt::Result {
    if neighbours.prev.is_none() && neighbours.next.is_none() {
        return Ok(());
    }
    html.push_str("<div class=\"page-nav\">\n");
    if let Some(prev) = neighbours.prev {
        writeln!(
            html,
            "<a class=\"prev\" href=\"{}\">← {}</a>",
            escape_html(&prev.route),
            escape_html(&prev.title)
        )?;
    }
    if let Some(next) = neighbours.next {
        writeln!(
            html,
            "<a class=\"next\" href=\"{}\">{} →</a>",
            escape_html(&next.route),
            escape_html(&next.title)
        )?;
    }
    html.push_str("</div>\n");
    Ok(())
}

/// Full URL for a `themeConfig.repo` value; bare `owner/name` means GitHub.
fn repo_url(repo: &str) -> String {
    if quire_config::is_external(repo) {
        repo.to_owned()
    } else {
        format!("https://github.com/{}", repo.trim_matches('/'))
    }
}

fn repo_label(repo: &str) -> &'static str {
    let url = repo.to_ascii_lowercase();
    if url.contains("gitlab") {
        "GitLab"
    } else if url.contains("bitbucket") {
        "Bitbucket"
    } else if url.contains("://") && !url.contains("github") {
        "Source"
    } else {
        "GitHub"
    }
}

/// Render page markdown, pointing `.md` links at their routes.
fn markdown_to_html(markdown: &str, source_path: &Path) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM;
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match md_link_to_route(&dest_url, source_path) {
                Some(route) => CowStr::from(route),
                None => dest_url,
            };
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Route for a link to a markdown source, keeping any fragment.
///
/// Relative links resolve against the directory of `source_path`. Returns
/// `None` for links that are external, not markdown, or climb above the
/// source root.
#[allow(clippy::case_sensitive_file_extension_comparisons)]
fn md_link_to_route(url: &str, source_path: &Path) -> Option<String> {
    if url.starts_with('#') || quire_config::is_external(url) {
        return None;
    }
    let (path, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };
    if !path.ends_with(".md") {
        return None;
    }

    let joined = match path.strip_prefix('/') {
        Some(absolute) => PathBuf::from(absolute),
        None => source_path.parent().unwrap_or(Path::new("")).join(path),
    };
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(format!("{}{fragment}", file_path_to_route(&resolved)))
}

/// `YYYY-MM-DD` in UTC.
#[allow(clippy::similar_names)]
fn format_date(time: SystemTime) -> Option<String> {
    let secs = time.duration_since(UNIX_EPOCH).ok()?.as_secs();
    let days = i64::try_from(secs / 86_400).ok()?;

    // Civil-from-days over 400-year eras of 146_097 days.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    Some(format!("{year:04}-{month:02}-{day:02}"))
}
