//! Reconciliation of declared navigation with discovered pages.

use std::collections::HashSet;

use quire_config::NavEntry;
use quire_content::Page;

use crate::nav_tree::{NavNode, NavTree};
use crate::trie::{RouteTrie, segments};
use crate::{NavWarning, NavigationError};

/// Resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Fail on unresolved or ambiguous entries instead of warning.
    pub strict: bool,
    /// Leave pages that no entry references out of the tree.
    pub exclude_undeclared: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            strict: true,
            exclude_undeclared: false,
        }
    }
}

/// Resolved tree plus the problems downgraded to warnings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Navigation tree.
    pub tree: NavTree,
    /// Entries skipped in lenient mode and duplicate references.
    pub warnings: Vec<NavWarning>,
}

/// Resolves declared navigation entries against one discovery pass.
#[derive(Debug)]
pub struct NavigationResolver<'a> {
    pages: &'a [Page],
    trie: RouteTrie,
    options: ResolverOptions,
}

/// Mutable state of a single resolution.
struct Pass {
    used: HashSet<usize>,
    warnings: Vec<NavWarning>,
}

impl<'a> NavigationResolver<'a> {
    /// Create a resolver over a complete discovery pass.
    #[must_use]
    pub fn new(pages: &'a [Page], options: ResolverOptions) -> Self {
        let trie = RouteTrie::new(pages.iter().map(|p| p.route.as_str()));
        Self {
            pages,
            trie,
            options,
        }
    }

    /// Resolve sidebar entries into a navigation tree.
    ///
    /// Pages that no entry references are appended as trailing top-level
    /// leaves in discovery order, unless `exclude_undeclared` is set.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first unresolved or ambiguous entry.
    pub fn resolve_sidebar(&self, entries: &[NavEntry]) -> Result<Resolution, NavigationError> {
        let mut pass = Pass {
            used: HashSet::new(),
            warnings: Vec::new(),
        };
        let mut nodes = self.resolve_entries(entries, &mut pass)?;

        if !self.options.exclude_undeclared {
            let undeclared = self
                .pages
                .iter()
                .enumerate()
                .filter(|(idx, _)| !pass.used.contains(idx))
                .map(|(_, page)| NavNode::Leaf {
                    page: page.clone(),
                    text: None,
                });
            nodes.extend(undeclared);
        }

        let tree = NavTree::new(nodes);
        tracing::debug!(
            leaves = tree.leaf_count(),
            warnings = pass.warnings.len(),
            "Resolved sidebar"
        );
        Ok(Resolution {
            tree,
            warnings: pass.warnings,
        })
    }

    /// Resolve top navbar entries.
    ///
    /// Uses the same matching and policy as the sidebar but never appends
    /// undeclared pages.
    ///
    /// # Errors
    ///
    /// In strict mode, returns the first unresolved or ambiguous entry.
    pub fn resolve_navbar(&self, entries: &[NavEntry]) -> Result<Resolution, NavigationError> {
        let mut pass = Pass {
            used: HashSet::new(),
            warnings: Vec::new(),
        };
        let nodes = self.resolve_entries(entries, &mut pass)?;
        Ok(Resolution {
            tree: NavTree::new(nodes),
            warnings: pass.warnings,
        })
    }

    /// Resolve a single link target to a page.
    ///
    /// Tries an exact route match first, then the unique page whose route
    /// starts with the target.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedEntry` when nothing matches and `AmbiguousEntry`
    /// when the prefix matches more than one page.
    pub fn resolve_target(&self, target: &str) -> Result<&'a Page, NavigationError> {
        self.resolve_index(target).map(|idx| &self.pages[idx])
    }

    fn resolve_index(&self, target: &str) -> Result<usize, NavigationError> {
        let normalized = normalize_target(target);

        if let Some(idx) = self.trie.exact(&normalized) {
            return Ok(idx);
        }

        match self.trie.prefix_matches(&normalized).as_slice() {
            [] => Err(NavigationError::UnresolvedEntry {
                entry: target.to_owned(),
            }),
            [idx] => Ok(*idx),
            many => Err(NavigationError::AmbiguousEntry {
                entry: target.to_owned(),
                candidates: many.iter().map(|&i| self.pages[i].route.clone()).collect(),
            }),
        }
    }

    fn resolve_entries(
        &self,
        entries: &[NavEntry],
        pass: &mut Pass,
    ) -> Result<Vec<NavNode>, NavigationError> {
        let mut nodes = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                NavEntry::Link {
                    text,
                    target,
                    external: true,
                } => nodes.push(NavNode::External {
                    text: text.clone().unwrap_or_else(|| target.clone()),
                    href: target.clone(),
                }),
                NavEntry::Link { text, target, .. } => match self.resolve_index(target) {
                    Ok(idx) => {
                        if pass.used.insert(idx) {
                            nodes.push(NavNode::Leaf {
                                page: self.pages[idx].clone(),
                                text: text.clone(),
                            });
                        } else {
                            let warning = NavWarning::DuplicateEntry {
                                entry: target.clone(),
                                route: self.pages[idx].route.clone(),
                            };
                            tracing::warn!(%warning, "Duplicate navigation entry");
                            pass.warnings.push(warning);
                        }
                    }
                    Err(e) if self.options.strict => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping navigation entry");
                        pass.warnings.push(NavWarning::Skipped(e));
                    }
                },
                NavEntry::Group { title, children } => {
                    let children = self.resolve_entries(children, pass)?;
                    if children.is_empty() {
                        let warning = NavWarning::EmptyGroup {
                            title: title.clone(),
                        };
                        tracing::warn!(%warning, "Dropping empty navigation group");
                        pass.warnings.push(warning);
                        continue;
                    }
                    nodes.push(NavNode::Group {
                        title: title.clone(),
                        children,
                    });
                }
            }
        }
        Ok(nodes)
    }
}

/// Reduce a link target to route segments.
///
/// Drops the fragment and query, a trailing `.md` or `.html` extension, and
/// a final `index` or `README` segment.
fn normalize_target(target: &str) -> Vec<&str> {
    let path = target.split(['#', '?']).next().unwrap_or_default();
    let mut parts: Vec<&str> = segments(path).filter(|s| *s != ".").collect();

    if let Some(last) = parts.last_mut() {
        let current = *last;
        if let Some(stem) = current
            .strip_suffix(".md")
            .or_else(|| current.strip_suffix(".html"))
        {
            *last = stem;
        }
        if last.eq_ignore_ascii_case("index") || last.eq_ignore_ascii_case("readme") {
            parts.pop();
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn page(route: &str) -> Page {
        Page::new(
            PathBuf::from(format!("{}README.md", route.trim_start_matches('/'))),
            route.to_owned(),
            quire_content::Frontmatter::new(),
            None,
            String::new(),
        )
    }

    fn pages() -> Vec<Page> {
        [
            "/",
            "/configuration/",
            "/cli/",
            "/maven/",
            "/gradle/",
            "/rules/strict/",
            "/rules/lenient/",
        ]
        .into_iter()
        .map(page)
        .collect()
    }

    fn link(target: &str) -> NavEntry {
        NavEntry::link(target, None)
    }

    fn leaf_routes(tree: &NavTree) -> Vec<&str> {
        tree.leaves().iter().map(|p| p.route.as_str()).collect()
    }

    #[test]
    fn test_normalize_target() {
        assert_eq!(normalize_target("/"), Vec::<&str>::new());
        assert_eq!(normalize_target("/cli/"), vec!["cli"]);
        assert_eq!(normalize_target("cli"), vec!["cli"]);
        assert_eq!(normalize_target("/cli/README.md"), vec!["cli"]);
        assert_eq!(normalize_target("/rules/strict.html"), vec!["rules", "strict"]);
        assert_eq!(normalize_target("./maven/index.md#setup"), vec!["maven"]);
    }

    #[test]
    fn test_exact_and_prefix_resolution() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        assert_eq!(resolver.resolve_target("/cli/").unwrap().route, "/cli/");
        assert_eq!(resolver.resolve_target("/conf").unwrap().route, "/configuration/");
        assert_eq!(
            resolver.resolve_target("/rules/len").unwrap().route,
            "/rules/lenient/"
        );
    }

    #[test]
    fn test_ambiguous_prefix() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        let err = resolver.resolve_target("/rules/").unwrap_err();

        assert_eq!(
            err,
            NavigationError::AmbiguousEntry {
                entry: "/rules/".to_owned(),
                candidates: vec!["/rules/strict/".to_owned(), "/rules/lenient/".to_owned()],
            }
        );
    }

    #[test]
    fn test_missing_entry_is_fatal_and_named() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        let err = resolver
            .resolve_sidebar(&[link("/"), link("/missing/")])
            .unwrap_err();

        assert!(matches!(err, NavigationError::UnresolvedEntry { .. }));
        assert!(err.to_string().contains("/missing/"));
    }

    #[test]
    fn test_lenient_mode_skips_with_warning() {
        let pages = pages();
        let options = ResolverOptions {
            strict: false,
            exclude_undeclared: true,
        };
        let resolver = NavigationResolver::new(&pages, options);

        let resolution = resolver
            .resolve_sidebar(&[link("/"), link("/missing/"), link("/rules/"), link("/cli/")])
            .unwrap();

        assert_eq!(leaf_routes(&resolution.tree), vec!["/", "/cli/"]);
        assert_eq!(resolution.warnings.len(), 2);
        assert!(resolution.warnings[0].to_string().contains("/missing/"));
        assert!(matches!(
            resolution.warnings[1],
            NavWarning::Skipped(NavigationError::AmbiguousEntry { .. })
        ));
    }

    #[test]
    fn test_lenient_mode_drops_emptied_group() {
        let pages = pages();
        let options = ResolverOptions {
            strict: false,
            exclude_undeclared: true,
        };
        let resolver = NavigationResolver::new(&pages, options);

        let resolution = resolver
            .resolve_sidebar(&[
                link("/"),
                NavEntry::Group {
                    title: "Legacy".to_owned(),
                    children: vec![link("/ant/"), link("/sbt/")],
                },
                NavEntry::Group {
                    title: "Build tools".to_owned(),
                    children: vec![link("/maven/"), link("/missing/")],
                },
            ])
            .unwrap();

        let titles: Vec<_> = resolution.tree.nodes().iter().map(NavNode::label).collect();
        assert_eq!(titles, vec!["Home", "Build tools"]);
        assert_eq!(resolution.warnings.len(), 4);
        assert!(matches!(
            &resolution.warnings[2],
            NavWarning::EmptyGroup { title } if title == "Legacy"
        ));
    }

    #[test]
    fn test_undeclared_pages_appended_in_discovery_order() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        let resolution = resolver
            .resolve_sidebar(&[link("/cli/"), link("/")])
            .unwrap();

        assert_eq!(
            leaf_routes(&resolution.tree),
            vec![
                "/cli/",
                "/",
                "/configuration/",
                "/maven/",
                "/gradle/",
                "/rules/strict/",
                "/rules/lenient/",
            ]
        );
    }

    #[test]
    fn test_leaf_count_matches_distinct_entries_plus_undeclared() {
        let pages = pages();
        let entries = [
            link("/"),
            NavEntry::Group {
                title: "Build tools".to_owned(),
                children: vec![link("/maven/"), link("/gradle/")],
            },
            link("/maven/"),
            link("https://github.com/docktape/swagger-brake"),
        ];

        let excluded = NavigationResolver::new(
            &pages,
            ResolverOptions {
                exclude_undeclared: true,
                ..ResolverOptions::default()
            },
        )
        .resolve_sidebar(&entries)
        .unwrap();
        assert_eq!(excluded.tree.leaf_count(), 3);
        assert!(matches!(
            excluded.warnings.as_slice(),
            [NavWarning::DuplicateEntry { route, .. }] if route == "/maven/"
        ));

        let included = NavigationResolver::new(&pages, ResolverOptions::default())
            .resolve_sidebar(&entries)
            .unwrap();
        assert_eq!(included.tree.leaf_count(), 3 + 4);
    }

    #[test]
    fn test_external_links_pass_through() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        let resolution = resolver
            .resolve_navbar(&[NavEntry::link(
                "https://github.com/docktape/swagger-brake",
                Some("GitHub".to_owned()),
            )])
            .unwrap();

        assert_eq!(
            resolution.tree.nodes(),
            &[NavNode::External {
                text: "GitHub".to_owned(),
                href: "https://github.com/docktape/swagger-brake".to_owned(),
            }]
        );
        assert_eq!(resolution.tree.leaf_count(), 0);
    }

    #[test]
    fn test_navbar_does_not_append_undeclared() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        let resolution = resolver.resolve_navbar(&[link("/cli/")]).unwrap();

        assert_eq!(leaf_routes(&resolution.tree), vec!["/cli/"]);
    }

    #[test]
    fn test_declared_text_kept_on_leaf() {
        let pages = pages();
        let resolver = NavigationResolver::new(&pages, ResolverOptions::default());

        let resolution = resolver
            .resolve_navbar(&[NavEntry::link("/cli/", Some("Command line".to_owned()))])
            .unwrap();

        assert_eq!(resolution.tree.nodes()[0].label(), "Command line");
    }
}
