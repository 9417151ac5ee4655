//! Resolved navigation tree.

use std::collections::HashMap;

use quire_content::Page;

/// Node of a resolved navigation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NavNode {
    /// Resolved page.
    Leaf {
        /// The page the entry resolved to.
        page: Page,
        /// Declared display text, if any.
        text: Option<String>,
    },
    /// Titled group.
    Group {
        /// Group heading.
        title: String,
        /// Nested nodes in declared order.
        children: Vec<NavNode>,
    },
    /// Link outside the site, kept verbatim.
    External {
        /// Display text.
        text: String,
        /// Link target.
        href: String,
    },
}

impl NavNode {
    /// Text shown for this node.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Leaf { page, text } => text.as_deref().unwrap_or(&page.title),
            Self::Group { title, .. } => title,
            Self::External { text, .. } => text,
        }
    }

    /// Record the child-index path of every leaf below this node.
    fn collect_leaf_paths(&self, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        match self {
            Self::Leaf { .. } => out.push(prefix.clone()),
            Self::Group { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    prefix.push(i);
                    child.collect_leaf_paths(prefix, out);
                    prefix.pop();
                }
            }
            Self::External { .. } => {}
        }
    }
}

/// Previous and next pages in reading order.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Neighbours<'a> {
    /// Page before the current one.
    pub prev: Option<&'a Page>,
    /// Page after the current one.
    pub next: Option<&'a Page>,
}

/// Ordered navigation tree.
///
/// Leaves appear at most once. The reading order is computed once, as the
/// child-index path of every leaf, so lookups by route do not walk the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavTree {
    nodes: Vec<NavNode>,
    /// Route -> reading-order position.
    index: HashMap<String, usize>,
    /// Reading-order position -> child-index path, starting at the top level.
    paths: Vec<Vec<usize>>,
}

impl NavTree {
    /// Build a tree from top-level nodes.
    #[must_use]
    pub fn new(nodes: Vec<NavNode>) -> Self {
        let mut paths = Vec::new();
        let mut prefix = Vec::new();
        for (top, node) in nodes.iter().enumerate() {
            prefix.push(top);
            node.collect_leaf_paths(&mut prefix, &mut paths);
            prefix.pop();
        }
        let mut tree = Self {
            nodes,
            index: HashMap::with_capacity(paths.len()),
            paths,
        };
        let routes: Vec<(String, usize)> = (0..tree.paths.len())
            .filter_map(|pos| tree.leaf_at(pos).map(|page| (page.route.clone(), pos)))
            .collect();
        tree.index.extend(routes);
        tree
    }

    /// Top-level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    /// Leaf pages in reading order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Page> {
        (0..self.paths.len()).filter_map(|pos| self.leaf_at(pos)).collect()
    }

    /// Number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.paths.len()
    }

    /// Check whether a route appears as a leaf.
    #[must_use]
    pub fn contains(&self, route: &str) -> bool {
        self.index.contains_key(route)
    }

    /// Leaf page for a route.
    #[must_use]
    pub fn find(&self, route: &str) -> Option<&Page> {
        self.leaf_at(*self.index.get(route)?)
    }

    /// Previous and next leaves around `route`.
    ///
    /// Both are `None` for routes that are not in the tree.
    #[must_use]
    pub fn neighbours(&self, route: &str) -> Neighbours<'_> {
        let Some(&position) = self.index.get(route) else {
            return Neighbours::default();
        };
        Neighbours {
            prev: position.checked_sub(1).and_then(|p| self.leaf_at(p)),
            next: self.leaf_at(position + 1),
        }
    }

    /// Swap an updated page into the leaf that references its route.
    ///
    /// Returns the index of the top-level node that changed, or `None` if
    /// the route is not in the tree. The route set and structure stay as
    /// they are.
    pub fn replace_page(&mut self, page: Page) -> Option<usize> {
        let path = self.paths.get(*self.index.get(&page.route)?)?;
        let (&top, rest) = path.split_first()?;
        let mut node = self.nodes.get_mut(top)?;
        for &i in rest {
            node = match node {
                NavNode::Group { children, .. } => children.get_mut(i)?,
                _ => return None,
            };
        }
        match node {
            NavNode::Leaf { page: slot, .. } => {
                *slot = page;
                Some(top)
            }
            _ => None,
        }
    }

    fn leaf_at(&self, position: usize) -> Option<&Page> {
        let (&top, rest) = self.paths.get(position)?.split_first()?;
        let mut node = self.nodes.get(top)?;
        for &i in rest {
            node = match node {
                NavNode::Group { children, .. } => children.get(i)?,
                _ => return None,
            };
        }
        match node {
            NavNode::Leaf { page, .. } => Some(page),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn page(route: &str, title: &str) -> Page {
        Page::new(
            PathBuf::from(format!("{}.md", route.trim_matches('/'))),
            route.to_owned(),
            quire_content::Frontmatter::new(),
            None,
            format!("# {title}\n"),
        )
    }

    fn leaf(route: &str, title: &str) -> NavNode {
        NavNode::Leaf {
            page: page(route, title),
            text: None,
        }
    }

    fn tree() -> NavTree {
        NavTree::new(vec![
            leaf("/", "Home"),
            NavNode::Group {
                title: "Build tools".to_owned(),
                children: vec![leaf("/maven/", "Maven"), leaf("/gradle/", "Gradle")],
            },
            NavNode::External {
                text: "GitHub".to_owned(),
                href: "https://github.com/docktape".to_owned(),
            },
            leaf("/changelog/", "Changelog"),
        ])
    }

    #[test]
    fn test_leaves_in_reading_order() {
        let tree = tree();
        let routes: Vec<_> = tree.leaves().iter().map(|p| p.route.as_str()).collect();
        assert_eq!(routes, vec!["/", "/maven/", "/gradle/", "/changelog/"]);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_find() {
        let tree = tree();
        assert_eq!(tree.find("/gradle/").map(|p| p.title.as_str()), Some("Gradle"));
        assert!(tree.find("/missing/").is_none());
        assert!(tree.contains("/maven/"));
    }

    #[test]
    fn test_neighbours() {
        let tree = tree();

        let first = tree.neighbours("/");
        assert!(first.prev.is_none());
        assert_eq!(first.next.map(|p| p.route.as_str()), Some("/maven/"));

        let middle = tree.neighbours("/gradle/");
        assert_eq!(middle.prev.map(|p| p.route.as_str()), Some("/maven/"));
        assert_eq!(middle.next.map(|p| p.route.as_str()), Some("/changelog/"));

        let last = tree.neighbours("/changelog/");
        assert!(last.next.is_none());

        assert_eq!(tree.neighbours("/missing/"), Neighbours::default());
    }

    #[test]
    fn test_replace_page_reports_subtree() {
        let mut tree = tree();

        let affected = tree.replace_page(page("/gradle/", "Gradle Plugin"));

        assert_eq!(affected, Some(1));
        assert_eq!(tree.find("/gradle/").unwrap().title, "Gradle Plugin");
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_lookups_in_nested_groups() {
        let tree = NavTree::new(vec![
            NavNode::Group {
                title: "Guide".to_owned(),
                children: vec![
                    leaf("/intro/", "Intro"),
                    NavNode::Group {
                        title: "Plugins".to_owned(),
                        children: vec![leaf("/maven/", "Maven"), leaf("/gradle/", "Gradle")],
                    },
                ],
            },
            leaf("/faq/", "FAQ"),
        ]);

        assert_eq!(tree.find("/gradle/").map(|p| p.title.as_str()), Some("Gradle"));
        let around = tree.neighbours("/gradle/");
        assert_eq!(around.prev.map(|p| p.route.as_str()), Some("/maven/"));
        assert_eq!(around.next.map(|p| p.route.as_str()), Some("/faq/"));

        let mut tree = tree;
        assert_eq!(tree.replace_page(page("/maven/", "Maven Plugin")), Some(0));
        assert_eq!(tree.neighbours("/gradle/").prev.unwrap().title, "Maven Plugin");
    }

    #[test]
    fn test_replace_page_unknown_route() {
        let mut tree = tree();
        assert_eq!(tree.replace_page(page("/other/", "Other")), None);
    }

    #[test]
    fn test_label_prefers_declared_text() {
        let node = NavNode::Leaf {
            page: page("/cli/", "Command Line"),
            text: Some("CLI".to_owned()),
        };
        assert_eq!(node.label(), "CLI");
        assert_eq!(leaf("/cli/", "Command Line").label(), "Command Line");
    }
}
