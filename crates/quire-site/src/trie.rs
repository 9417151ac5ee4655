//! Route lookup by path segments.

use std::collections::BTreeMap;

/// Trie of routes keyed by path segment.
///
/// Each node may hold the index of the page whose route ends there. Indices
/// refer to the page slice the trie was built from, so candidate lists come
/// back in discovery order.
#[derive(Debug, Default)]
pub(crate) struct RouteTrie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    page: Option<usize>,
    children: BTreeMap<String, TrieNode>,
}

impl TrieNode {
    fn collect(&self, out: &mut Vec<usize>) {
        out.extend(self.page);
        for child in self.children.values() {
            child.collect(out);
        }
    }
}

impl RouteTrie {
    /// Build a trie from routes, keyed by their position in `routes`.
    pub(crate) fn new<'a>(routes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut trie = Self::default();
        for (idx, route) in routes.into_iter().enumerate() {
            trie.insert(route, idx);
        }
        trie
    }

    fn insert(&mut self, route: &str, idx: usize) {
        let mut node = &mut self.root;
        for segment in segments(route) {
            node = node.children.entry(segment.to_owned()).or_default();
        }
        node.page = Some(idx);
    }

    /// Page whose route is exactly `target`.
    pub(crate) fn exact(&self, target: &[&str]) -> Option<usize> {
        self.node(target).and_then(|n| n.page)
    }

    /// Pages whose route starts with `target`, where the last target
    /// segment may match a segment partially.
    ///
    /// Results are sorted by page index.
    pub(crate) fn prefix_matches(&self, target: &[&str]) -> Vec<usize> {
        let mut out = Vec::new();
        match target.split_last() {
            None => self.root.collect(&mut out),
            Some((last, parents)) => {
                if let Some(parent) = self.node(parents) {
                    for (key, child) in &parent.children {
                        if key.starts_with(last) {
                            child.collect(&mut out);
                        }
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }

    fn node(&self, target: &[&str]) -> Option<&TrieNode> {
        target
            .iter()
            .try_fold(&self.root, |node, segment| node.children.get(*segment))
    }
}

/// Non-empty segments of a route.
pub(crate) fn segments(route: &str) -> impl Iterator<Item = &str> {
    route.split('/').filter(|s| !s.is_empty())
}
