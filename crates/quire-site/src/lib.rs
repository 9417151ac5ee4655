//! Navigation resolution for quire.
//!
//! This crate provides:
//! - [`NavigationResolver`]: reconciles declared sidebar and navbar entries
//!   with the pages found by discovery
//! - [`NavTree`]: the resolved, read-only navigation tree with reading
//!   order and previous/next lookups
//!
//! # Quick Start
//!
//! ```ignore
//! use quire_site::{NavigationResolver, ResolverOptions};
//!
//! let pages = quire_content::Discovery::new("docs").discover()?;
//! let resolver = NavigationResolver::new(&pages, ResolverOptions::default());
//! let sidebar = resolver.resolve_sidebar(config.sidebar())?;
//! for page in sidebar.tree.leaves() {
//!     println!("{}", page.route);
//! }
//! ```

mod nav_tree;
mod resolver;
mod trie;

pub use nav_tree::{NavNode, NavTree, Neighbours};
pub use resolver::{NavigationResolver, Resolution, ResolverOptions};

/// Declared entry that cannot be placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// No page matches the entry.
    #[error("Navigation entry '{entry}' does not match any page")]
    UnresolvedEntry {
        /// Entry target as declared.
        entry: String,
    },
    /// More than one page matches the entry's prefix.
    #[error("Navigation entry '{entry}' is ambiguous: matches {}", candidates.join(", "))]
    AmbiguousEntry {
        /// Entry target as declared.
        entry: String,
        /// Routes of the matching pages, in discovery order.
        candidates: Vec<String>,
    },
}

/// Non-fatal navigation problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavWarning {
    /// Entry skipped in lenient mode.
    #[error("{0}; entry skipped")]
    Skipped(NavigationError),
    /// Entry resolved to a page already placed by an earlier entry.
    #[error("Navigation entry '{entry}' repeats page {route}; only the first occurrence is kept")]
    DuplicateEntry {
        /// Entry target as declared.
        entry: String,
        /// Route of the repeated page.
        route: String,
    },
    /// Group left with no entries after resolution.
    #[error("Navigation group '{title}' has no resolvable entries; group dropped")]
    EmptyGroup {
        /// Group heading.
        title: String,
    },
}
