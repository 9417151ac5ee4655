//! Source page discovery for quire.
//!
//! Walks the source directory, maps every eligible file to a unique route,
//! and parses YAML frontmatter:
//!
//! ```ignore
//! use quire_content::Discovery;
//!
//! for page in Discovery::new("docs").pages() {
//!     let page = page?;
//!     println!("{} -> {}", page.source_path.display(), page.route);
//! }
//! ```

mod discovery;
mod frontmatter;
mod page;

use std::path::PathBuf;

pub use discovery::{Discovery, PageIter, file_path_to_route};
pub use page::{Frontmatter, Page};

/// Error raised while discovering pages.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Source directory does not exist.
    #[error("Source directory not found: {}", .0.display())]
    MissingSourceDir(PathBuf),
    /// Directory or file cannot be read.
    #[error("Cannot read {}: {source}", path.display())]
    Unreadable {
        /// Absolute path of the entry.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Two source files map to the same route.
    #[error("Route {route} is produced by both {} and {}", first.display(), second.display())]
    RouteCollision {
        /// Colliding route.
        route: String,
        /// File that claimed the route first.
        first: PathBuf,
        /// File that collided with it.
        second: PathBuf,
    },
    /// Frontmatter block is not valid YAML.
    #[error("Invalid frontmatter in {}: {message}", path.display())]
    Frontmatter {
        /// Source path relative to the source directory.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}
