//! Page discovery by filesystem walking.
//!
//! The walk is lazy: [`PageIter`] reads one directory at a time and yields
//! pages in a fixed order. Within a directory the index file comes first,
//! then the remaining files, then subdirectories, each group sorted by name.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use crate::frontmatter::{parse_frontmatter, split_frontmatter};
use crate::{DiscoveryError, Page};

/// File stems that map to their parent directory's route.
const INDEX_STEMS: [&str; 2] = ["index", "readme"];

/// Discovers source pages under a directory.
///
/// The value holds no walk state, so every call to [`Discovery::pages`]
/// starts a fresh pass over the current filesystem contents.
#[derive(Debug, Clone)]
pub struct Discovery {
    source_dir: PathBuf,
    extensions: Vec<String>,
}

impl Discovery {
    /// Create a discovery over `source_dir` for `.md` files.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            extensions: vec!["md".to_owned()],
        }
    }

    /// Replace the set of eligible file extensions (without the dot).
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Root directory being scanned.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Start a lazy walk over the source directory.
    #[must_use]
    pub fn pages(&self) -> PageIter<'_> {
        PageIter {
            discovery: self,
            started: false,
            stack: Vec::new(),
            seen: HashMap::new(),
        }
    }

    /// Run a full pass and collect every page.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered by the walk.
    pub fn discover(&self) -> Result<Vec<Page>, DiscoveryError> {
        let pages = self.pages().collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            source_dir = %self.source_dir.display(),
            pages = pages.len(),
            "Discovered pages"
        );
        Ok(pages)
    }

    /// Check whether a path relative to the source directory would be
    /// picked up by a walk.
    #[must_use]
    pub fn is_eligible(&self, rel_path: &Path) -> bool {
        let hidden = rel_path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        !hidden && self.has_eligible_extension(rel_path)
    }

    fn has_eligible_extension(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_string_lossy();
            self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
    }
}

/// Entry waiting to be visited.
#[derive(Debug)]
enum Pending {
    File(PathBuf),
    Dir(PathBuf),
}

/// Lazy iterator over the pages of one discovery pass.
///
/// Yields `Err` for entries that cannot be read, frontmatter that cannot be
/// parsed, and routes already produced earlier in the pass. The walk
/// continues past errors.
#[derive(Debug)]
pub struct PageIter<'a> {
    discovery: &'a Discovery,
    started: bool,
    stack: Vec<VecDeque<Pending>>,
    seen: HashMap<String, PathBuf>,
}

impl PageIter<'_> {
    /// List a directory in visiting order.
    fn read_dir(&self, rel_dir: &Path) -> Result<VecDeque<Pending>, DiscoveryError> {
        let abs_dir = self.discovery.source_dir.join(rel_dir);
        let unreadable = |source| DiscoveryError::Unreadable {
            path: abs_dir.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(&abs_dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            // Follows symlinks, unlike DirEntry::file_type
            let is_dir = fs::metadata(entry.path())
                .map_err(|source| DiscoveryError::Unreadable {
                    path: entry.path(),
                    source,
                })?
                .is_dir();
            entries.push((name, is_dir));
        }
        entries.sort();

        let mut index = VecDeque::new();
        let mut files = VecDeque::new();
        let mut dirs = VecDeque::new();
        for (name, is_dir) in entries {
            let rel = rel_dir.join(&name);
            if is_dir {
                dirs.push_back(Pending::Dir(rel));
            } else if self.discovery.has_eligible_extension(&rel) {
                if is_index_file(&rel) {
                    index.push_back(Pending::File(rel));
                } else {
                    files.push_back(Pending::File(rel));
                }
            }
        }
        index.append(&mut files);
        index.append(&mut dirs);
        Ok(index)
    }

    /// Read one source file into a page.
    fn load(&mut self, rel_path: PathBuf) -> Result<Page, DiscoveryError> {
        let route = file_path_to_route(&rel_path);
        if let Some(first) = self.seen.get(&route) {
            return Err(DiscoveryError::RouteCollision {
                route,
                first: first.clone(),
                second: rel_path,
            });
        }

        let abs_path = self.discovery.source_dir.join(&rel_path);
        let unreadable = |source| DiscoveryError::Unreadable {
            path: abs_path.clone(),
            source,
        };
        let content = fs::read_to_string(&abs_path).map_err(unreadable)?;
        let last_modified = fs::metadata(&abs_path)
            .and_then(|m| m.modified())
            .ok();

        let (frontmatter, body) = split_frontmatter(&content);
        let frontmatter = frontmatter
            .map(parse_frontmatter)
            .transpose()
            .map_err(|message| DiscoveryError::Frontmatter {
                path: rel_path.clone(),
                message,
            })?
            .unwrap_or_default();

        self.seen.insert(route.clone(), rel_path.clone());
        Ok(Page::new(
            rel_path,
            route,
            frontmatter,
            last_modified,
            body.to_owned(),
        ))
    }
}

impl Iterator for PageIter<'_> {
    type Item = Result<Page, DiscoveryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            if !self.discovery.source_dir.is_dir() {
                return Some(Err(DiscoveryError::MissingSourceDir(
                    self.discovery.source_dir.clone(),
                )));
            }
            match self.read_dir(Path::new("")) {
                Ok(root) => self.stack.push(root),
                Err(e) => return Some(Err(e)),
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(pending) = frame.pop_front() else {
                self.stack.pop();
                continue;
            };
            match pending {
                Pending::Dir(rel_dir) => match self.read_dir(&rel_dir) {
                    Ok(children) => self.stack.push(children),
                    Err(e) => return Some(Err(e)),
                },
                Pending::File(rel_path) => return Some(self.load(rel_path)),
            }
        }
    }
}

fn is_index_file(rel_path: &Path) -> bool {
    rel_path.file_stem().is_some_and(|stem| {
        let stem = stem.to_string_lossy();
        INDEX_STEMS.iter().any(|s| stem.eq_ignore_ascii_case(s))
    })
}

/// Convert a source path relative to the source directory into a route.
///
/// Examples:
/// - `README.md` -> `/`
/// - `guide.md` -> `/guide/`
/// - `cli/readme.md` -> `/cli/`
/// - `a/b.md` -> `/a/b/`
#[must_use]
pub fn file_path_to_route(rel_path: &Path) -> String {
    let mut segments: Vec<String> = rel_path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if !is_index_file(rel_path)
        && let Some(stem) = rel_path.file_stem()
    {
        segments.push(stem.to_string_lossy().into_owned());
    }

    if segments.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", segments.join("/"))
    }
}
