//! Output file layout and atomic writes.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// File that holds the HTML for `route`: `/a/b/` maps to `dest/a/b/index.html`.
#[must_use]
pub fn route_to_path(dest_dir: &Path, route: &str) -> PathBuf {
    let mut path = dest_dir.to_path_buf();
    for segment in route.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path.push("index.html");
    path
}

/// File for an asset path relative to the output directory.
///
/// Returns `None` for absolute paths and paths that climb out with `..`.
#[must_use]
pub fn asset_to_path(dest_dir: &Path, rel_path: &str) -> Option<PathBuf> {
    let rel = Path::new(rel_path);
    let mut path = dest_dir.to_path_buf();
    let mut pushed = false;
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                pushed = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    pushed.then_some(path)
}

/// Contents written next to their destination, waiting to be renamed into
/// place. Dropping it discards the temporary file.
#[derive(Debug)]
pub(crate) struct StagedFile {
    temp: tempfile::NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    /// Write `contents` to a synced temporary file beside `path`, creating
    /// parent directories as needed.
    pub(crate) fn stage(path: &Path, contents: &[u8]) -> io::Result<Self> {
        let parent = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(contents)?;
        temp.as_file().sync_all()?;
        Ok(Self {
            temp,
            path: path.to_path_buf(),
        })
    }

    /// Destination of the staged contents.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temporary file over the destination.
    pub(crate) fn commit(self) -> io::Result<()> {
        self.temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Write `contents` to `path` so readers see either the old or the new file.
///
/// Parent directories are created as needed. The data goes to a temporary
/// file in the same directory, which is then renamed over `path`.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be created or the file cannot
/// be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    StagedFile::stage(path, contents)?.commit()
}

/// Remove the HTML for `route`, and its directory if that leaves it empty.
///
/// # Errors
///
/// Returns an I/O error other than `NotFound`.
pub fn remove_route(dest_dir: &Path, route: &str) -> io::Result<()> {
    let path = route_to_path(dest_dir, route);
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    }
    if let Some(dir) = path.parent()
        && dir != dest_dir
    {
        // Fails when other files remain, which is fine.
        let _ = std::fs::remove_dir(dir);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_route_to_path() {
        let dest = Path::new("/out");
        assert_eq!(route_to_path(dest, "/"), PathBuf::from("/out/index.html"));
        assert_eq!(route_to_path(dest, "/cli/"), PathBuf::from("/out/cli/index.html"));
        assert_eq!(
            route_to_path(dest, "/guide/install/"),
            PathBuf::from("/out/guide/install/index.html")
        );
    }

    #[test]
    fn test_asset_to_path() {
        let dest = Path::new("/out");
        assert_eq!(
            asset_to_path(dest, "assets/js/app.js"),
            Some(PathBuf::from("/out/assets/js/app.js"))
        );
        assert_eq!(
            asset_to_path(dest, "./a.css"),
            Some(PathBuf::from("/out/a.css"))
        );
        assert_eq!(asset_to_path(dest, "../escape.js"), None);
        assert_eq!(asset_to_path(dest, "assets/../../x"), None);
        assert_eq!(asset_to_path(dest, "/etc/passwd"), None);
        assert_eq!(asset_to_path(dest, ""), None);
    }

    #[test]
    fn test_write_atomic_creates_dirs_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/index.html");

        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1, "temporary file left behind");
    }

    #[test]
    fn test_dropped_stage_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli/index.html");
        write_atomic(&path, b"old").unwrap();

        let staged = StagedFile::stage(&path, b"new").unwrap();
        assert_eq!(staged.path(), path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        drop(staged);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        let entries = std::fs::read_dir(dir.path().join("cli")).unwrap().count();
        assert_eq!(entries, 1, "temporary file left behind");
    }

    #[test]
    fn test_remove_route() {
        let dir = tempfile::tempdir().unwrap();
        let path = route_to_path(dir.path(), "/old/");
        write_atomic(&path, b"x").unwrap();

        remove_route(dir.path(), "/old/").unwrap();
        remove_route(dir.path(), "/never/").unwrap();

        assert!(!path.exists());
        assert!(!dir.path().join("old").exists());
    }
}
