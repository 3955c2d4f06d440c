use std::{fs, io};
use std::path::{Path, PathBuf};

use spdlog::debug;

pub const BUNDLE_INDEX: &str = "index.md";
/// Hugo section page (the list page of a directory); not a post.
pub const SECTION_INDEX: &str = "_index.md";

/// Finds post sources under a posts directory: `*.md` files and page
/// bundles, i.e. directories holding an `index.md`.
pub struct PostList {
    pub root_dir: PathBuf,
}

impl PostList {
    pub fn new(root_dir: &Path) -> PostList {
        PostList { root_dir: root_dir.to_path_buf() }
    }

    /// All sources, sorted by path so runs are reproducible.
    pub fn retrieve_all(&self) -> io::Result<Vec<PathBuf>> {
        let mut posts = self.retrieve_files()?;
        posts.extend(self.retrieve_bundles()?);
        posts.sort();
        debug!("Found {} post sources in {}", posts.len(), self.root_dir.display());
        Ok(posts)
    }

    pub fn retrieve_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut posts = vec![];
        let entries = fs::read_dir(self.root_dir.as_path())?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if entry.file_name() == SECTION_INDEX {
                debug!("Skipping section page {}", path.display());
                continue;
            }
            if Self::is_markdown(&path) {
                posts.push(path);
            }
        }
        Ok(posts)
    }

    pub fn retrieve_bundles(&self) -> io::Result<Vec<PathBuf>> {
        let dirs = Self::list_dirs(self.root_dir.as_path())?;
        let bundles = dirs.into_iter()
            .map(|dir| dir.join(BUNDLE_INDEX))
            .filter(|index| index.is_file())
            .collect();
        Ok(bundles)
    }

    fn list_dirs(posts_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs: Vec<PathBuf> = vec![];
        let entries = fs::read_dir(posts_dir)?;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }

    fn is_markdown(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
    }
}
