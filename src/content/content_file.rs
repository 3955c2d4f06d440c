use std::{fs, io};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::post_list::BUNDLE_INDEX;

/// One physical source file, read whole.
pub struct ContentFile {
    pub slug: String,
    pub file_path: PathBuf,
    pub raw_content: String,
}

impl ContentFile {
    pub fn from_file(file_path: PathBuf) -> io::Result<ContentFile> {
        let raw_content = fs::read_to_string(&file_path)?;
        Self::from_string(file_path, raw_content)
    }

    pub fn from_string(file_path: PathBuf, raw_content: String) -> io::Result<ContentFile> {
        let slug = Self::slug_from_path(&file_path)?;
        Ok(ContentFile {
            slug,
            file_path,
            raw_content,
        })
    }

    /// `posts/my-post.md` is `my-post`; a bundle `posts/my-post/index.md` is
    /// also `my-post`.
    pub fn slug_from_path(path: &Path) -> io::Result<String> {
        let invalid = || io::Error::new(ErrorKind::InvalidInput, format!("Invalid post path {}", path.display()));

        let file_name = path.file_name().and_then(|f| f.to_str()).ok_or_else(invalid)?;
        if file_name == BUNDLE_INDEX {
            let dir = path.parent()
                .and_then(|p| p.file_name())
                .and_then(|d| d.to_str())
                .ok_or_else(invalid)?;
            return Ok(dir.to_string());
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
        Ok(stem.to_string())
    }
}
