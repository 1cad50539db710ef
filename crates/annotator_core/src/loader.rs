use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{AnnotatorError, Result};

/// File name of one image inside the loaded folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageEntry(pub String);

impl ImageEntry {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// The images of one folder, in the order they are shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFolder {
    path: PathBuf,
    folder_name: String,
    entries: Vec<ImageEntry>,
}

impl ImageFolder {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Basename of the folder, the value of the `folder_name` CSV column.
    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(ImageEntry::name)
    }

    pub fn path_of(&self, index: usize) -> Option<PathBuf> {
        self.name_of(index).map(|name| self.path.join(name))
    }
}

/// Lists the `.jpg` files (any case) directly inside `path`, sorted by name.
pub fn scan_image_folder(path: impl AsRef<Path>) -> Result<ImageFolder> {
    let root = path.as_ref();
    if root.as_os_str().is_empty() {
        return Err(AnnotatorError::NoFolderSelected);
    }
    if !root.is_dir() {
        return Err(AnnotatorError::from_io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!("skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if is_jpg(name) {
            entries.push(ImageEntry(name.to_string()));
        }
    }

    if entries.is_empty() {
        return Err(AnnotatorError::NoImagesFound {
            path: root.to_path_buf(),
        });
    }
    entries.sort();

    let folder_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned());
    tracing::info!("loaded {} images from {}", entries.len(), root.display());

    Ok(ImageFolder {
        path: root.to_path_buf(),
        folder_name,
        entries,
    })
}

fn is_jpg(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn lists_only_top_level_jpgs_sorted() -> Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("c.jpg"))?;
        File::create(dir.path().join("A.JPG"))?;
        File::create(dir.path().join("b.Jpg"))?;
        File::create(dir.path().join("d.jpeg"))?;
        File::create(dir.path().join("e.png"))?;
        File::create(dir.path().join("notes.txt"))?;
        fs::create_dir(dir.path().join("nested.jpg"))?;
        File::create(dir.path().join("nested.jpg").join("f.jpg"))?;

        let folder = scan_image_folder(dir.path())?;
        let names: Vec<&str> = folder.entries().iter().map(ImageEntry::name).collect();
        assert_eq!(names, vec!["A.JPG", "b.Jpg", "c.jpg"]);
        assert_eq!(folder.path_of(2), Some(dir.path().join("c.jpg")));
        assert_eq!(folder.name_of(3), None);
        Ok(())
    }

    #[test]
    fn folder_name_is_the_basename() -> Result<()> {
        let dir = tempdir()?;
        let batch = dir.path().join("batch_07");
        fs::create_dir(&batch)?;
        File::create(batch.join("x.jpg"))?;
        assert_eq!(scan_image_folder(&batch)?.folder_name(), "batch_07");
        Ok(())
    }

    #[test]
    fn empty_folder_reports_no_images() -> Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("readme.md"))?;
        let err = scan_image_folder(dir.path()).unwrap_err();
        assert!(matches!(err, AnnotatorError::NoImagesFound { .. }));
        Ok(())
    }

    #[test]
    fn empty_path_means_nothing_selected() {
        let err = scan_image_folder("").unwrap_err();
        assert!(matches!(err, AnnotatorError::NoFolderSelected));
    }

    #[test]
    fn missing_folder_is_an_io_error() -> Result<()> {
        let dir = tempdir()?;
        let err = scan_image_folder(dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, AnnotatorError::Io { .. }));
        Ok(())
    }
}
