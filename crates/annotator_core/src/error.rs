//! Error taxonomy shared by the loader, the store and the session.

use std::io;
use std::path::{Path, PathBuf};

pub type Result<T, E = AnnotatorError> = std::result::Result<T, E>;

/// Every failure a user action can run into. None of them is fatal: the
/// shell reports the error and the session keeps its previous state.
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error("action cancelled")]
    UserCancelled,

    #[error("no image folder selected")]
    NoFolderSelected,

    #[error("no JPG images found in {}", path.display())]
    NoImagesFound { path: PathBuf },

    #[error("no permission to write to {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a valid annotations file: {reason}", path.display())]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("annotations belong to folder '{found}', not to '{expected}'")]
    FolderMismatch { expected: String, found: String },

    #[error("the current image is only partially annotated")]
    IncompleteAnnotation,

    #[error("category {index} is out of range for scale '{scale}' ({len} categories)")]
    CategoryOutOfRange {
        scale: String,
        index: usize,
        len: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl AnnotatorError {
    /// Maps an I/O failure on `path`, splitting out permission problems.
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::PermissionDenied {
            AnnotatorError::PermissionDenied { path }
        } else {
            AnnotatorError::Io { path, source }
        }
    }

    /// Maps a csv failure, unwrapping the I/O errors csv wraps.
    pub fn from_csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if let csv::ErrorKind::Io(err) = source.kind() {
            return Self::from_io(path, io::Error::new(err.kind(), err.to_string()));
        }
        AnnotatorError::Csv { path, source }
    }

    pub(crate) fn invalid(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        AnnotatorError::InvalidFormat {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Short title for a notice dialog.
    pub fn title(&self) -> &'static str {
        match self {
            AnnotatorError::UserCancelled => "Cancelled",
            AnnotatorError::NoFolderSelected => "No Image Folder",
            AnnotatorError::NoImagesFound { .. } => "No Images",
            AnnotatorError::PermissionDenied { .. } => "Permission Error",
            AnnotatorError::Io { .. } => "File Error",
            AnnotatorError::InvalidFormat { .. } | AnnotatorError::Csv { .. } => {
                "Invalid Annotations File"
            }
            AnnotatorError::FolderMismatch { .. } => "Wrong Annotations File",
            AnnotatorError::IncompleteAnnotation => "Colors not selected",
            AnnotatorError::CategoryOutOfRange { .. } => "Invalid Category",
            AnnotatorError::Config(_) => "Configuration Error",
        }
    }

    /// Cancellation is not worth a dialog.
    pub fn is_silent(&self) -> bool {
        matches!(self, AnnotatorError::UserCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_split_out() {
        let err = AnnotatorError::from_io(
            "/tmp/x.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, AnnotatorError::PermissionDenied { .. }));

        let err = AnnotatorError::from_io("/tmp/x.csv", io::Error::other("disk on fire"));
        assert!(matches!(err, AnnotatorError::Io { .. }));
    }

    #[test]
    fn folder_mismatch_names_both_folders() {
        let err = AnnotatorError::FolderMismatch {
            expected: "batch_a".into(),
            found: "batch_b".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("batch_a"));
        assert!(msg.contains("batch_b"));
        assert_eq!(err.title(), "Wrong Annotations File");
    }
}
