//! Core of the skin-tone annotator: image folder listing, label pickers,
//! the CSV annotation store and the navigation session that ties them
//! together. Nothing in here depends on a GUI toolkit.

pub mod config;
pub mod error;
pub mod loader;
pub mod picker;
pub mod scale;
pub mod session;
pub mod store;

pub use config::{AnnotatorConfig, LogLevel, NavigationKeys, ScaleConfig};
pub use error::{AnnotatorError, Result};
pub use loader::{ImageEntry, ImageFolder, scan_image_folder};
pub use picker::{LabelPicker, PickerSet};
pub use scale::{Category, InputKey, LabelScale, Rgb, default_scales};
pub use session::{
    Direction, IncompletePolicy, KeyOutcome, NavState, NavigationOutcome, SessionState,
};
pub use store::{
    AnnotationRecord, AnnotationStore, Label, UpsertOutcome, default_file_name,
    with_csv_extension,
};
