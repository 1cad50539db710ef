//! Navigation controller: the single owner of everything a session mutates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{AnnotatorConfig, NavigationKeys};
use crate::error::{AnnotatorError, Result};
use crate::loader::{ImageFolder, scan_image_folder};
use crate::picker::PickerSet;
use crate::scale::{InputKey, LabelScale};
use crate::store::{AnnotationRecord, AnnotationStore, UpsertOutcome};

/// What happens to a partially labelled image when the user navigates away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompletePolicy {
    /// Discard it and move on.
    #[default]
    Drop,
    /// Discard it, move on, and flag it in the outcome.
    Warn,
    /// Refuse to move.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Empty,
    Viewing { folder: ImageFolder, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    pub index: usize,
    pub image_name: String,
    pub image_path: PathBuf,
    /// The image we left was written to the annotations file.
    pub saved_previous: bool,
    /// The image we left had a partial annotation that was discarded.
    pub dropped_incomplete: bool,
    /// The new image had a stored annotation, now shown in the pickers.
    pub restored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A picker took the key; carries the picker's position.
    Picked(usize),
    Navigated(NavigationOutcome),
    Ignored,
}

/// Explicit session state: loaded folder and cursor, pickers and store.
#[derive(Debug, Clone)]
pub struct SessionState {
    nav: NavState,
    pickers: PickerSet,
    store: AnnotationStore,
    policy: IncompletePolicy,
    keys: NavigationKeys,
}

impl SessionState {
    pub fn new(scales: Vec<LabelScale>, policy: IncompletePolicy) -> Self {
        Self {
            nav: NavState::Empty,
            pickers: PickerSet::new(scales.clone()),
            store: AnnotationStore::unbound(scales),
            policy,
            keys: NavigationKeys::default(),
        }
    }

    pub fn from_config(config: &AnnotatorConfig) -> Result<Self> {
        let mut session = Self::new(config.label_scales()?, config.incomplete_policy);
        session.keys = config.navigation;
        Ok(session)
    }

    pub fn nav_state(&self) -> &NavState {
        &self.nav
    }

    pub fn pickers(&self) -> &PickerSet {
        &self.pickers
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn policy(&self) -> IncompletePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: IncompletePolicy) {
        self.policy = policy;
    }

    pub fn navigation_keys(&self) -> NavigationKeys {
        self.keys
    }

    pub fn folder(&self) -> Option<&ImageFolder> {
        match &self.nav {
            NavState::Empty => None,
            NavState::Viewing { folder, .. } => Some(folder),
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        match &self.nav {
            NavState::Empty => None,
            NavState::Viewing { index, .. } => Some(*index),
        }
    }

    pub fn current_image(&self) -> Option<&str> {
        match &self.nav {
            NavState::Empty => None,
            NavState::Viewing { folder, index } => folder.name_of(*index),
        }
    }

    pub fn current_image_path(&self) -> Option<PathBuf> {
        match &self.nav {
            NavState::Empty => None,
            NavState::Viewing { folder, index } => folder.path_of(*index),
        }
    }

    /// `"Image 3 of 10: name.jpg"`, or `None` with no folder loaded.
    pub fn position_label(&self) -> Option<String> {
        match &self.nav {
            NavState::Empty => None,
            NavState::Viewing { folder, index } => Some(format!(
                "Image {} of {}: {}",
                index + 1,
                folder.len(),
                folder.name_of(*index).unwrap_or_default()
            )),
        }
    }

    /// Opens a folder and shows its first image. The previous state is kept
    /// when the folder can't be used.
    pub fn load_folder(&mut self, path: impl AsRef<Path>) -> Result<&str> {
        let folder = scan_image_folder(path)?;

        let stale = match self.folder() {
            Some(old) => old.folder_name() != folder.folder_name(),
            None => true,
        };
        if stale && self.store.is_bound() {
            tracing::warn!(
                "annotations file does not belong to '{}', closing it",
                folder.folder_name()
            );
            self.store.unbind();
        }

        self.nav = NavState::Viewing { folder, index: 0 };
        self.restore_current();
        Ok(self.current_image().unwrap_or_default())
    }

    /// Starts a fresh annotations file for the loaded folder.
    pub fn create_store(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        if self.folder().is_none() {
            return Err(AnnotatorError::NoFolderSelected);
        }
        let scales: Vec<LabelScale> = self.pickers.scales().cloned().collect();
        self.store = AnnotationStore::create(path, scales)?;
        let path = self.store.path().map(Path::to_path_buf).unwrap_or_default();
        Ok(path)
    }

    /// Opens an existing annotations file for the loaded folder and shows the
    /// current image's stored labels, if any.
    pub fn open_store(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let Some(folder_name) = self.folder().map(|f| f.folder_name().to_string()) else {
            return Err(AnnotatorError::NoFolderSelected);
        };
        let scales: Vec<LabelScale> = self.pickers.scales().cloned().collect();
        self.store = AnnotationStore::open(path, &folder_name, scales)?;
        self.restore_current();
        Ok(self.store.len())
    }

    /// Pointer click on a category swatch.
    pub fn click(&mut self, scale: usize, category: usize) -> bool {
        self.pickers
            .get_mut(scale)
            .is_some_and(|picker| picker.click(category))
    }

    /// Pickers get the key first, in order; then the navigation bindings.
    pub fn handle_key(&mut self, key: InputKey) -> Result<KeyOutcome> {
        if let Some(picker) = self.pickers.key_press(key) {
            return Ok(KeyOutcome::Picked(picker));
        }
        if key == self.keys.next {
            return self.advance().map(KeyOutcome::Navigated);
        }
        if key == self.keys.previous {
            return self.retreat().map(KeyOutcome::Navigated);
        }
        Ok(KeyOutcome::Ignored)
    }

    /// Writes the current image's annotation when complete.
    pub fn save_current(&mut self) -> Result<UpsertOutcome> {
        let Some(record) = self.current_record()? else {
            return Ok(UpsertOutcome::Skipped);
        };
        self.store.upsert(record)
    }

    pub fn advance(&mut self) -> Result<NavigationOutcome> {
        self.step(Direction::Forward)
    }

    pub fn retreat(&mut self) -> Result<NavigationOutcome> {
        self.step(Direction::Backward)
    }

    fn step(&mut self, direction: Direction) -> Result<NavigationOutcome> {
        let (len, index) = match &self.nav {
            NavState::Empty => return Err(AnnotatorError::NoFolderSelected),
            NavState::Viewing { folder, index } => (folder.len(), *index),
        };

        let partial = !self.pickers.is_complete() && !self.pickers.is_untouched();
        if partial && self.policy == IncompletePolicy::Block {
            return Err(AnnotatorError::IncompleteAnnotation);
        }
        let saved_previous = self.save_current()? == UpsertOutcome::Written;
        if partial {
            tracing::debug!(
                "dropping partial annotation for {}",
                self.current_image().unwrap_or_default()
            );
        }

        let next = match direction {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => (index + len - 1) % len,
        };
        if let NavState::Viewing { index, .. } = &mut self.nav {
            *index = next;
        }
        let restored = self.restore_current();

        Ok(NavigationOutcome {
            index: next,
            image_name: self.current_image().unwrap_or_default().to_string(),
            image_path: self.current_image_path().unwrap_or_default(),
            saved_previous,
            dropped_incomplete: partial && self.policy == IncompletePolicy::Warn,
            restored,
        })
    }

    fn current_record(&self) -> Result<Option<AnnotationRecord>> {
        let (Some(folder), Some(image)) = (self.folder(), self.current_image()) else {
            return Ok(None);
        };
        let Some(indices) = self.pickers.selections() else {
            return Ok(None);
        };
        if indices.is_empty() {
            return Ok(None);
        }
        AnnotationRecord::from_selections(
            folder.folder_name(),
            image,
            self.pickers.scales(),
            &indices,
        )
        .map(Some)
    }

    /// Shows the stored annotation of the current image, or clears the
    /// pickers. Returns whether something was restored.
    fn restore_current(&mut self) -> bool {
        let record = self
            .current_image()
            .and_then(|name| self.store.lookup(name))
            .cloned();
        match record {
            Some(record) => match self.pickers.restore(&record) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!("could not restore {}: {err}", record.image_name);
                    false
                }
            },
            None => {
                self.pickers.reset_all();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::default_scales;
    use anyhow::Result;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::{TempDir, tempdir};

    fn folder_with(names: &[&str]) -> Result<TempDir> {
        let dir = tempdir()?;
        for name in names {
            File::create(dir.path().join(name))?;
        }
        Ok(dir)
    }

    #[test]
    fn empty_session_cannot_navigate() {
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        assert!(matches!(session.advance(), Err(AnnotatorError::NoFolderSelected)));
        assert!(matches!(session.retreat(), Err(AnnotatorError::NoFolderSelected)));
        assert_eq!(session.position_label(), None);
    }

    #[test]
    fn failed_load_keeps_previous_folder() -> Result<()> {
        let good = folder_with(&["a.jpg", "b.jpg"])?;
        let empty = folder_with(&["notes.txt"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        session.load_folder(good.path())?;
        session.advance()?;

        assert!(session.load_folder(empty.path()).is_err());
        assert_eq!(session.current_image(), Some("b.jpg"));
        Ok(())
    }

    #[rstest]
    #[case(1, 0)]
    #[case(3, 0)]
    #[case(3, 2)]
    #[case(5, 4)]
    fn advance_then_retreat_is_identity(#[case] len: usize, #[case] start: usize) -> Result<()> {
        let names: Vec<String> = (0..len).map(|i| format!("{i:03}.jpg")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = folder_with(&refs)?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        session.load_folder(dir.path())?;
        for _ in 0..start {
            session.advance()?;
        }
        assert_eq!(session.current_index(), Some(start));
        session.advance()?;
        session.retreat()?;
        assert_eq!(session.current_index(), Some(start));
        session.retreat()?;
        session.advance()?;
        assert_eq!(session.current_index(), Some(start));
        Ok(())
    }

    #[test]
    fn retreat_from_first_wraps_to_last() -> Result<()> {
        let dir = folder_with(&["a.jpg", "b.jpg", "c.jpg"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        session.load_folder(dir.path())?;
        let outcome = session.retreat()?;
        assert_eq!(outcome.index, 2);
        assert_eq!(outcome.image_name, "c.jpg");
        assert_eq!(outcome.image_path, dir.path().join("c.jpg"));
        assert_eq!(session.position_label().as_deref(), Some("Image 3 of 3: c.jpg"));
        Ok(())
    }

    #[test]
    fn warn_policy_flags_partial_annotation() -> Result<()> {
        let dir = folder_with(&["a.jpg", "b.jpg"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Warn);
        session.load_folder(dir.path())?;
        session.create_store(dir.path().join("out.csv"))?;

        let untouched = session.advance()?;
        assert!(!untouched.dropped_incomplete);

        session.click(0, 3);
        let outcome = session.advance()?;
        assert!(outcome.dropped_incomplete);
        assert!(!outcome.saved_previous);
        assert_eq!(session.current_image(), Some("a.jpg"));
        assert!(session.store().is_empty());
        Ok(())
    }

    #[test]
    fn block_policy_keeps_cursor() -> Result<()> {
        let dir = folder_with(&["a.jpg", "b.jpg"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Block);
        session.load_folder(dir.path())?;
        session.click(1, 2);
        assert!(matches!(session.advance(), Err(AnnotatorError::IncompleteAnnotation)));
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.pickers().pickers()[1].selected_index(), Some(2));
        Ok(())
    }

    #[test]
    fn keys_go_to_pickers_before_navigation() -> Result<()> {
        let dir = folder_with(&["a.jpg", "b.jpg"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        session.load_folder(dir.path())?;

        assert_eq!(session.handle_key(InputKey::Digit(4))?, KeyOutcome::Picked(0));
        assert_eq!(session.handle_key(InputKey::Letter('E'))?, KeyOutcome::Picked(1));
        assert_eq!(session.handle_key(InputKey::Escape)?, KeyOutcome::Ignored);
        match session.handle_key(InputKey::ArrowRight)? {
            KeyOutcome::Navigated(outcome) => {
                assert_eq!(outcome.image_name, "b.jpg");
                assert!(!outcome.saved_previous, "no file bound yet");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn store_needs_a_folder() -> Result<()> {
        let dir = tempdir()?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        assert!(matches!(
            session.create_store(dir.path().join("a.csv")),
            Err(AnnotatorError::NoFolderSelected)
        ));
        assert!(matches!(
            session.open_store(dir.path().join("a.csv")),
            Err(AnnotatorError::NoFolderSelected)
        ));
        Ok(())
    }

    #[test]
    fn loading_another_folder_closes_the_store() -> Result<()> {
        let first = folder_with(&["a.jpg"])?;
        let second = folder_with(&["b.jpg"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        session.load_folder(first.path())?;
        session.create_store(first.path().join("out.csv"))?;
        assert!(session.store().is_bound());

        session.load_folder(second.path())?;
        assert!(!session.store().is_bound());
        Ok(())
    }

    #[test]
    fn explicit_save_writes_current_image() -> Result<()> {
        let dir = folder_with(&["a.jpg", "b.jpg"])?;
        let mut session = SessionState::new(default_scales(), IncompletePolicy::Drop);
        session.load_folder(dir.path())?;
        session.create_store(dir.path().join("out.csv"))?;

        assert_eq!(session.save_current()?, UpsertOutcome::Skipped);
        session.click(0, 1);
        session.click(1, 1);
        assert_eq!(session.save_current()?, UpsertOutcome::Written);
        assert_eq!(
            session.store().lookup("a.jpg").map(AnnotationRecord::indices),
            Some(vec![1, 1])
        );
        Ok(())
    }
}
