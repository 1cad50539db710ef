//! Exclusive single-choice pickers, one per active scale.

use crate::error::{AnnotatorError, Result};
use crate::scale::{InputKey, LabelScale};
use crate::store::AnnotationRecord;

/// Tracks at most one selected category of a [`LabelScale`].
///
/// The shell redraws purely from [`LabelPicker::selected_index`], so every
/// method leaves the picker in a state that fully describes the highlight.
#[derive(Debug, Clone)]
pub struct LabelPicker {
    scale: LabelScale,
    selected: Option<usize>,
}

impl LabelPicker {
    pub fn new(scale: LabelScale) -> Self {
        Self {
            scale,
            selected: None,
        }
    }

    pub fn scale(&self) -> &LabelScale {
        &self.scale
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }

    /// Pointer click. Clicking the current selection clears it. Returns
    /// whether the state changed.
    pub fn click(&mut self, index: usize) -> bool {
        if index >= self.scale.len() {
            return false;
        }
        self.selected = if self.selected == Some(index) {
            None
        } else {
            Some(index)
        };
        true
    }

    /// Selects the category bound to `key`. Returns `false` when the key is
    /// not bound in this scale so the caller can offer it elsewhere.
    pub fn key_press(&mut self, key: InputKey) -> bool {
        match self.scale.index_for_key(key) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    /// Exclusive select without toggling, used when restoring saved labels.
    pub fn force_select(&mut self, index: usize) -> Result<()> {
        if index >= self.scale.len() {
            return Err(AnnotatorError::CategoryOutOfRange {
                scale: self.scale.key.clone(),
                index,
                len: self.scale.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.selected = None;
    }

    pub fn selected_color(&self) -> Option<&str> {
        self.selected.and_then(|i| self.scale.color_of(i))
    }
}

/// The pickers of every active scale, in key-priority order.
#[derive(Debug, Clone)]
pub struct PickerSet {
    pickers: Vec<LabelPicker>,
}

impl PickerSet {
    pub fn new(scales: impl IntoIterator<Item = LabelScale>) -> Self {
        Self {
            pickers: scales.into_iter().map(LabelPicker::new).collect(),
        }
    }

    pub fn pickers(&self) -> &[LabelPicker] {
        &self.pickers
    }

    pub fn get_mut(&mut self, scale: usize) -> Option<&mut LabelPicker> {
        self.pickers.get_mut(scale)
    }

    pub fn scales(&self) -> impl Iterator<Item = &LabelScale> {
        self.pickers.iter().map(LabelPicker::scale)
    }

    pub fn len(&self) -> usize {
        self.pickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickers.is_empty()
    }

    /// Offers `key` to each picker in order; the first that binds it wins.
    pub fn key_press(&mut self, key: InputKey) -> Option<usize> {
        self.pickers
            .iter_mut()
            .position(|picker| picker.key_press(key))
    }

    /// An annotation counts only when every scale has a selection.
    pub fn is_complete(&self) -> bool {
        !self.pickers.is_empty() && self.pickers.iter().all(LabelPicker::is_selected)
    }

    /// Nothing selected on any scale.
    pub fn is_untouched(&self) -> bool {
        self.pickers.iter().all(|p| !p.is_selected())
    }

    /// All selected indices, or `None` while incomplete.
    pub fn selections(&self) -> Option<Vec<usize>> {
        self.pickers.iter().map(LabelPicker::selected_index).collect()
    }

    pub fn reset_all(&mut self) {
        self.pickers.iter_mut().for_each(LabelPicker::reset);
    }

    /// Loads a stored annotation. On any mismatch all pickers are cleared so
    /// no half-restored state is shown.
    pub fn restore(&mut self, record: &AnnotationRecord) -> Result<()> {
        if record.labels.len() != self.pickers.len() {
            self.reset_all();
            return Err(AnnotatorError::Config(format!(
                "record for {} has {} labels, expected {}",
                record.image_name,
                record.labels.len(),
                self.pickers.len()
            )));
        }
        for (picker, label) in self.pickers.iter_mut().zip(&record.labels) {
            if let Err(err) = picker.force_select(label.index) {
                self.reset_all();
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Category;
    use crate::store::Label;

    fn scale(key: &str, len: usize, keys: &str) -> LabelScale {
        let categories = (0..len)
            .map(|i| Category {
                name: format!("{i}"),
                color: format!("#0000{i:02}"),
                key: keys.chars().nth(i).map(InputKey::Letter),
            })
            .collect();
        LabelScale::new(key, key, categories)
    }

    #[test]
    fn click_is_exclusive_and_toggles() {
        let mut picker = LabelPicker::new(scale("a", 3, ""));
        assert!(picker.click(1));
        assert_eq!(picker.selected_index(), Some(1));
        assert!(picker.click(2));
        assert_eq!(picker.selected_index(), Some(2));
        assert!(picker.click(2));
        assert_eq!(picker.selected_index(), None);
    }

    #[test]
    fn out_of_range_click_is_ignored() {
        let mut picker = LabelPicker::new(scale("a", 2, ""));
        picker.click(0);
        assert!(!picker.click(5));
        assert_eq!(picker.selected_index(), Some(0));
    }

    #[test]
    fn key_press_selects_without_toggling() {
        let mut picker = LabelPicker::new(scale("a", 3, "ABC"));
        assert!(picker.key_press(InputKey::Letter('B')));
        assert!(picker.key_press(InputKey::Letter('B')));
        assert_eq!(picker.selected_index(), Some(1));
        assert!(!picker.key_press(InputKey::Letter('Z')));
        assert_eq!(picker.selected_index(), Some(1));
    }

    #[test]
    fn force_select_rejects_out_of_range() {
        let mut picker = LabelPicker::new(scale("a", 2, ""));
        picker.force_select(1).unwrap();
        picker.force_select(1).unwrap();
        assert_eq!(picker.selected_index(), Some(1));
        let err = picker.force_select(2).unwrap_err();
        assert!(matches!(err, AnnotatorError::CategoryOutOfRange { index: 2, len: 2, .. }));
        assert_eq!(picker.selected_index(), Some(1));
        picker.reset();
        assert_eq!(picker.selected_index(), None);
    }

    #[test]
    fn set_routes_keys_in_priority_order() {
        let mut set = PickerSet::new([scale("a", 2, "AB"), scale("b", 3, "BCD")]);
        // 'B' is bound in both; the first picker takes it.
        assert_eq!(set.key_press(InputKey::Letter('B')), Some(0));
        assert_eq!(set.key_press(InputKey::Letter('D')), Some(1));
        assert_eq!(set.key_press(InputKey::ArrowRight), None);
        assert_eq!(set.selections(), Some(vec![1, 2]));
    }

    #[test]
    fn completeness_requires_every_scale() {
        let mut set = PickerSet::new([scale("a", 2, ""), scale("b", 3, "")]);
        assert!(set.is_untouched());
        set.get_mut(0).unwrap().click(1);
        assert!(!set.is_complete());
        assert!(!set.is_untouched());
        assert_eq!(set.selections(), None);
        set.get_mut(1).unwrap().click(0);
        assert!(set.is_complete());
        set.reset_all();
        assert!(set.is_untouched());
    }

    #[test]
    fn restore_clears_everything_on_bad_record() {
        let mut set = PickerSet::new([scale("a", 2, ""), scale("b", 3, "")]);
        let record = AnnotationRecord {
            folder_name: "f".into(),
            image_name: "x.jpg".into(),
            labels: vec![
                Label { index: 1, color: "#000001".into() },
                Label { index: 7, color: "#000007".into() },
            ],
        };
        assert!(set.restore(&record).is_err());
        assert!(set.is_untouched());
    }
}
