//! CSV-backed annotation table, rewritten in full after every change.
//!
//! Header layout, with the built-in scales:
//! `folder_name,image_name,monk_skin_tone_index,monk_skin_tone_color,fitzpatrick_index,fitzpatrick_color`

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{AnnotatorError, Result};
use crate::scale::LabelScale;

pub const FOLDER_COLUMN: &str = "folder_name";
pub const IMAGE_COLUMN: &str = "image_name";

/// One scale's choice: the zero-based index and its color, stored
/// redundantly for people reading the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub index: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub folder_name: String,
    pub image_name: String,
    /// One label per scale, in scale order.
    pub labels: Vec<Label>,
}

impl AnnotationRecord {
    /// Builds a record from one selected index per scale.
    pub fn from_selections<'a>(
        folder_name: impl Into<String>,
        image_name: impl Into<String>,
        scales: impl IntoIterator<Item = &'a LabelScale>,
        indices: &[usize],
    ) -> Result<Self> {
        let scales: Vec<&LabelScale> = scales.into_iter().collect();
        if scales.len() != indices.len() {
            return Err(AnnotatorError::Config(format!(
                "{} selections for {} scales",
                indices.len(),
                scales.len()
            )));
        }
        let labels = scales
            .iter()
            .zip(indices)
            .map(|(scale, &index)| {
                scale
                    .color_of(index)
                    .map(|color| Label {
                        index,
                        color: color.to_string(),
                    })
                    .ok_or_else(|| AnnotatorError::CategoryOutOfRange {
                        scale: scale.key.clone(),
                        index,
                        len: scale.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            folder_name: folder_name.into(),
            image_name: image_name.into(),
            labels,
        })
    }

    pub fn indices(&self) -> Vec<usize> {
        self.labels.iter().map(|l| l.index).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The table changed and the file was rewritten.
    Written,
    /// No file is bound; nothing happened.
    Skipped,
}

/// Suggested file name for a folder's annotations.
pub fn default_file_name(folder_name: &str) -> String {
    format!("{folder_name}_annotations.csv")
}

/// Appends `.csv` unless the path already ends with it (any case).
pub fn with_csv_extension(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if has_ext {
        path.to_path_buf()
    } else {
        let mut os = path.as_os_str().to_owned();
        os.push(".csv");
        PathBuf::from(os)
    }
}

#[derive(Debug, Clone)]
pub struct AnnotationStore {
    scales: Vec<LabelScale>,
    path: Option<PathBuf>,
    records: Vec<AnnotationRecord>,
}

impl AnnotationStore {
    /// An empty store with no file behind it. Upserts are ignored.
    pub fn unbound(scales: Vec<LabelScale>) -> Self {
        Self {
            scales,
            path: None,
            records: Vec::new(),
        }
    }

    /// Creates (or truncates) the file at `path` with just the header.
    ///
    /// On failure nothing is left behind and no store is returned.
    pub fn create(path: impl AsRef<Path>, scales: Vec<LabelScale>) -> Result<Self> {
        let path = with_csv_extension(path);
        let existed = path.exists();
        // Touch the target first so a new file gets the usual permissions.
        fs::File::create(&path).map_err(|e| AnnotatorError::from_io(&path, e))?;
        let store = Self {
            scales,
            path: Some(path.clone()),
            records: Vec::new(),
        };
        if let Err(err) = store.write_to(&path, &store.records) {
            if !existed {
                let _ = fs::remove_file(&path);
            }
            return Err(err);
        }
        tracing::info!("created annotations file {}", path.display());
        Ok(store)
    }

    /// Loads every row of `path`, refusing the whole file if any row belongs
    /// to a folder other than `expected_folder_name`.
    pub fn open(
        path: impl AsRef<Path>,
        expected_folder_name: &str,
        scales: Vec<LabelScale>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| AnnotatorError::from_io(path, e))?;
        let mut store = Self {
            scales,
            path: Some(path.to_path_buf()),
            records: Vec::new(),
        };
        if meta.len() == 0 {
            tracing::info!("opened empty annotations file {}", path.display());
            return Ok(store);
        }

        // Names are kept verbatim; only headers and indices are trimmed.
        let mut rdr = csv::ReaderBuilder::new()
            .from_path(path)
            .map_err(|e| AnnotatorError::from_csv(path, e))?;
        let headers = rdr
            .headers()
            .map_err(|e| AnnotatorError::from_csv(path, e))?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            column(name).ok_or_else(|| AnnotatorError::invalid(path, format!("missing column '{name}'")))
        };

        let folder_col = required(FOLDER_COLUMN)?;
        let image_col = required(IMAGE_COLUMN)?;
        let scale_cols = store
            .scales
            .iter()
            .map(|scale| Ok((required(&scale.index_column())?, column(&scale.color_column()))))
            .collect::<Result<Vec<_>>>()?;

        for (row, result) in rdr.records().enumerate() {
            let line = row + 2;
            let rec = result.map_err(|e| AnnotatorError::from_csv(path, e))?;
            let field = |col: usize| rec.get(col).unwrap_or("");

            let folder_name = field(folder_col);
            if folder_name != expected_folder_name {
                return Err(AnnotatorError::FolderMismatch {
                    expected: expected_folder_name.to_string(),
                    found: folder_name.to_string(),
                });
            }
            let image_name = field(image_col);
            if image_name.is_empty() {
                return Err(AnnotatorError::invalid(path, format!("line {line}: empty image_name")));
            }

            let mut labels = Vec::with_capacity(store.scales.len());
            for (scale, &(index_col, color_col)) in store.scales.iter().zip(&scale_cols) {
                let raw = field(index_col).trim();
                let index: usize = raw.parse().map_err(|_| {
                    AnnotatorError::invalid(
                        path,
                        format!("line {line}: '{raw}' is not a valid {}", scale.index_column()),
                    )
                })?;
                let Some(default_color) = scale.color_of(index) else {
                    return Err(AnnotatorError::invalid(
                        path,
                        format!(
                            "line {line}: {} {index} is out of range (0..{})",
                            scale.index_column(),
                            scale.len()
                        ),
                    ));
                };
                let color = color_col
                    .map(|col| field(col).trim())
                    .filter(|c| !c.is_empty())
                    .unwrap_or(default_color);
                labels.push(Label {
                    index,
                    color: color.to_string(),
                });
            }

            store.replace(AnnotationRecord {
                folder_name: folder_name.to_string(),
                image_name: image_name.to_string(),
                labels,
            });
        }

        tracing::info!(
            "opened annotations file {} with {} records",
            path.display(),
            store.records.len()
        );
        Ok(store)
    }

    pub fn scales(&self) -> &[LabelScale] {
        &self.scales
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.path.is_some()
    }

    /// Drops the file binding and the loaded rows.
    pub fn unbind(&mut self) {
        self.path = None;
        self.records.clear();
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup(&self, image_name: &str) -> Option<&AnnotationRecord> {
        self.records.iter().find(|r| r.image_name == image_name)
    }

    /// Replaces any record for the same image, then rewrites the file.
    pub fn upsert(&mut self, record: AnnotationRecord) -> Result<UpsertOutcome> {
        let Some(path) = self.path.clone() else {
            tracing::debug!("no annotations file bound, {} not saved", record.image_name);
            return Ok(UpsertOutcome::Skipped);
        };
        if record.labels.len() != self.scales.len() {
            return Err(AnnotatorError::Config(format!(
                "record for {} has {} labels, expected {}",
                record.image_name,
                record.labels.len(),
                self.scales.len()
            )));
        }
        tracing::debug!("saving annotation for {}", record.image_name);
        let mut next = self.records.clone();
        replace_record(&mut next, record);
        self.write_to(&path, &next)?;
        self.records = next;
        Ok(UpsertOutcome::Written)
    }

    fn replace(&mut self, record: AnnotationRecord) {
        replace_record(&mut self.records, record);
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec![FOLDER_COLUMN.to_string(), IMAGE_COLUMN.to_string()];
        for scale in &self.scales {
            header.push(scale.index_column());
            header.push(scale.color_column());
        }
        header
    }

    /// Writes `records` to a temp file next to `path`, then renames it into
    /// place. An existing file keeps its permissions.
    fn write_to(&self, path: &Path, records: &[AnnotationRecord]) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| AnnotatorError::from_io(path, e))?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file_mut());
            wtr.write_record(self.header())
                .map_err(|e| AnnotatorError::from_csv(path, e))?;
            for record in records {
                let mut row = vec![record.folder_name.clone(), record.image_name.clone()];
                for label in &record.labels {
                    row.push(label.index.to_string());
                    row.push(label.color.clone());
                }
                wtr.write_record(&row)
                    .map_err(|e| AnnotatorError::from_csv(path, e))?;
            }
            wtr.flush().map_err(|e| AnnotatorError::from_io(path, e))?;
        }
        tmp.as_file_mut()
            .flush()
            .map_err(|e| AnnotatorError::from_io(path, e))?;
        if let Ok(meta) = fs::metadata(path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| AnnotatorError::from_io(path, e))?;
        }
        tmp.persist(path)
            .map_err(|e| AnnotatorError::from_io(path, e.error))?;
        Ok(())
    }
}

fn replace_record(records: &mut Vec<AnnotationRecord>, record: AnnotationRecord) {
    records.retain(|r| r.image_name != record.image_name);
    records.push(record);
}
