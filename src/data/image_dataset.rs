//! Image files on disk paired with labels from a CSV table.
//!
//! Layout used by the trainer:
//!
//! ```text
//! <dir>/train_labels.csv     id,label
//! <dir>/<split>/<id>.<ext>   one image per row
//! ```
//!
//! The listing and label lookup happen once at construction; images are
//! decoded lazily in `get`.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::data::dataset::{Dataset, Sample};
use crate::data::labels::REAL;
use crate::data::transform::Transform;
use crate::error::{Error, Result};

pub const LABEL_TABLE_FILE: &str = "train_labels.csv";

#[derive(Debug, Deserialize)]
struct LabelRow {
    id: String,
    label: usize,
}

/// Reads an `id,label` CSV into a map. Duplicate ids and labels other than
/// fake (0) or real (1) are rejected.
pub fn read_label_table<P: AsRef<Path>>(path: P) -> Result<HashMap<String, usize>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut labels = HashMap::new();
    for row in reader.deserialize() {
        let row: LabelRow = row?;
        if row.label > REAL {
            return Err(Error::InvalidLabelTable(format!(
                "label {} for id '{}' in {} is neither 0 nor 1",
                row.label,
                row.id,
                path.as_ref().display()
            )));
        }
        if labels.insert(row.id.clone(), row.label).is_some() {
            return Err(Error::InvalidLabelTable(format!(
                "duplicate id '{}' in {}",
                row.id,
                path.as_ref().display()
            )));
        }
    }
    Ok(labels)
}

/// Regular files in `dir`, sorted by name.
pub(crate) fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// File identifier used as the label key: the filename without extension.
pub(crate) fn file_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct LabeledImageDataset<T: Transform> {
    entries: Vec<(PathBuf, usize)>,
    transform: T,
}

impl<T: Transform> LabeledImageDataset<T> {
    /// Dataset for `<dir>/<split>` labelled by `<dir>/train_labels.csv`.
    pub fn new<P: AsRef<Path>>(dir: P, transform: T, split: &str, seed: u64) -> Result<Self> {
        let dir = dir.as_ref();
        Self::from_parts(dir.join(split), dir.join(LABEL_TABLE_FILE), transform, seed)
    }

    /// Dataset over every file in `image_dir`, in an order permuted once by `seed`.
    ///
    /// Fails with `NotFound` if any listed file has no label row.
    pub fn from_parts<P: AsRef<Path>, Q: AsRef<Path>>(
        image_dir: P,
        label_table: Q,
        transform: T,
        seed: u64,
    ) -> Result<Self> {
        let labels = read_label_table(label_table.as_ref())?;
        let mut files = list_files(image_dir.as_ref())?;
        files.shuffle(&mut StdRng::seed_from_u64(seed));

        let entries = files
            .into_iter()
            .map(|path| {
                let id = file_id(&path);
                match labels.get(&id) {
                    Some(&label) => Ok((path, label)),
                    None => Err(Error::NotFound {
                        id,
                        table: label_table.as_ref().to_path_buf(),
                    }),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "indexed {} images from {}",
            entries.len(),
            image_dir.as_ref().display()
        );
        Ok(LabeledImageDataset { entries, transform })
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.entries.get(index).map(|(p, _)| p.as_path())
    }

    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(_, label)| label)
    }
}

impl<T: Transform> Dataset for LabeledImageDataset<T> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let (path, label) = self.entries.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.entries.len(),
        })?;
        let img = image::open(path).map_err(|source| Error::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Sample {
            image: self.transform.apply(&img)?,
            label: *label,
        })
    }
}
