use std::path::Path;

use serde::Serialize;

use crate::data::image_dataset::{file_id, list_files};
use crate::error::Result;

pub const REAL: usize = 1;
pub const FAKE: usize = 0;

#[derive(Serialize)]
struct LabelRow<'a> {
    id: &'a str,
    label: usize,
}

/// Writes an `id,label` table for every file in `real_dir` (label 1) and
/// `fake_dir` (label 0). Returns the number of rows written.
pub fn build_label_table<P, Q, R>(real_dir: P, fake_dir: Q, out_csv: R) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let mut writer = csv::Writer::from_path(out_csv.as_ref())?;
    let mut rows = 0;
    for (dir, label) in [(real_dir.as_ref(), REAL), (fake_dir.as_ref(), FAKE)] {
        for path in list_files(dir)? {
            writer.serialize(LabelRow { id: &file_id(&path), label })?;
            rows += 1;
        }
    }
    writer.flush()?;
    log::info!("wrote {} labels to {}", rows, out_csv.as_ref().display());
    Ok(rows)
}
