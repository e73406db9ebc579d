pub mod dataset;
pub mod image_dataset;
pub mod labels;
pub mod loader;
pub mod split;
pub mod transform;

pub use dataset::{Dataset, Sample};
pub use image_dataset::{read_label_table, LabeledImageDataset, LABEL_TABLE_FILE};
pub use labels::build_label_table;
pub use loader::{collate, Batch, BatchLoader, Batches};
pub use split::{random_split, Subset};
pub use transform::{ResizeToTensor, Transform};
