pub mod checkpoint;
pub mod epoch;
pub mod epoch_stats;
pub mod history;
pub mod loop_fn;
pub mod metrics;
pub mod train_config;

pub use checkpoint::{Checkpoint, CheckpointMetadata};
pub use epoch::run_epoch;
pub use epoch_stats::{EpochReport, EpochStats};
pub use history::{SplitLog, TrainingHistory};
pub use loop_fn::train_val;
pub use metrics::{argmax, correct_count, loss_batch};
pub use train_config::TrainConfig;
