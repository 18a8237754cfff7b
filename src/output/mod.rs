//! Prediction types, pooling and result output.

mod pooling;
mod progress;
mod render;
mod types;

pub use pooling::{PoolingMode, pool};
pub use progress::{create_batch_progress, finish_progress, update_progress};
pub use render::{FileReport, ResultWriter};
pub use types::{PredictionSegment, SpeciesScore};
