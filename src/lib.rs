pub mod cli;
pub mod core;
pub mod models;

pub use crate::core::config::ScoringConfig;
pub use crate::core::pipeline::{ExerciseFeatures, RunOutcome, ScoringPipeline};
pub use crate::core::storage::ResultStorage;
pub use crate::models::error::{ConformanceError, ConformanceResult};
pub use crate::models::reference::ReferenceData;
pub use crate::models::score::ScoreReport;
