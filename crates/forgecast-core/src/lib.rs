// crates/forgecast-core/src/lib.rs

pub mod config;
pub mod error;
pub mod job;
pub mod options;
pub mod processed;
pub mod queue;
pub mod stats;

pub use config::Settings;
pub use error::{PipelineError, Stage};
pub use job::{Job, JobOutcome};
pub use options::{EncoderOptions, Level, Preset, Profile, RateControl};
pub use processed::ProcessedSet;
pub use queue::{BoundedQueue, PopError};
pub use stats::Stats;
