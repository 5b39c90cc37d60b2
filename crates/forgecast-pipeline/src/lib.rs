// crates/forgecast-pipeline/src/lib.rs

mod decoder;
mod encoder;
mod hwdevice;
mod scaler;

pub mod pipeline;
pub mod pool;
pub mod worker;

pub use hwdevice::hardware_codecs_available;
pub use pipeline::{FileState, Pipeline};
pub use pool::WorkerPool;
pub use worker::WorkerSlot;
