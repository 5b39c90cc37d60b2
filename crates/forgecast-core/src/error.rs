// crates/forgecast-core/src/error.rs
//
// Typed error kinds distinguishing the two recovery classes a worker cares about:
// `Construction` (pipeline can't be built, fatal for that worker) vs
// `PerFile` (this job failed, pipeline preserved). Call sites still return
// `anyhow::Result` internally and attach stage context with `.context(...)`;
// this enum is what carries the distinction into logs and callback payloads.

use std::fmt;

/// Which stage of the per-file dataflow an error occurred in. Carried in log
/// lines and in `PipelineError::PerFile` for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Open,
    ResetScaler,
    OpenOutput,
    Decode,
    Scale,
    Encode,
    Mux,
    Close,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Open => "open",
            Stage::ResetScaler => "reset-scaler",
            Stage::OpenOutput => "open-output",
            Stage::Decode => "decode",
            Stage::Scale => "scale",
            Stage::Encode => "encode",
            Stage::Mux => "mux",
            Stage::Close => "close",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Hardware device / decoder / encoder / scaler-graph construction
    /// failed. Fatal for the worker that raised it — no software fallback.
    #[error("pipeline construction failed for gpu {gpu_id}: {source}")]
    Construction {
        gpu_id: u32,
        #[source]
        source: anyhow::Error,
    },

    /// Anything that goes wrong while processing a single file. The
    /// worker's persistent pipeline is left intact; only this job fails.
    #[error("job failed at stage {stage}: {source}")]
    PerFile {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}
