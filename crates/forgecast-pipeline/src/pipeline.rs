// crates/forgecast-pipeline/src/pipeline.rs
//
// Per-worker persistent GPU pipeline (C3) and its per-file driver. The
// dataflow shape — open input, reset the filter graph, open output, drain
// packets through decode -> scale -> encode -> mux, three-stage flush, close
// output — follows velocut-media/src/encode.rs::run_encode/encode_clip, but
// generalized from "stitch N timeline clips into one output" to "one
// hardware-surface segment in, one segment out", and with the flush made
// into an explicit per-file state machine instead of nested drain loops.

use std::path::Path;

use anyhow::{anyhow, Context as _};
use ffmpeg_the_third as ffmpeg;
use ffmpeg_the_third::util::Dictionary;
use tracing::{info, warn};

use forgecast_core::error::Stage;
use forgecast_core::{EncoderOptions, Job, JobOutcome, PipelineError};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::hwdevice::HwDevice;
use crate::scaler::ScalerGraph;

/// Per-file state machine. `Failed` is reachable from every other state and
/// always routes back to `Idle` with the pipeline intact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileState {
    Idle,
    Opening,
    Running,
    FlushingDecoder,
    FlushingScaler,
    FlushingEncoder,
    Closing,
    Failed,
}

/// The persistent per-worker GPU pipeline. `scaler` is the only piece with a
/// per-file sub-lifecycle — it's `None` between files and rebuilt at the
/// start of every `process_file` call.
pub struct Pipeline {
    gpu_id: u32,
    hw_device: HwDevice,
    decoder: Decoder,
    encoder: Encoder,
    scaler: Option<ScalerGraph>,
    state: FileState,
}

impl Pipeline {
    /// Constructs the hw device, decoder and encoder once. Construction
    /// failure is fatal for this worker — no software fallback.
    pub fn new(opts: &EncoderOptions) -> Result<Self, PipelineError> {
        let build = || -> anyhow::Result<Pipeline> {
            let hw_device = HwDevice::open(opts.gpu_id).context("open hw device")?;
            let decoder = Decoder::new(&hw_device).context("construct decoder")?;
            let encoder = Encoder::new(&hw_device, opts).context("construct encoder")?;
            Ok(Pipeline {
                gpu_id: opts.gpu_id,
                hw_device,
                decoder,
                encoder,
                scaler: None,
                state: FileState::Idle,
            })
        };
        build().map_err(|source| PipelineError::Construction { gpu_id: opts.gpu_id, source })
    }

    pub fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// Runs one job end to end. Any error here is per-file: the pipeline's
    /// decoder/encoder sessions are preserved, only the scaler graph (which
    /// is always rebuilt) and per-file resources are discarded.
    pub fn process_file(&mut self, job: &Job, output_dir: &Path) -> JobOutcome {
        let output_path = job.output_path(output_dir);

        match self.run(job, &output_path) {
            Ok(frame_count) => {
                self.state = FileState::Idle;
                info!(worker_gpu = self.gpu_id, input = %job.input_path.display(), frame_count, "segment transcoded");
                JobOutcome {
                    job: job.clone(),
                    success: true,
                    output_path,
                    frame_count,
                    processing_time_ms: job.submitted_at.elapsed().as_millis() as u64,
                    error: None,
                }
            }
            Err(err) => {
                let stage = stage_for(self.state);
                self.state = FileState::Idle;
                let _ = std::fs::remove_file(&output_path);
                let typed = PipelineError::PerFile { stage, source: err };
                warn!(worker_gpu = self.gpu_id, input = %job.input_path.display(), error = %typed, "segment failed");
                JobOutcome {
                    job: job.clone(),
                    success: false,
                    output_path,
                    frame_count: 0,
                    processing_time_ms: job.submitted_at.elapsed().as_millis() as u64,
                    error: Some(typed.to_string()),
                }
            }
        }
    }

    fn run(&mut self, job: &Job, output_path: &Path) -> anyhow::Result<u64> {
        self.state = FileState::Opening;

        // Step 1: open input with fast-probing options.
        let mut probe_opts = Dictionary::new();
        probe_opts.set("probesize", "32768");
        probe_opts.set("analyzeduration", "0");
        probe_opts.set("fflags", "fastseek");
        let mut ictx = ffmpeg::format::input_with_dictionary(&job.input_path, probe_opts)
            .with_context(|| format!("open input {}", job.input_path.display()))?;
        let video_idx = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("no video stream"))?
            .index();

        // Step 2: the scaler graph ends in EOF state after every file — it
        // cannot be flushed in place, only rebuilt.
        self.state = FileState::Opening;
        self.scaler = Some(ScalerGraph::build(&self.hw_device).context("rebuild scaler graph")?);

        // Step 3: open output, one video stream, header copied from encoder.
        let mut octx = ffmpeg::format::output(output_path)
            .with_context(|| format!("open output {}", output_path.display()))?;
        {
            let codec = ffmpeg::encoder::find_by_name("h264_nvenc")
                .ok_or_else(|| anyhow!("h264_nvenc encoder not registered"))?;
            let mut stream = octx.add_stream(codec).context("add output stream")?;
            self.encoder.copy_parameters_to(&mut stream).context("copy encoder parameters")?;
            stream.set_time_base(self.encoder.time_base());
        }
        octx.write_header().context("write container header")?;

        self.state = FileState::Running;
        let ost_time_base = octx.stream(0).unwrap().time_base();
        let mut frame_counter: i64 = 0;

        let scaler = self.scaler.as_mut().expect("scaler built above");

        macro_rules! drain_encoder {
            () => {
                while let Some(mut packet) = self.encoder.receive_packet()? {
                    packet.set_stream(0);
                    packet.rescale_ts(self.encoder.time_base(), ost_time_base);
                    packet.write_interleaved(&mut octx).context("write packet")?;
                }
            };
        }

        // Step 4: dataflow loop. Non-video packets discarded.
        for (stream, packet) in ictx.packets() {
            if stream.index() != video_idx {
                continue;
            }
            self.decoder.send_packet(&packet).context("decoder send_packet")?;
            while let Some(decoded) = self.decoder.receive_frame()? {
                scaler.push_frame(&decoded).context("scaler push_frame")?;
                while let Some(mut scaled) = scaler.pull_frame()? {
                    scaled.set_pts(Some(frame_counter));
                    frame_counter += 1;
                    self.encoder.send_frame(&scaled).context("encoder send_frame")?;
                    drain_encoder!();
                }
            }
        }

        // Step 5a: flush decoder, drain remaining frames through scaler + encoder.
        self.state = FileState::FlushingDecoder;
        self.decoder.send_eof().context("decoder send_eof")?;
        while let Some(decoded) = self.decoder.receive_frame()? {
            scaler.push_frame(&decoded).context("scaler push_frame (flush D)")?;
            while let Some(mut scaled) = scaler.pull_frame()? {
                scaled.set_pts(Some(frame_counter));
                frame_counter += 1;
                self.encoder.send_frame(&scaled).context("encoder send_frame (flush D)")?;
                drain_encoder!();
            }
        }

        // Step 5b: flush scaler, drain remaining scaled frames through encoder.
        self.state = FileState::FlushingScaler;
        scaler.send_eof().context("scaler send_eof")?;
        while let Some(mut scaled) = scaler.pull_frame()? {
            scaled.set_pts(Some(frame_counter));
            frame_counter += 1;
            self.encoder.send_frame(&scaled).context("encoder send_frame (flush S)")?;
            drain_encoder!();
        }

        // Step 5c: flush encoder, drain remaining packets to the muxer.
        self.state = FileState::FlushingEncoder;
        self.encoder.send_eof().context("encoder send_eof")?;
        drain_encoder!();

        // Step 6: close output. Decoder/encoder flushed (not recreated) so
        // the persistent pipeline is ready for the next job; the scaler is
        // dropped and rebuilt next time.
        self.state = FileState::Closing;
        octx.write_trailer().context("write container trailer")?;
        self.decoder.flush();
        self.encoder.flush();
        self.scaler = None;

        Ok(frame_counter as u64)
    }
}

/// Maps the state the pipeline was in when `run` returned an error to the
/// `Stage` carried by `PipelineError::PerFile`, so the worker's log line and
/// the callback's error string both say where in the dataflow it happened.
fn stage_for(state: FileState) -> Stage {
    match state {
        FileState::Idle | FileState::Opening => Stage::Open,
        FileState::Running => Stage::Decode,
        FileState::FlushingDecoder => Stage::Decode,
        FileState::FlushingScaler => Stage::Scale,
        FileState::FlushingEncoder => Stage::Encode,
        FileState::Closing => Stage::Close,
        FileState::Failed => Stage::Close,
    }
}
