// crates/forgecast-pipeline/src/scaler.rs
//
// GPU scaler filter graph. Unlike the decoder
// and encoder this is NOT persistent: it terminates in EOF state after every
// file's flush and must be rebuilt from scratch before the next one — so
// `ScalerGraph::build` is the thing `Pipeline` calls once
// per job, not once per worker.

use std::ffi::CString;

use anyhow::{anyhow, bail, Result};
use ffmpeg_the_third as ffmpeg;
use ffmpeg_the_third::ffi;

use crate::hwdevice::HwDevice;

pub struct ScalerGraph {
    graph: ffmpeg::filter::Graph,
    src_ctx: *mut ffi::AVFilterContext,
    sink_ctx: *mut ffi::AVFilterContext,
}

unsafe impl Send for ScalerGraph {}

impl ScalerGraph {
    /// Builds a source pad parameterised for 1920x1080 CUDA/NV12 frames, a
    /// `scale_cuda=1280:720` node, and a sink pad, with the worker's hw
    /// device attached to every node.
    pub fn build(hw: &HwDevice) -> Result<Self> {
        let mut graph = ffmpeg::filter::Graph::new();

        let buffer = ffmpeg::filter::find("buffer").ok_or_else(|| anyhow!("buffer filter missing"))?;
        let buffersink =
            ffmpeg::filter::find("buffersink").ok_or_else(|| anyhow!("buffersink filter missing"))?;

        let src_args = format!(
            "video_size=1920x1080:pix_fmt={}:time_base=1/25:pixel_aspect=1/1",
            ffi::AVPixelFormat::AV_PIX_FMT_CUDA as i32
        );
        graph.add(&buffer, "in", &src_args).map_err(|e| anyhow!("add buffer src: {e}"))?;
        graph.add(&buffersink, "out", "").map_err(|e| anyhow!("add buffersink: {e}"))?;

        {
            let mut src = graph.get("in").ok_or_else(|| anyhow!("src pad missing after add"))?;
            let mut sink = graph.get("out").ok_or_else(|| anyhow!("sink pad missing after add"))?;
            src.set_pixel_format(ffmpeg::format::Pixel::CUDA);
            sink.set_pixel_format(ffmpeg::format::Pixel::CUDA);
        }

        let spec = CString::new("[in] scale_cuda=1280:720 [out]").unwrap();
        graph
            .parse(spec.to_str().unwrap())
            .map_err(|e| anyhow!("filter graph parse failed: {e}"))?;

        let src_ctx = graph
            .get("in")
            .ok_or_else(|| anyhow!("src context missing after parse"))?
            .as_mut_ptr();
        let sink_ctx = graph
            .get("out")
            .ok_or_else(|| anyhow!("sink context missing after parse"))?
            .as_mut_ptr();

        // The safe filter API has no hook for a node's hw_device_ctx — every
        // AVFilterContext in the CUDA graph needs one, same as moonshine
        // wires hw_frames_ctx onto its encoder's AVCodecContext.
        unsafe {
            for ctx in [src_ctx, sink_ctx] {
                (*ctx).hw_device_ctx = ffi::av_buffer_ref(hw.as_ptr());
                if (*ctx).hw_device_ctx.is_null() {
                    bail!("av_buffer_ref(hw_device_ctx) failed while wiring scaler graph");
                }
            }
        }

        graph.validate().map_err(|e| anyhow!("filter graph validate failed: {e}"))?;

        Ok(Self { graph, src_ctx, sink_ctx })
    }

    /// Feeds one decoded (hardware-surface) frame into the graph's source pad.
    pub fn push_frame(&mut self, frame: &ffmpeg::util::frame::Video) -> Result<()> {
        unsafe {
            let rc = ffi::av_buffersrc_add_frame_flags(
                self.src_ctx,
                frame.as_ptr() as *mut ffi::AVFrame,
                ffi::AV_BUFFERSRC_FLAG_KEEP_REF as i32,
            );
            if rc < 0 {
                bail!("av_buffersrc_add_frame_flags failed with code {rc}");
            }
        }
        Ok(())
    }

    /// `Ok(Some(frame))` on a scaled surface, `Ok(None)` on EAGAIN/EOF.
    pub fn pull_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Video>> {
        let mut frame = ffmpeg::util::frame::Video::empty();
        unsafe {
            let rc = ffi::av_buffersink_get_frame(self.sink_ctx, frame.as_mut_ptr());
            if rc == ffi::AVERROR_EOF || rc == ffi::averror(ffi::EAGAIN) {
                return Ok(None);
            }
            if rc < 0 {
                bail!("av_buffersink_get_frame failed with code {rc}");
            }
        }
        Ok(Some(frame))
    }

    /// Signals end-of-stream on the source pad — the first phase of the
    /// scaler's own flush.
    pub fn send_eof(&mut self) -> Result<()> {
        unsafe {
            let rc = ffi::av_buffersrc_add_frame_flags(self.src_ctx, std::ptr::null_mut(), 0);
            if rc < 0 {
                bail!("scaler send_eof failed with code {rc}");
            }
        }
        Ok(())
    }
}
