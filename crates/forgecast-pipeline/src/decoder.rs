// crates/forgecast-pipeline/src/decoder.rs
//
// Persistent NVDEC H.264 decoder session. Constructed
// once per worker and reused across files — only flushed between them, the
// same send_packet/receive_frame shape velocut-media/src/decode.rs uses for
// its software decoder, but bound to the worker's hw device so every
// decoded frame stays a CUDA surface.
//
// get_format/hw_frames_ctx wiring follows the same pattern moonshine's
// session/encoder.rs uses to force hardware surfaces out of a codec context
// instead of letting negotiation fall back to a software pixel format.

use anyhow::{anyhow, bail, Result};
use ffmpeg_the_third as ffmpeg;
use ffmpeg_the_third::ffi;

use crate::hwdevice::HwDevice;

pub struct Decoder {
    ctx: ffmpeg::decoder::Video,
}

impl Decoder {
    /// Fixed source parameters: 1920x1080, H.264, time base 1/25. Failure is
    /// fatal for the worker.
    pub fn new(hw: &HwDevice) -> Result<Self> {
        let codec = ffmpeg::decoder::find_by_name("h264_cuvid")
            .ok_or_else(|| anyhow!("h264_cuvid decoder not registered"))?;
        let mut ctx = ffmpeg::codec::context::Context::new_with_codec(codec);

        let frames_ref = hw.frames_context(1920, 1080, /* pool size */ 8)?;

        unsafe {
            let raw = ctx.as_mut_ptr();
            (*raw).width = 1920;
            (*raw).height = 1080;
            (*raw).pix_fmt = ffi::AVPixelFormat::AV_PIX_FMT_CUDA;
            (*raw).time_base = ffi::AVRational { num: 1, den: 25 };
            (*raw).get_format = Some(get_hw_format);
            (*raw).hw_device_ctx = ffi::av_buffer_ref(hw.as_ptr());
            (*raw).hw_frames_ctx = ffi::av_buffer_ref(frames_ref);
            if (*raw).hw_device_ctx.is_null() || (*raw).hw_frames_ctx.is_null() {
                bail!("av_buffer_ref failed while wiring decoder hw contexts");
            }
        }

        let decoder = ctx
            .decoder()
            .video()
            .map_err(|e| anyhow!("decoder.video() failed: {e}"))?;

        Ok(Self { ctx: decoder })
    }

    pub fn send_packet(&mut self, packet: &ffmpeg::Packet) -> Result<()> {
        self.ctx.send_packet(packet).map_err(|e| anyhow!("decoder send_packet: {e}"))
    }

    pub fn send_eof(&mut self) -> Result<()> {
        self.ctx.send_eof().map_err(|e| anyhow!("decoder send_eof: {e}"))
    }

    /// `Ok(Some(frame))` on a decoded surface, `Ok(None)` on EAGAIN/EOF
    /// (stage drained), `Err` on a genuine decode error.
    pub fn receive_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Video>> {
        let mut frame = ffmpeg::util::frame::Video::empty();
        match self.ctx.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
            Err(e) => Err(anyhow!("decoder receive_frame: {e}")),
        }
    }

    /// Clears internal decoder state between files without tearing down the
    /// session — the decoder is flushed, not recreated, between files.
    pub fn flush(&mut self) {
        unsafe { ffi::avcodec_flush_buffers(self.ctx.as_mut_ptr()) };
    }
}

/// Forces NVDEC to emit CUDA surfaces instead of negotiating down to a
/// software pixel format. Without this callback `pix_fmt` on the context is
/// only a request and gets overwritten during codec negotiation.
unsafe extern "C" fn get_hw_format(
    _ctx: *mut ffi::AVCodecContext,
    formats: *const ffi::AVPixelFormat,
) -> ffi::AVPixelFormat {
    let mut cursor = formats;
    while !cursor.is_null() && *cursor != ffi::AVPixelFormat::AV_PIX_FMT_NONE {
        if *cursor == ffi::AVPixelFormat::AV_PIX_FMT_CUDA {
            return ffi::AVPixelFormat::AV_PIX_FMT_CUDA;
        }
        cursor = cursor.add(1);
    }
    ffi::AVPixelFormat::AV_PIX_FMT_NONE
}
