// crates/forgecast-pipeline/src/encoder.rs
//
// Persistent NVENC H.264 encoder session. The typed
// EncoderOptions record (forgecast_core::options) replaces the ad-hoc
// Dictionary of option strings velocut-media/src/encode.rs builds inline for
// its CPU x264 encoder — built once here, turned into the Dictionary
// open_as_with actually wants right before open().
//
// hw_frames_ctx wiring follows the same raw-pointer-onto-AVCodecContext
// pattern moonshine's session/encoder.rs uses for its CUDA encoder.

use anyhow::{anyhow, bail, Result};
use ffmpeg_the_third as ffmpeg;
use ffmpeg_the_third::ffi;
use ffmpeg_the_third::util::Dictionary;

use forgecast_core::EncoderOptions;

use crate::hwdevice::HwDevice;

pub struct Encoder {
    ctx: ffmpeg::encoder::Video,
}

impl Encoder {
    pub fn new(hw: &HwDevice, opts: &EncoderOptions) -> Result<Self> {
        let codec = ffmpeg::encoder::find_by_name("h264_nvenc")
            .ok_or_else(|| anyhow!("h264_nvenc encoder not registered"))?;
        let mut ctx = ffmpeg::codec::context::Context::new_with_codec(codec);

        let frames_ref = hw.frames_context(opts.width, opts.height, /* pool size */ 8)?;

        unsafe {
            let raw = ctx.as_mut_ptr();
            (*raw).width = opts.width as i32;
            (*raw).height = opts.height as i32;
            (*raw).pix_fmt = ffi::AVPixelFormat::AV_PIX_FMT_CUDA;
            (*raw).time_base = ffi::AVRational { num: 1, den: opts.fps as i32 };
            (*raw).framerate = ffi::AVRational { num: opts.fps as i32, den: 1 };
            (*raw).bit_rate = opts.bitrate_bps as i64;
            (*raw).hw_device_ctx = ffi::av_buffer_ref(hw.as_ptr());
            (*raw).hw_frames_ctx = ffi::av_buffer_ref(frames_ref);
            if (*raw).hw_device_ctx.is_null() || (*raw).hw_frames_ctx.is_null() {
                bail!("av_buffer_ref failed while wiring encoder hw contexts");
            }
        }

        let mut options = Dictionary::new();
        options.set("preset", opts.preset.as_str());
        options.set("rc", opts.rc.as_str());
        options.set("cq", &opts.cq.to_string());
        options.set("profile", opts.profile.as_str());
        options.set("level", &opts.level.as_str());
        options.set("gpu", &opts.gpu_id.to_string());

        let video = ctx
            .encoder()
            .video()
            .map_err(|e| anyhow!("encoder.video() failed: {e}"))?;
        let opened = video
            .open_as_with(codec, options)
            .map_err(|e| anyhow!("encoder open failed: {e}"))?;

        Ok(Self { ctx: opened })
    }

    /// Copies the opened encoder's codec parameters onto an output stream —
    /// the safe API has no `Stream::set_parameters`, so this goes through
    /// raw FFI the same way velocut-media/src/encode.rs does for its x264
    /// stream.
    pub fn copy_parameters_to(&self, stream: &mut ffmpeg::format::stream::StreamMut) -> Result<()> {
        unsafe {
            let rc = ffi::avcodec_parameters_from_context(
                stream.parameters().as_mut_ptr(),
                self.ctx.as_ptr(),
            );
            if rc < 0 {
                bail!("avcodec_parameters_from_context failed with code {rc}");
            }
        }
        Ok(())
    }

    pub fn send_frame(&mut self, frame: &ffmpeg::util::frame::Video) -> Result<()> {
        self.ctx.send_frame(frame).map_err(|e| anyhow!("encoder send_frame: {e}"))
    }

    pub fn send_eof(&mut self) -> Result<()> {
        self.ctx.send_eof().map_err(|e| anyhow!("encoder send_eof: {e}"))
    }

    /// `Ok(Some(packet))` on an encoded packet, `Ok(None)` on EAGAIN/EOF.
    pub fn receive_packet(&mut self) -> Result<Option<ffmpeg::Packet>> {
        let mut packet = ffmpeg::Packet::empty();
        match self.ctx.receive_packet(&mut packet) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
            Err(e) => Err(anyhow!("encoder receive_packet: {e}")),
        }
    }

    pub fn flush(&mut self) {
        unsafe { ffi::avcodec_flush_buffers(self.ctx.as_mut_ptr()) };
    }

    pub fn time_base(&self) -> ffmpeg::Rational {
        self.ctx.time_base()
    }
}
