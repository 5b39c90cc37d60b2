// crates/forgecast-pipeline/src/hwdevice.rs
//
// CUDA device context + stream, shared by the decoder, scaler and encoder of
// one worker's Pipeline. ffmpeg-the-third's safe API doesn't expose
// AVHWDeviceContext/AVHWFramesContext construction, so this goes through raw
// FFI the same way moonshine's session/encoder.rs wires hw_frames_ctx onto an
// AVCodecContext — we just do it once here and hand out refs instead of
// adding `cudarc` as a separate dependency.

use std::ffi::CString;
use std::ptr;

use ffmpeg_the_third::ffi;
use ffmpeg_the_third::{self as ffmpeg};

use anyhow::{bail, Result};

/// Owns one `AVBufferRef` wrapping an `AVHWDeviceContext` (CUDA) for a single
/// physical GPU. Dropped exactly once, at worker shutdown.
pub struct HwDevice {
    gpu_id: u32,
    ctx: *mut ffi::AVBufferRef,
}

// The device context is used exclusively by the worker thread that owns it;
// it is never shared across threads, only moved into the worker at startup.
unsafe impl Send for HwDevice {}

impl HwDevice {
    /// Opens a CUDA device context bound to `gpu_id`. Failure here is fatal
    /// for the worker — there is no software fallback.
    pub fn open(gpu_id: u32) -> Result<Self> {
        let device_str = CString::new(gpu_id.to_string()).unwrap();
        let mut ctx: *mut ffi::AVBufferRef = ptr::null_mut();
        let rc = unsafe {
            ffi::av_hwdevice_ctx_create(
                &mut ctx as *mut _,
                ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_CUDA,
                device_str.as_ptr(),
                ptr::null_mut(),
                0,
            )
        };
        if rc < 0 || ctx.is_null() {
            bail!("av_hwdevice_ctx_create(cuda, gpu={gpu_id}) failed with code {rc}");
        }
        Ok(Self { gpu_id, ctx })
    }

    pub fn gpu_id(&self) -> u32 {
        self.gpu_id
    }

    /// Raw pointer to the owned `AVBufferRef`. Callers that need to attach
    /// this device to a codec context take their own ref via
    /// `av_buffer_ref` — ownership stays here.
    pub fn as_ptr(&self) -> *mut ffi::AVBufferRef {
        self.ctx
    }

    /// Allocates and initializes an `AVHWFramesContext` for `CUDA/NV12`
    /// surfaces at `width`x`height`, pooled for `initial_pool_size` frames.
    /// Used by both the decoder (output surfaces) and the encoder
    /// (pre-initialized hardware frame pool).
    pub fn frames_context(
        &self,
        width: u32,
        height: u32,
        initial_pool_size: i32,
    ) -> Result<*mut ffi::AVBufferRef> {
        unsafe {
            let frames_ref = ffi::av_hwframe_ctx_alloc(self.ctx);
            if frames_ref.is_null() {
                bail!("av_hwframe_ctx_alloc returned null for gpu {}", self.gpu_id);
            }
            let frames_ctx = (*frames_ref).data as *mut ffi::AVHWFramesContext;
            (*frames_ctx).format = ffi::AVPixelFormat::AV_PIX_FMT_CUDA as i32;
            (*frames_ctx).sw_format = ffi::AVPixelFormat::AV_PIX_FMT_NV12 as i32;
            (*frames_ctx).width = width as i32;
            (*frames_ctx).height = height as i32;
            (*frames_ctx).initial_pool_size = initial_pool_size;

            let rc = ffi::av_hwframe_ctx_init(frames_ref);
            if rc < 0 {
                ffi::av_buffer_unref(&mut (frames_ref as *mut ffi::AVBufferRef) as *mut _);
                bail!("av_hwframe_ctx_init failed with code {rc} for gpu {}", self.gpu_id);
            }
            Ok(frames_ref)
        }
    }
}

impl Drop for HwDevice {
    fn drop(&mut self) {
        unsafe {
            ffi::av_buffer_unref(&mut self.ctx as *mut _);
        }
    }
}

/// Confirms NVDEC/NVENC are actually usable before any worker attempts
/// construction, so the process can refuse to start rather than degrade to
/// a software codec. Opens and immediately drops a throwaway device context
/// on gpu 0.
pub fn hardware_codecs_available() -> bool {
    HwDevice::open(0).is_ok()
        && ffmpeg::decoder::find_by_name("h264_cuvid").is_some()
        && ffmpeg::encoder::find_by_name("h264_nvenc").is_some()
}
