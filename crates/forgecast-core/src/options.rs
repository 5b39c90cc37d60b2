// crates/forgecast-core/src/options.rs
//
// Typed encoder-options record, replacing the ad-hoc option strings an NVENC
// call site would otherwise thread through as `Dictionary` key/value pairs.

/// NVENC preset ladder, fastest (`P0`) to highest-quality (`P7`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
}

impl Preset {
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::P0 => "p0",
            Preset::P1 => "p1",
            Preset::P2 => "p2",
            Preset::P3 => "p3",
            Preset::P4 => "p4",
            Preset::P5 => "p5",
            Preset::P6 => "p6",
            Preset::P7 => "p7",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateControl {
    Cbr,
    Vbr,
    Cq,
}

impl RateControl {
    pub fn as_str(self) -> &'static str {
        match self {
            RateControl::Cbr => "cbr",
            RateControl::Vbr => "vbr",
            RateControl::Cq => "cq",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Baseline,
    Main,
    High,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Baseline => "baseline",
            Profile::Main => "main",
            Profile::High => "high",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Auto,
    Explicit(u32),
}

impl Level {
    pub fn as_str(self) -> std::borrow::Cow<'static, str> {
        match self {
            Level::Auto => std::borrow::Cow::Borrowed("auto"),
            Level::Explicit(l) => std::borrow::Cow::Owned(l.to_string()),
        }
    }
}

/// Fully-typed encoder configuration for one worker's NVENC session.
///
/// Constructed once at startup (see `Settings::encoder_options`) and cloned
/// per worker with `gpu_id` overridden to that worker's assigned device.
#[derive(Clone, Copy, Debug)]
pub struct EncoderOptions {
    pub preset: Preset,
    pub rc: RateControl,
    pub cq: u8,
    pub profile: Profile,
    pub level: Level,
    pub gpu_id: u32,
    pub bitrate_bps: u64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl EncoderOptions {
    /// Defaults: preset p2, VBR, cq 30, profile main, level
    /// auto, 1280x720 @ 25fps, ~1.5 Mbit/s.
    pub fn defaults(gpu_id: u32) -> Self {
        Self {
            preset: Preset::P2,
            rc: RateControl::Vbr,
            cq: 30,
            profile: Profile::Main,
            level: Level::Auto,
            gpu_id,
            bitrate_bps: 1_500_000,
            width: 1280,
            height: 720,
            fps: 25,
        }
    }

    pub fn for_gpu(self, gpu_id: u32) -> Self {
        Self { gpu_id, ..self }
    }
}
