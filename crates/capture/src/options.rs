use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use renderer::DitherType;

use crate::error::CaptureError;

pub const FRAME_COUNT_RANGE: RangeInclusive<u32> = 1..=400;
pub const FRAME_DELAY_MS_RANGE: RangeInclusive<u64> = 10..=200;
pub const QUALITY_RANGE: RangeInclusive<u8> = 1..=10;
pub const SIZE_RANGE: RangeInclusive<u32> = 16..=2048;

pub const DEFAULT_FRAME_COUNT: u32 = 60;
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(50);
pub const DEFAULT_QUALITY: u8 = 5;
pub const DEFAULT_SIZE: u32 = 512;

/// How capture frames are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureTiming {
    /// Compose frame `i` directly at `start + i · delay · speed`.
    #[default]
    Fixed,
    /// Tick a render loop and keep whatever it presented. A loop that is
    /// already running keeps its simulated time; an idle one starts at zero.
    Live,
}

impl fmt::Display for CaptureTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTiming::Fixed => f.write_str("fixed"),
            CaptureTiming::Live => f.write_str("live"),
        }
    }
}

impl FromStr for CaptureTiming {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" | "deterministic" => Ok(CaptureTiming::Fixed),
            "live" | "realtime" => Ok(CaptureTiming::Live),
            other => Err(format!("unknown capture timing '{other}'; expected fixed or live")),
        }
    }
}

/// Settings of one export session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    pub frame_count: u32,
    pub frame_delay: Duration,
    /// 1 is the best palette, 10 the fastest encode.
    pub quality: u8,
    /// Edge length of the square output.
    pub size: u32,
    /// Pad with transparent pixels instead of opaque black.
    pub transparent: bool,
    /// Palette dithering applied by the encoder.
    pub dither: DitherType,
    pub timing: CaptureTiming,
    /// Simulated time of the first frame in `Fixed` mode, in seconds.
    pub start_time: f32,
    /// Animation speed used to space `Fixed` frames.
    pub speed: f32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            frame_count: DEFAULT_FRAME_COUNT,
            frame_delay: DEFAULT_FRAME_DELAY,
            quality: DEFAULT_QUALITY,
            size: DEFAULT_SIZE,
            transparent: true,
            dither: DitherType::None,
            timing: CaptureTiming::Fixed,
            start_time: 0.0,
            speed: renderer::types::SPEED.default,
        }
    }
}

impl CaptureOptions {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if !FRAME_COUNT_RANGE.contains(&self.frame_count) {
            return Err(CaptureError::InvalidOptions(format!(
                "frame count {} outside {}..={}",
                self.frame_count,
                FRAME_COUNT_RANGE.start(),
                FRAME_COUNT_RANGE.end()
            )));
        }
        let delay_ms = self.frame_delay.as_millis() as u64;
        if !FRAME_DELAY_MS_RANGE.contains(&delay_ms) {
            return Err(CaptureError::InvalidOptions(format!(
                "frame delay {delay_ms}ms outside {}..={}ms",
                FRAME_DELAY_MS_RANGE.start(),
                FRAME_DELAY_MS_RANGE.end()
            )));
        }
        if !QUALITY_RANGE.contains(&self.quality) {
            return Err(CaptureError::InvalidOptions(format!(
                "quality {} outside {}..={}",
                self.quality,
                QUALITY_RANGE.start(),
                QUALITY_RANGE.end()
            )));
        }
        if !SIZE_RANGE.contains(&self.size) {
            return Err(CaptureError::InvalidOptions(format!(
                "size {} outside {}..={}",
                self.size,
                SIZE_RANGE.start(),
                SIZE_RANGE.end()
            )));
        }
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(CaptureError::InvalidOptions(format!(
                "start time {} must be a non-negative number of seconds",
                self.start_time
            )));
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(CaptureError::InvalidOptions(format!(
                "speed {} must be non-negative",
                self.speed
            )));
        }
        Ok(())
    }

    /// Simulated time of frame `index` in `Fixed` mode.
    pub fn frame_time(&self, index: u32) -> f32 {
        let offset = f64::from(index) * self.frame_delay.as_secs_f64() * f64::from(self.speed);
        (f64::from(self.start_time) + offset) as f32
    }

    /// Total play time of the exported animation.
    pub fn duration(&self) -> Duration {
        self.frame_delay * self.frame_count
    }
}
