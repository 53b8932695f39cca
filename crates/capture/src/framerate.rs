use std::fmt;
use std::time::Duration;

/// Framerates offered as presets for export.
pub const STANDARD_FRAMERATES: [u32; 6] = [12, 24, 25, 30, 60, 120];

const FRAMERATE_TOLERANCE: f64 = 0.1;

/// File name used when an export target is not given.
pub const DEFAULT_FILE_NAME: &str = "liquid-metal-favicon.gif";

/// Frame delay for `fps`, rounded to whole milliseconds.
pub fn delay_for_fps(fps: f64) -> Duration {
    if !fps.is_finite() || fps <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_millis((1000.0 / fps).round() as u64)
}

/// Playback rate implied by `delay`.
pub fn fps_for_delay(delay: Duration) -> f64 {
    let secs = delay.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        1.0 / secs
    }
}

/// Label of a frame delay in terms of the preset framerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framerate {
    Standard(u32),
    Custom,
}

impl Framerate {
    /// Matches `delay` against the presets within 0.1 fps. Whole
    /// millisecond delays only hit some of them exactly: 33ms is 30.3 fps
    /// and reads as custom.
    pub fn for_delay(delay: Duration) -> Self {
        let fps = fps_for_delay(delay);
        STANDARD_FRAMERATES
            .iter()
            .copied()
            .find(|&standard| (f64::from(standard) - fps).abs() < FRAMERATE_TOLERANCE)
            .map(Framerate::Standard)
            .unwrap_or(Framerate::Custom)
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framerate::Standard(fps) => write!(f, "{fps} fps"),
            Framerate::Custom => f.write_str("custom"),
        }
    }
}
