use std::path::PathBuf;

use renderer::RenderError;
use thiserror::Error;

/// Failures that abort a capture. No partial animation is ever delivered.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid capture options: {0}")]
    InvalidOptions(String),
    #[error("failed to acquire frame {index}: {source}")]
    Render {
        index: u32,
        #[source]
        source: RenderError,
    },
    #[error("render loop stopped before frame {index} was presented")]
    LoopStopped { index: u32 },
    #[error("capture cancelled after {completed} frames")]
    Cancelled { completed: u32 },
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Failures raised while turning captured frames into an animation file.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("animation has no frames")]
    Empty,
    #[error("frame {index} is {width}x{height}, expected {size}x{size}")]
    FrameSize {
        index: usize,
        width: u32,
        height: u32,
        size: u32,
    },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
