use thiserror::Error;

use crate::source::SourceImageError;

/// Failures surfaced by compositors and render sessions.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter found: {0}")]
    NoAdapter(String),
    #[error("failed to create GPU device: {0}")]
    Device(String),
    #[error("effect program failed validation: {0}")]
    ShaderValidation(String),
    #[error("image {width}x{height} exceeds the device texture limit of {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
    #[error("texture upload failed: {0}")]
    Upload(String),
    #[error(transparent)]
    InvalidImage(#[from] SourceImageError),
    #[error("no source image is bound")]
    NoImage,
    #[error("invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("frame readback failed: {0}")]
    Readback(String),
    #[error("surface error: {0}")]
    Surface(String),
}
