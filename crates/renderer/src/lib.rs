//! Renderer crate for liquidmetal.
//!
//! Evaluates the liquid-metal effect over a logo image, either on the CPU or
//! as a `wgpu` fragment program, and drives it from a tick-based render loop.
//! The overall flow is:
//!
//! ```text
//!   SourceImage + ShaderParams/EffectParams
//!          │
//!          ▼
//!   FrameCompositor::compose(time) ──▶ pattern ──▶ dither ──▶ premultiplied Frame
//!          ▲                                                     │
//!          │ simulated time                                      ▼
//!   RenderLoop::tick ◀── TickSource                            Presenter
//! ```
//!
//! `CpuCompositor` is the reference implementation; `GpuCompositor` runs the
//! same program offscreen and reads frames back. `run_preview` opens a winit
//! window and presents directly to its surface.

mod compile;
pub mod compositor;
pub mod dither;
mod error;
pub mod frame;
mod gpu;
pub mod noise;
pub mod pattern;
pub mod runtime;
pub mod shading;
pub mod source;
pub mod types;
mod window;

pub use compositor::{CpuCompositor, FrameCompositor};
pub use error::RenderError;
pub use frame::Frame;
pub use gpu::{EffectUniforms, GpuCompositor};
pub use runtime::{
    BoxedTickSource, CancelToken, LatestFrame, LoopState, Presenter, RenderLoop, SimulatedClock,
    SyntheticTicks, SystemTickSource, TickOutcome, TickSource,
};
pub use source::{SourceImage, SourceImageError};
pub use types::{
    Backend, DitherType, EffectParams, HalftoneShape, ParamRange, RendererConfig, ShaderParams,
};
pub use window::run_preview;

/// Boxed compositor chosen at run time.
pub type BoxedCompositor = Box<dyn FrameCompositor + Send>;

/// Builds the compositor selected by `config.backend`, applies its parameters
/// and binds `image`.
pub fn create_compositor(
    config: &RendererConfig,
    image: &SourceImage,
) -> Result<BoxedCompositor, RenderError> {
    let (width, height) = config.surface_size;
    let mut compositor: BoxedCompositor = match config.backend {
        Backend::Cpu => Box::new(CpuCompositor::new(width, height)?),
        Backend::Gpu => Box::new(GpuCompositor::new(width, height)?),
    };
    compositor.set_params(config.shader, config.effects);
    compositor.bind_image(image)?;
    tracing::debug!(backend = %config.backend, width, height, "compositor ready");
    Ok(compositor)
}
