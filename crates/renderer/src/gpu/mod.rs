//! GPU evaluation of the effect.
//!
//! - `context` owns instance/adapter/device wiring, headless or bound to a
//!   window surface.
//! - `pipeline` compiles the WGSL stages and builds one render pipeline per
//!   output format.
//! - `texture` uploads the logo with clamp-to-edge linear sampling.
//! - `uniforms` mirrors the fragment program's parameter block.
//! - `session` ties one pipeline, one texture and the uniform buffer together.
//! - `offscreen` renders into a texture and reads frames back for capture.

mod context;
mod offscreen;
mod pipeline;
mod session;
mod texture;
mod uniforms;

pub(crate) use context::{GpuContext, SurfaceTarget};
pub use offscreen::GpuCompositor;
pub(crate) use session::GpuSession;
pub use uniforms::EffectUniforms;
