//! Animation capture for liquidmetal.
//!
//! A [`CaptureSession`] pulls `frame_count` frames from a [`FrameSource`],
//! letterboxes each into a square canvas and hands the finished
//! [`Animation`] to an [`AnimationEncoder`]. Frames come either straight
//! from a compositor at scheduled times ([`FixedSource`]) or from a live
//! render loop ([`LiveSource`]).

mod error;
pub mod framerate;
pub mod gif;
pub mod letterbox;
pub mod options;
mod session;
mod source;

pub use error::{CaptureError, EncodeError};
pub use framerate::{delay_for_fps, fps_for_delay, Framerate, DEFAULT_FILE_NAME};
pub use gif::{GifBytes, GifFile, PaletteDither};
pub use options::{CaptureOptions, CaptureTiming};
pub use session::{capture, Animation, AnimationEncoder, CaptureSession, CollectFrames};
pub use source::{FixedSource, FrameSource, LiveSource};

use renderer::{EffectParams, FrameCompositor, RenderLoop, ShaderParams, SystemTickSource};

/// Applies the parameters to `compositor` and captures through the source
/// matching the session's timing mode.
pub fn capture_from_compositor<C, E>(
    mut compositor: C,
    shader: ShaderParams,
    effects: EffectParams,
    session: CaptureSession<'_>,
    encoder: &mut E,
) -> Result<E::Output, CaptureError>
where
    C: FrameCompositor,
    E: AnimationEncoder + ?Sized,
{
    match session.options().timing {
        CaptureTiming::Fixed => {
            compositor.set_params(shader, effects);
            let mut source = FixedSource::new(&mut compositor);
            session.run(&mut source, encoder)
        }
        CaptureTiming::Live => {
            let mut render_loop = RenderLoop::new(compositor, SystemTickSource::new());
            render_loop.set_params(shader, effects);
            let mut source = LiveSource::new(&mut render_loop);
            let result = session.run(&mut source, encoder);
            render_loop.stop();
            result
        }
    }
}
