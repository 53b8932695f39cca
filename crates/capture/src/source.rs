use std::thread;

use renderer::{
    Frame, FrameCompositor, LatestFrame, LoopState, RenderLoop, TickOutcome, TickSource,
};

use crate::error::CaptureError;
use crate::options::CaptureOptions;

/// Supplies the frames of a capture, in index order.
pub trait FrameSource {
    fn acquire(&mut self, index: u32, options: &CaptureOptions) -> Result<Frame, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn acquire(&mut self, index: u32, options: &CaptureOptions) -> Result<Frame, CaptureError> {
        (**self).acquire(index, options)
    }
}

/// Composes every frame directly at its scheduled simulated time, so the
/// same options always produce the same animation.
pub struct FixedSource<'a, C: ?Sized> {
    compositor: &'a mut C,
}

impl<'a, C: FrameCompositor + ?Sized> FixedSource<'a, C> {
    pub fn new(compositor: &'a mut C) -> Self {
        Self { compositor }
    }
}

impl<C: FrameCompositor + ?Sized> FrameSource for FixedSource<'_, C> {
    fn acquire(&mut self, index: u32, options: &CaptureOptions) -> Result<Frame, CaptureError> {
        self.compositor
            .compose(options.frame_time(index))
            .map_err(|source| CaptureError::Render { index, source })
    }
}

/// Samples a render loop: waits out the frame delay, ticks once and keeps
/// the frame it presented. Timing follows the loop's tick source.
///
/// A loop that is already running is sampled from its current simulated
/// time. An idle loop is started, which restarts its clock at zero.
pub struct LiveSource<'a, C, T> {
    render_loop: &'a mut RenderLoop<C, T>,
    latest: LatestFrame,
    pace: bool,
}

impl<'a, C, T> LiveSource<'a, C, T>
where
    C: FrameCompositor,
    T: TickSource,
{
    pub fn new(render_loop: &'a mut RenderLoop<C, T>) -> Self {
        Self {
            render_loop,
            latest: LatestFrame::new(),
            pace: true,
        }
    }

    /// Skips sleeping between frames, for tick sources that carry their own
    /// timing.
    pub fn unpaced(mut self) -> Self {
        self.pace = false;
        self
    }
}

impl<C, T> FrameSource for LiveSource<'_, C, T>
where
    C: FrameCompositor,
    T: TickSource,
{
    fn acquire(&mut self, index: u32, options: &CaptureOptions) -> Result<Frame, CaptureError> {
        if self.render_loop.state() == LoopState::Idle {
            if index > 0 {
                return Err(CaptureError::LoopStopped { index });
            }
            self.render_loop.start();
        }
        if self.pace && index > 0 {
            thread::sleep(options.frame_delay);
        }

        match self.render_loop.tick(&mut self.latest) {
            Ok(TickOutcome::Presented { .. }) => self
                .latest
                .take()
                .ok_or(CaptureError::LoopStopped { index }),
            Ok(outcome) => {
                tracing::debug!(index, ?outcome, "render loop ended during capture");
                Err(CaptureError::LoopStopped { index })
            }
            Err(source) => Err(CaptureError::Render { index, source }),
        }
    }
}
