use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::compositor::FrameCompositor;
use crate::error::RenderError;
use crate::frame::Frame;
use crate::types::{EffectParams, ShaderParams};

/// Speed-scaled virtual animation clock.
///
/// Only ever moves forward; `reset` is the single way back to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulatedClock {
    seconds: f64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(seconds: f64) -> Self {
        Self {
            seconds: seconds.max(0.0),
        }
    }

    /// Adds `delta × speed`. Negative speeds are treated as paused.
    pub fn advance(&mut self, delta: Duration, speed: f32) -> f64 {
        self.seconds += delta.as_secs_f64() * f64::from(speed.max(0.0));
        self.seconds
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn reset(&mut self) {
        self.seconds = 0.0;
    }
}

/// Origin of display ticks. Each tick reports the display time elapsed since
/// the previous one.
pub trait TickSource: Send {
    /// Restarts the source; the next tick reports zero elapsed time.
    fn reset(&mut self);
    /// Elapsed time for the next tick, or `None` once the source is exhausted.
    fn tick(&mut self) -> Option<Duration>;
}

/// Tick source backed by the monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTickSource {
    last: Option<Instant>,
}

impl SystemTickSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for SystemTickSource {
    fn reset(&mut self) {
        self.last = None;
    }

    fn tick(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let delta = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last = Some(now);
        Some(delta)
    }
}

/// Pre-recorded sequence of tick intervals, used for tests and for
/// deterministic captures.
#[derive(Debug, Clone, Default)]
pub struct SyntheticTicks {
    pending: VecDeque<Duration>,
    recorded: Vec<Duration>,
}

impl SyntheticTicks {
    pub fn new(intervals: impl IntoIterator<Item = Duration>) -> Self {
        let recorded: Vec<Duration> = intervals.into_iter().collect();
        Self {
            pending: recorded.iter().copied().collect(),
            recorded,
        }
    }

    /// `count` ticks spaced `interval` apart; the first one reports zero.
    pub fn uniform(interval: Duration, count: usize) -> Self {
        Self::new((0..count).map(|i| if i == 0 { Duration::ZERO } else { interval }))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl TickSource for SyntheticTicks {
    fn reset(&mut self) {
        self.pending = self.recorded.iter().copied().collect();
    }

    fn tick(&mut self) -> Option<Duration> {
        self.pending.pop_front()
    }
}

/// Convenient alias for owning tick sources behind trait objects.
pub type BoxedTickSource = Box<dyn TickSource>;

impl TickSource for BoxedTickSource {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn tick(&mut self) -> Option<Duration> {
        (**self).tick()
    }
}

/// Cooperative cancellation flag shared between a driver and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clears the flag for every clone of this token.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Receives each composed frame.
pub trait Presenter {
    fn present(&mut self, frame: &Frame) -> Result<(), RenderError>;
}

/// Presenter that keeps only the most recent frame.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    frame: Option<Frame>,
    presented: u64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn take(&mut self) -> Option<Frame> {
        self.frame.take()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Presenter for LatestFrame {
    fn present(&mut self, frame: &Frame) -> Result<(), RenderError> {
        self.frame = Some(frame.clone());
        self.presented += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Result of a single `RenderLoop::tick`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A frame at `time` was composed and presented.
    Presented { time: f32, frame_index: u64 },
    /// The loop is not running; nothing happened.
    Idle,
    /// The token was cancelled before the tick started; the loop is now idle.
    Cancelled,
    /// The tick source has no more ticks; the loop is now idle.
    Exhausted,
}

/// Drives a compositor once per display tick while running.
pub struct RenderLoop<C, T> {
    compositor: C,
    ticks: T,
    clock: SimulatedClock,
    shader: ShaderParams,
    effects: EffectParams,
    state: LoopState,
    frame_index: u64,
    cancel: CancelToken,
}

impl<C, T> RenderLoop<C, T>
where
    C: FrameCompositor,
    T: TickSource,
{
    pub fn new(compositor: C, ticks: T) -> Self {
        Self {
            compositor,
            ticks,
            clock: SimulatedClock::new(),
            shader: ShaderParams::default(),
            effects: EffectParams::default(),
            state: LoopState::Idle,
            frame_index: 0,
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn simulated_time(&self) -> f64 {
        self.clock.seconds()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    /// Token that stops the loop before its next tick. The same token serves
    /// every session of this loop; a cancel is consumed by the tick that
    /// observes it.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Applies new parameters; they take effect on the next tick.
    pub fn set_params(&mut self, shader: ShaderParams, effects: EffectParams) {
        self.shader = shader.clamped();
        self.effects = effects.clamped();
        self.compositor.set_params(self.shader, self.effects);
    }

    /// Enters `Running` with a fresh session: simulated time and the tick
    /// source restart from zero.
    pub fn start(&mut self) {
        if self.state == LoopState::Running {
            return;
        }
        self.clock.reset();
        self.ticks.reset();
        self.frame_index = 0;
        self.state = LoopState::Running;
        tracing::debug!("render loop started");
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            tracing::debug!(frames = self.frame_index, "render loop stopped");
        }
        self.state = LoopState::Idle;
    }

    /// Runs one tick: advance simulated time, compose, present.
    ///
    /// A compositor or presenter error stops the loop and is returned.
    pub fn tick<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> Result<TickOutcome, RenderError> {
        if self.state != LoopState::Running {
            return Ok(TickOutcome::Idle);
        }
        if self.cancel.is_cancelled() {
            self.cancel.reset();
            self.stop();
            return Ok(TickOutcome::Cancelled);
        }
        let Some(delta) = self.ticks.tick() else {
            self.stop();
            return Ok(TickOutcome::Exhausted);
        };

        let time = self.clock.advance(delta, self.shader.speed) as f32;
        let frame = match self.compositor.compose(time) {
            Ok(frame) => frame,
            Err(err) => {
                self.stop();
                return Err(err);
            }
        };
        if let Err(err) = presenter.present(&frame) {
            self.stop();
            return Err(err);
        }
        let frame_index = self.frame_index;
        self.frame_index += 1;
        Ok(TickOutcome::Presented { time, frame_index })
    }

    /// Ticks until the loop leaves `Running`, returning the number of frames
    /// presented.
    pub fn run<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> Result<u64, RenderError> {
        self.start();
        let mut presented = 0;
        while let TickOutcome::Presented { .. } = self.tick(presenter)? {
            presented += 1;
        }
        Ok(presented)
    }

    pub fn into_parts(self) -> (C, T) {
        (self.compositor, self.ticks)
    }
}
