use std::time::Duration;

use image::RgbaImage;
use renderer::{CancelToken, DitherType};

use crate::error::{CaptureError, EncodeError};
use crate::letterbox::letterbox;
use crate::options::CaptureOptions;
use crate::source::FrameSource;

/// A complete, ordered set of `size × size` frames ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub size: u32,
    pub delay: Duration,
    pub transparent: bool,
    pub quality: u8,
    pub dither: DitherType,
    frames: Vec<RgbaImage>,
}

impl Animation {
    pub fn new(options: &CaptureOptions) -> Self {
        Self {
            size: options.size,
            delay: options.frame_delay,
            transparent: options.transparent,
            quality: options.quality,
            dither: options.dither,
            frames: Vec::with_capacity(options.frame_count as usize),
        }
    }

    pub fn push(&mut self, frame: RgbaImage) {
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[RgbaImage] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn into_frames(self) -> Vec<RgbaImage> {
        self.frames
    }

    /// Checks the frame list is non-empty and every frame has the declared size.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.frames.is_empty() {
            return Err(EncodeError::Empty);
        }
        for (index, frame) in self.frames.iter().enumerate() {
            let (width, height) = frame.dimensions();
            if width != self.size || height != self.size {
                return Err(EncodeError::FrameSize {
                    index,
                    width,
                    height,
                    size: self.size,
                });
            }
        }
        Ok(())
    }
}

/// Turns a finished animation into its delivered form, such as a written
/// file or an in-memory buffer.
pub trait AnimationEncoder {
    type Output;

    fn encode(&mut self, animation: Animation) -> Result<Self::Output, EncodeError>;
}

impl<E: AnimationEncoder + ?Sized> AnimationEncoder for &mut E {
    type Output = E::Output;

    fn encode(&mut self, animation: Animation) -> Result<Self::Output, EncodeError> {
        (**self).encode(animation)
    }
}

type ProgressFn<'p> = Box<dyn FnMut(u32, u32) + 'p>;

/// One export: acquires `frame_count` frames, letterboxes them and hands the
/// finished animation to an encoder.
pub struct CaptureSession<'p> {
    options: CaptureOptions,
    progress: Option<ProgressFn<'p>>,
    cancel: CancelToken,
}

impl<'p> CaptureSession<'p> {
    pub fn new(options: CaptureOptions) -> Self {
        Self {
            options,
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Called with `(completed, total)` after each appended frame.
    pub fn with_progress(mut self, progress: impl FnMut(u32, u32) + 'p) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Acquires every frame in order. Any failure drops the frames gathered
    /// so far.
    pub fn collect<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Animation, CaptureError> {
        self.options.validate()?;
        let total = self.options.frame_count;
        let mut animation = Animation::new(&self.options);
        tracing::info!(
            frames = total,
            size = self.options.size,
            delay_ms = self.options.frame_delay.as_millis() as u64,
            timing = ?self.options.timing,
            "capture started"
        );

        for index in 0..total {
            if self.cancel.is_cancelled() {
                tracing::info!(completed = index, "capture cancelled");
                return Err(CaptureError::Cancelled { completed: index });
            }
            let frame = source.acquire(index, &self.options).inspect_err(|err| {
                tracing::warn!(index, error = %err, "capture aborted");
            })?;
            animation.push(letterbox(&frame, self.options.size, self.options.transparent));
            if let Some(progress) = self.progress.as_mut() {
                progress(index + 1, total);
            }
        }
        Ok(animation)
    }

    /// Captures all frames, then encodes them. The encoder only ever sees a
    /// complete animation.
    pub fn run<S, E>(mut self, source: &mut S, encoder: &mut E) -> Result<E::Output, CaptureError>
    where
        S: FrameSource + ?Sized,
        E: AnimationEncoder + ?Sized,
    {
        let animation = self.collect(source)?;
        let frames = animation.len();
        let output = encoder.encode(animation)?;
        tracing::info!(frames, "capture encoded");
        Ok(output)
    }
}

/// Runs a capture without progress reporting or cancellation.
pub fn capture<S, E>(
    source: &mut S,
    options: &CaptureOptions,
    encoder: &mut E,
) -> Result<E::Output, CaptureError>
where
    S: FrameSource + ?Sized,
    E: AnimationEncoder + ?Sized,
{
    CaptureSession::new(options.clone()).run(source, encoder)
}

/// Encoder that keeps the animation as-is; useful for callers that post-process
/// frames themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectFrames;

impl AnimationEncoder for CollectFrames {
    type Output = Animation;

    fn encode(&mut self, animation: Animation) -> Result<Animation, EncodeError> {
        animation.validate()?;
        Ok(animation)
    }
}
