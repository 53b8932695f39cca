use std::cell::RefCell;
use std::time::Duration;

use capture::{
    capture, Animation, AnimationEncoder, CaptureError, CaptureOptions, CaptureSession,
    CollectFrames, EncodeError, FixedSource, FrameSource, GifFile, LiveSource,
};
use renderer::{
    CpuCompositor, Frame, FrameCompositor, LatestFrame, RenderError, RenderLoop, ShaderParams,
    SourceImage, SyntheticTicks,
};

fn logo() -> SourceImage {
    let (width, height) = (16usize, 16usize);
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let inside = (4..12).contains(&x) && (4..12).contains(&y);
            let v = if inside { 0 } else { 255 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    SourceImage::from_rgba(width as u32, height as u32, pixels).unwrap()
}

fn compositor(width: u32, height: u32) -> CpuCompositor {
    CpuCompositor::new(width, height).unwrap().with_image(&logo())
}

fn options(frame_count: u32, size: u32) -> CaptureOptions {
    CaptureOptions {
        frame_count,
        size,
        frame_delay: Duration::from_millis(50),
        ..Default::default()
    }
}

/// Delegates to a real compositor but fails at one frame index.
struct FailingAt<'a> {
    inner: FixedSource<'a, CpuCompositor>,
    fail_at: u32,
}

impl FrameSource for FailingAt<'_> {
    fn acquire(&mut self, index: u32, options: &CaptureOptions) -> Result<Frame, CaptureError> {
        if index == self.fail_at {
            return Err(CaptureError::Render {
                index,
                source: RenderError::Readback("injected failure".into()),
            });
        }
        self.inner.acquire(index, options)
    }
}

/// Records whether it was ever handed an animation.
#[derive(Default)]
struct RecordingEncoder {
    received: Option<usize>,
}

impl AnimationEncoder for RecordingEncoder {
    type Output = usize;

    fn encode(&mut self, animation: Animation) -> Result<usize, EncodeError> {
        self.received = Some(animation.len());
        Ok(animation.len())
    }
}

#[test]
fn acquisition_failure_delivers_nothing() {
    let count = 6;
    for fail_at in [0, count / 2, count - 1] {
        let mut compositor = compositor(16, 16);
        let mut source = FailingAt {
            inner: FixedSource::new(&mut compositor),
            fail_at,
        };
        let mut encoder = RecordingEncoder::default();
        let progress = RefCell::new(Vec::new());
        let result = CaptureSession::new(options(count, 16))
            .with_progress(|done, total| progress.borrow_mut().push((done, total)))
            .run(&mut source, &mut encoder);

        match result {
            Err(CaptureError::Render { index, .. }) => assert_eq!(index, fail_at),
            other => panic!("expected failure at {fail_at}, got {other:?}"),
        }
        assert_eq!(encoder.received, None, "encoder ran after failure at {fail_at}");
        assert_eq!(progress.borrow().len(), fail_at as usize);
    }
}

#[test]
fn failed_capture_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.gif");
    let mut compositor = compositor(16, 16);
    let mut source = FailingAt {
        inner: FixedSource::new(&mut compositor),
        fail_at: 2,
    };
    let mut encoder = GifFile::new(&path);
    assert!(capture(&mut source, &options(4, 16), &mut encoder).is_err());
    assert!(!path.exists());
}

#[test]
fn non_square_source_gets_transparent_padding() {
    let mut compositor = compositor(64, 32);
    let mut source = FixedSource::new(&mut compositor);
    let progress = RefCell::new(Vec::new());
    let options = CaptureOptions {
        frame_count: 10,
        frame_delay: Duration::from_millis(50),
        size: 256,
        transparent: true,
        ..Default::default()
    };
    let animation = CaptureSession::new(options)
        .with_progress(|done, total| progress.borrow_mut().push((done, total)))
        .run(&mut source, &mut CollectFrames)
        .unwrap();

    assert_eq!(animation.len(), 10);
    assert_eq!(animation.delay, Duration::from_millis(50));
    assert_eq!(
        *progress.borrow(),
        (1..=10).map(|done| (done, 10)).collect::<Vec<_>>()
    );
    for frame in animation.frames() {
        assert_eq!(frame.dimensions(), (256, 256));
        // 64×32 scales to 256×128, centred vertically.
        for x in (0..256).step_by(17) {
            assert_eq!(frame.get_pixel(x, 10).0[3], 0);
            assert_eq!(frame.get_pixel(x, 250).0[3], 0);
        }
        assert!(frame.get_pixel(128, 128).0[3] > 0);
    }
}

#[test]
fn opaque_export_has_no_transparent_pixels() {
    let mut compositor = compositor(32, 16);
    let mut source = FixedSource::new(&mut compositor);
    let options = CaptureOptions {
        transparent: false,
        ..options(2, 32)
    };
    let animation = capture(&mut source, &options, &mut CollectFrames).unwrap();
    for frame in animation.frames() {
        assert!(frame.pixels().all(|p| p.0[3] == 255));
        assert_eq!(frame.get_pixel(16, 2).0, [0, 0, 0, 255]);
    }
}

#[test]
fn doubling_speed_and_halving_delay_matches() {
    let run = |speed: f32, delay_ms: u64| {
        let mut compositor = compositor(16, 16);
        let mut source = FixedSource::new(&mut compositor);
        let options = CaptureOptions {
            speed,
            frame_delay: Duration::from_millis(delay_ms),
            start_time: 0.5,
            ..options(5, 16)
        };
        capture(&mut source, &options, &mut CollectFrames)
            .unwrap()
            .into_frames()
    };
    let fast = run(2.0, 25);
    let slow = run(1.0, 50);
    assert_eq!(fast, slow);

    let still = run(0.0, 50);
    assert!(still.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn cancellation_stops_before_the_next_frame() {
    let mut compositor = compositor(16, 16);
    let mut source = FixedSource::new(&mut compositor);
    let session = CaptureSession::new(options(8, 16));
    let token = session.cancel_token();
    let mut encoder = RecordingEncoder::default();
    let result = session
        .with_progress(|done, _| {
            if done == 3 {
                token.cancel();
            }
        })
        .run(&mut source, &mut encoder);
    assert!(matches!(result, Err(CaptureError::Cancelled { completed: 3 })));
    assert_eq!(encoder.received, None);
}

#[test]
fn invalid_options_fail_before_rendering() {
    let mut compositor = compositor(16, 16);
    let mut source = FixedSource::new(&mut compositor);
    let result = capture(&mut source, &options(0, 16), &mut CollectFrames);
    assert!(matches!(result, Err(CaptureError::InvalidOptions(_))));
}

#[test]
fn live_capture_samples_the_render_loop() {
    let mut render_loop = RenderLoop::new(
        compositor(16, 16),
        SyntheticTicks::uniform(Duration::from_millis(50), 4),
    );
    render_loop.set_params(ShaderParams::default(), Default::default());

    let mut source = LiveSource::new(&mut render_loop).unpaced();
    let animation = capture(&mut source, &options(4, 16), &mut CollectFrames).unwrap();
    assert_eq!(animation.len(), 4);
    assert_eq!(render_loop.frame_index(), 4);

    // Restarting replays the same four ticks; a fifth frame is never presented.
    render_loop.stop();
    let mut source = LiveSource::new(&mut render_loop).unpaced();
    let result = capture(&mut source, &options(6, 16), &mut CollectFrames);
    assert!(matches!(result, Err(CaptureError::LoopStopped { index: 4 })));
}

#[test]
fn live_capture_continues_a_running_loop() {
    let mut render_loop = RenderLoop::new(
        compositor(16, 16),
        SyntheticTicks::uniform(Duration::from_millis(50), 10),
    );
    render_loop.set_params(
        ShaderParams {
            speed: 1.0,
            ..ShaderParams::default()
        },
        Default::default(),
    );
    render_loop.start();
    let mut sink = LatestFrame::new();
    for _ in 0..3 {
        render_loop.tick(&mut sink).unwrap();
    }
    let before = render_loop.simulated_time();
    assert!(before > 0.0);

    let mut source = LiveSource::new(&mut render_loop).unpaced();
    let animation = capture(&mut source, &options(2, 16), &mut CollectFrames).unwrap();
    assert_eq!(animation.len(), 2);
    assert_eq!(render_loop.frame_index(), 5);
    assert!((render_loop.simulated_time() - (before + 0.1)).abs() < 1e-6);
}

#[test]
fn live_capture_surfaces_compositor_errors() {
    let mut render_loop = RenderLoop::new(
        CpuCompositor::new(16, 16).unwrap(),
        SyntheticTicks::uniform(Duration::from_millis(50), 4),
    );
    let mut source = LiveSource::new(&mut render_loop).unpaced();
    let result = capture(&mut source, &options(2, 16), &mut CollectFrames);
    assert!(matches!(
        result,
        Err(CaptureError::Render {
            index: 0,
            source: RenderError::NoImage
        })
    ));
}

#[test]
fn compositor_trait_objects_can_be_captured() {
    let mut boxed: Box<dyn FrameCompositor + Send> = Box::new(compositor(16, 16));
    let mut source = FixedSource::new(boxed.as_mut());
    let animation = capture(&mut source, &options(2, 16), &mut CollectFrames).unwrap();
    assert_eq!(animation.len(), 2);
}
