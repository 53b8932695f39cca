use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::{GpuContext, GpuSession, SurfaceTarget};
use crate::runtime::{LoopState, SimulatedClock, SystemTickSource, TickSource};
use crate::source::SourceImage;
use crate::types::RendererConfig;

/// Aggregates GPU state for the windowed preview.
struct PreviewState {
    window: Arc<Window>,
    session: GpuSession,
    surface: SurfaceTarget,
    clock: SimulatedClock,
    ticks: SystemTickSource,
    state: LoopState,
    speed: f32,
}

impl PreviewState {
    fn new(window: Arc<Window>, config: &RendererConfig, image: &SourceImage) -> Result<Self> {
        let (context, surface) = GpuContext::for_window(window.clone())
            .context("failed to initialise preview surface")?;
        let (width, height) = surface.size();
        let mut session = GpuSession::new(context, surface.config.format, width, height)?;
        let shader = config.shader.clamped();
        session.set_params(&shader, &config.effects.clamped());
        session.bind_image(image)?;

        Ok(Self {
            window,
            session,
            surface,
            clock: SimulatedClock::new(),
            ticks: SystemTickSource::new(),
            state: LoopState::Running,
            speed: shader.speed,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.surface.resize(&self.session.context.device, new_size);
        let (width, height) = self.surface.size();
        self.session.set_resolution(width, height);
    }

    fn toggle_pause(&mut self) {
        self.state = match self.state {
            LoopState::Running => LoopState::Idle,
            LoopState::Idle => {
                // Paused display time must not count towards the animation.
                self.ticks.reset();
                LoopState::Running
            }
        };
        tracing::info!(state = ?self.state, "preview toggled");
    }

    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        if self.state == LoopState::Running {
            if let Some(delta) = self.ticks.tick() {
                self.clock.advance(delta, self.speed);
            }
        }
        let frame = self.surface.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        match self.session.encode(&view, self.clock.seconds() as f32) {
            Ok(encoder) => {
                self.session
                    .context
                    .queue
                    .submit(std::iter::once(encoder.finish()));
                self.window.pre_present_notify();
                frame.present();
            }
            Err(err) => tracing::error!(error = %err, "failed to encode preview frame"),
        }
        Ok(())
    }
}

/// Opens a window and animates the effect until it is closed. Space pauses
/// and resumes; Escape quits.
pub fn run_preview(config: RendererConfig, image: SourceImage) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title("Liquid Metal Preview")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut state = PreviewState::new(window.clone(), &config, &image)?;
    tracing::info!(
        width = config.surface_size.0,
        height = config.surface_size.1,
        "preview running"
    );

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed && !event.repeat {
                            match event.logical_key {
                                Key::Named(NamedKey::Escape) => elwt.exit(),
                                Key::Named(NamedKey::Space) => state.toggle_pause(),
                                _ => {}
                            }
                        }
                    }
                    WindowEvent::Resized(new_size) => state.resize(new_size),
                    WindowEvent::RedrawRequested => match state.render_frame() {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            let size = state.window.inner_size();
                            state.resize(size);
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            tracing::error!("surface out of memory; exiting preview");
                            elwt.exit();
                        }
                        Err(other) => {
                            tracing::warn!(error = ?other, "surface error; retrying next frame");
                        }
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if state.state == LoopState::Running {
                    state.window.request_redraw();
                }
            }
            _ => {}
        }
    })
    .map_err(|err| anyhow!("window event loop error: {err}"))
}
