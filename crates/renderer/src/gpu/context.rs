use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::RenderError;

/// Adapter, device and queue shared by one render session.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
    pub max_texture_dimension: u32,
}

impl GpuContext {
    /// Builds a context with no presentation surface, for offscreen rendering.
    pub(crate) fn headless() -> Result<Self, RenderError> {
        let instance = create_instance();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| RenderError::NoAdapter(err.to_string()))?;
        Self::from_adapter(instance, adapter)
    }

    /// Builds a context able to present to `window`, returning the configured
    /// surface alongside it.
    pub(crate) fn for_window(window: Arc<Window>) -> Result<(Self, SurfaceTarget), RenderError> {
        let instance = create_instance();
        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::Surface(err.to_string()))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| RenderError::NoAdapter(err.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let context = Self::from_adapter(instance, adapter)?;
        let target = SurfaceTarget::new(&context.device, surface, caps, size)?;
        Ok((context, target))
    }

    fn from_adapter(instance: wgpu::Instance, adapter: wgpu::Adapter) -> Result<Self, RenderError> {
        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("liquidmetal device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| RenderError::Device(err.to_string()))?;

        let max_texture_dimension = device.limits().max_texture_dimension_2d;
        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_info,
            max_texture_dimension,
        })
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

/// Window surface plus its current configuration.
pub(crate) struct SurfaceTarget {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

impl SurfaceTarget {
    fn new(
        device: &wgpu::Device,
        surface: wgpu::Surface<'static>,
        caps: wgpu::SurfaceCapabilities,
        size: PhysicalSize<u32>,
    ) -> Result<Self, RenderError> {
        // The effect writes display-ready values, so prefer a non-sRGB target.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
        if format.is_srgb() {
            tracing::warn!(?format, "no linear (non-sRGB) surface format available");
        }

        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);
        tracing::debug!(?format, ?present_mode, "configured preview surface");

        Ok(Self { surface, config })
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(device, &self.config);
    }
}
