use crate::compositor::FrameCompositor;
use crate::error::RenderError;
use crate::frame::Frame;
use crate::source::SourceImage;
use crate::types::{EffectParams, ShaderParams};

use super::context::GpuContext;
use super::session::GpuSession;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Runs the fragment program into an offscreen texture and reads every frame
/// back to host memory.
pub struct GpuCompositor {
    session: GpuSession,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
    width: u32,
    height: u32,
}

impl GpuCompositor {
    /// Creates a headless session rendering `width × height` frames.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        let context = GpuContext::headless()?;
        let max = context.max_texture_dimension;
        if width > max || height > max {
            return Err(RenderError::TextureTooLarge { width, height, max });
        }
        let session = GpuSession::new(context, TARGET_FORMAT, width, height)?;
        let device = &session.context.device;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bytes_per_row = padded_row_bytes(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::info!(
            adapter = %session.context.adapter_info.name,
            width,
            height,
            "GPU compositor ready"
        );
        Ok(Self {
            session,
            target,
            target_view,
            readback,
            padded_bytes_per_row,
            width,
            height,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.session.context.adapter_info.name
    }

    fn read_frame(&self, time: f32) -> Result<Frame, RenderError> {
        let device = &self.session.context.device;
        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| RenderError::Readback(format!("device poll failed: {err}")))?;
        rx.recv()
            .map_err(|_| RenderError::Readback("readback channel closed".into()))?
            .map_err(|err| RenderError::Readback(err.to_string()))?;

        let row_bytes = self.width as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * self.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(self.padded_bytes_per_row as usize) {
                data.extend_from_slice(&row[..row_bytes]);
            }
        }
        self.readback.unmap();

        Frame::from_raw(self.width, self.height, data, time).ok_or(RenderError::InvalidSize {
            width: self.width,
            height: self.height,
        })
    }
}

impl FrameCompositor for GpuCompositor {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_params(&mut self, shader: ShaderParams, effects: EffectParams) {
        self.session.set_params(&shader.clamped(), &effects.clamped());
    }

    fn bind_image(&mut self, image: &SourceImage) -> Result<(), RenderError> {
        self.session.bind_image(image)
    }

    fn compose(&mut self, time: f32) -> Result<Frame, RenderError> {
        let mut encoder = self.session.encode(&self.target_view, time)?;
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.session
            .context
            .queue
            .submit(std::iter::once(encoder.finish()));
        self.read_frame(time)
    }
}

fn padded_row_bytes(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::CpuCompositor;
    use crate::types::{DitherType, HalftoneShape};

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_row_bytes(1), 256);
        assert_eq!(padded_row_bytes(64), 256);
        assert_eq!(padded_row_bytes(65), 512);
    }

    fn gpu_or_skip(width: u32, height: u32) -> Option<GpuCompositor> {
        match GpuCompositor::new(width, height) {
            Ok(compositor) => Some(compositor),
            Err(RenderError::NoAdapter(_)) | Err(RenderError::Device(_)) => {
                eprintln!("skipping GPU test: no adapter available");
                None
            }
            Err(err) => panic!("GPU compositor failed: {err}"),
        }
    }

    fn mean_difference(a: &Frame, b: &Frame) -> f64 {
        let total: u64 = a
            .image()
            .as_raw()
            .iter()
            .zip(b.image().as_raw())
            .map(|(&x, &y)| u64::from(x.abs_diff(y)))
            .sum();
        total as f64 / a.image().as_raw().len() as f64
    }

    fn mean_level(frame: &Frame) -> f64 {
        let raw = frame.image().as_raw();
        raw.iter().map(|&v| f64::from(v)).sum::<f64>() / raw.len() as f64
    }

    fn effect_variants() -> Vec<EffectParams> {
        let mut variants: Vec<EffectParams> = DitherType::ALL
            .into_iter()
            .filter(|dither| *dither != DitherType::Halftone)
            .map(|dither| EffectParams {
                dither,
                ..EffectParams::default()
            })
            .collect();
        variants.extend(HalftoneShape::ALL.into_iter().map(|halftone_shape| EffectParams {
            dither: DitherType::Halftone,
            halftone_shape,
            ..EffectParams::default()
        }));
        variants
    }

    #[test]
    fn gpu_frame_tracks_cpu_reference() {
        let Some(mut gpu) = gpu_or_skip(32, 32) else {
            return;
        };
        let image = SourceImage::solid(16, 16, [0, 0, 0, 255]).unwrap();
        gpu.bind_image(&image).unwrap();
        let mut cpu = CpuCompositor::new(32, 32).unwrap().with_image(&image);

        for effects in effect_variants() {
            gpu.set_params(ShaderParams::default(), effects);
            cpu.set_params(ShaderParams::default(), effects);
            let gpu_frame = gpu.compose(0.5).unwrap();
            let cpu_frame = cpu.compose(0.5).unwrap();
            let label = format!("{} / {}", effects.dither, effects.halftone_shape);
            match effects.dither {
                // Hashes of large sine arguments diverge between GPU and CPU
                // precision, so only the overall level is comparable.
                DitherType::Random | DitherType::FloydSteinberg => {
                    let diff = (mean_level(&gpu_frame) - mean_level(&cpu_frame)).abs();
                    assert!(diff < 24.0, "{label}: mean level differs by {diff}");
                }
                _ => {
                    let diff = mean_difference(&gpu_frame, &cpu_frame);
                    assert!(diff < 16.0, "{label}: mean channel difference {diff}");
                }
            }
        }
    }

    #[test]
    fn failed_upload_keeps_previous_image() {
        let Some(mut gpu) = gpu_or_skip(8, 8) else {
            return;
        };
        let image = SourceImage::solid(4, 4, [0, 0, 0, 255]).unwrap();
        gpu.bind_image(&image).unwrap();
        let max = gpu.session.context.max_texture_dimension;
        let huge = SourceImage::solid(max + 1, 1, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            gpu.bind_image(&huge),
            Err(RenderError::TextureTooLarge { .. })
        ));
        assert!(gpu.session.has_image());
        assert!(gpu.compose(0.0).is_ok());
    }
}
