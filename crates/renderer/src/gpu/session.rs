use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::source::SourceImage;
use crate::types::{EffectParams, ShaderParams};

use super::context::GpuContext;
use super::pipeline::{EffectPipeline, PipelineLayouts};
use super::texture::ImageTexture;
use super::uniforms::EffectUniforms;

struct BoundImage {
    texture: ImageTexture,
    bind_group: wgpu::BindGroup,
}

/// Owns every GPU resource of one render session: device, pipeline, uniform
/// buffer and the single bound logo texture. Dropping the session releases
/// them all.
pub(crate) struct GpuSession {
    pub context: GpuContext,
    layouts: PipelineLayouts,
    pipeline: EffectPipeline,
    uniforms: EffectUniforms,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    image: Option<BoundImage>,
}

impl GpuSession {
    pub fn new(
        context: GpuContext,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let device = &context.device;
        let layouts = PipelineLayouts::new(device)?;
        let pipeline = EffectPipeline::new(device, &layouts, format)?;

        let uniforms = EffectUniforms::new(width, height);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("effect uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        tracing::debug!(?format, width, height, "created GPU render session");
        Ok(Self {
            context,
            layouts,
            pipeline,
            uniforms,
            uniform_buffer,
            uniform_bind_group,
            image: None,
        })
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn set_params(&mut self, shader: &ShaderParams, effects: &EffectParams) {
        self.uniforms.set_params(shader, effects);
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.uniforms.set_resolution(width, height);
    }

    /// Uploads `image` and makes it the bound texture. A failed upload leaves
    /// the previous image bound.
    pub fn bind_image(&mut self, image: &SourceImage) -> Result<(), RenderError> {
        let device = &self.context.device;
        let texture = ImageTexture::upload(
            device,
            &self.context.queue,
            image,
            self.context.max_texture_dimension,
        )
        .inspect_err(|err| tracing::warn!(error = %err, "keeping previous logo texture"))?;

        drop(self.image.take());
        let bind_group = texture.bind_group(device, &self.layouts.image_layout);
        self.uniforms.set_image_ratio(texture.aspect_ratio);
        self.image = Some(BoundImage {
            texture,
            bind_group,
        });
        Ok(())
    }

    /// Records one full-screen effect pass into `view` at simulated `time`.
    pub fn encode(
        &mut self,
        view: &wgpu::TextureView,
        time: f32,
    ) -> Result<wgpu::CommandEncoder, RenderError> {
        let image = self.image.as_ref().ok_or(RenderError::NoImage)?;
        self.uniforms.set_time(time);
        self.uniforms.set_image_ratio(image.texture.aspect_ratio);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("effect encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("effect pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &image.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        Ok(encoder)
    }
}
