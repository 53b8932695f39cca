//! Frame compositors turn (time, parameters, image) into a premultiplied
//! RGBA frame.

use rayon::prelude::*;

use crate::dither;
use crate::error::RenderError;
use crate::frame::{premultiplied_pixel, Frame};
use crate::pattern::{self, FieldInputs};
use crate::shading::Vec2;
use crate::source::SourceImage;
use crate::types::{EffectParams, ShaderParams};

/// Anything that can evaluate the effect for an explicit simulated time.
///
/// Parameters may change between any two frames; the bound image stays until
/// it is replaced.
pub trait FrameCompositor {
    fn size(&self) -> (u32, u32);

    fn set_params(&mut self, shader: ShaderParams, effects: EffectParams);

    /// Replaces the bound image. On error the previous image stays bound.
    fn bind_image(&mut self, image: &SourceImage) -> Result<(), RenderError>;

    fn compose(&mut self, time: f32) -> Result<Frame, RenderError>;
}

impl<C: FrameCompositor + ?Sized> FrameCompositor for Box<C> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn set_params(&mut self, shader: ShaderParams, effects: EffectParams) {
        (**self).set_params(shader, effects)
    }

    fn bind_image(&mut self, image: &SourceImage) -> Result<(), RenderError> {
        (**self).bind_image(image)
    }

    fn compose(&mut self, time: f32) -> Result<Frame, RenderError> {
        (**self).compose(time)
    }
}

/// Reference implementation evaluating every pixel on the CPU, one rayon task
/// per row.
#[derive(Debug, Clone)]
pub struct CpuCompositor {
    width: u32,
    height: u32,
    shader: ShaderParams,
    effects: EffectParams,
    image: Option<SourceImage>,
}

impl CpuCompositor {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }
        Ok(Self {
            width,
            height,
            shader: ShaderParams::default(),
            effects: EffectParams::default(),
            image: None,
        })
    }

    pub fn with_image(mut self, image: &SourceImage) -> Self {
        self.image = Some(image.clone());
        self
    }

    pub fn shader_params(&self) -> &ShaderParams {
        &self.shader
    }

    pub fn effect_params(&self) -> &EffectParams {
        &self.effects
    }
}

impl FrameCompositor for CpuCompositor {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_params(&mut self, shader: ShaderParams, effects: EffectParams) {
        self.shader = shader.clamped();
        self.effects = effects.clamped();
    }

    fn bind_image(&mut self, image: &SourceImage) -> Result<(), RenderError> {
        self.image = Some(image.clone());
        Ok(())
    }

    fn compose(&mut self, time: f32) -> Result<Frame, RenderError> {
        let image = self.image.as_ref().ok_or(RenderError::NoImage)?;
        let (width, height) = (self.width, self.height);
        let inputs = FieldInputs {
            ratio: width as f32 / height as f32,
            img_ratio: image.aspect_ratio(),
            time,
            params: self.shader,
        };
        let effects = self.effects;

        let row_bytes = width as usize * 4;
        let mut data = vec![0u8; row_bytes * height as usize];
        data.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(row, out)| {
                let frag_y = height as f32 - row as f32 - 0.5;
                for (column, px) in out.chunks_exact_mut(4).enumerate() {
                    let frag = Vec2::new(column as f32 + 0.5, frag_y);
                    let v_uv = Vec2::new(frag.x / width as f32, frag.y / height as f32);
                    let sample = pattern::shade(v_uv, &inputs, |uv| image.sample_red(uv));
                    let color = dither::apply(sample.color, sample.opacity, frag, &effects);
                    px.copy_from_slice(&premultiplied_pixel(color, sample.opacity));
                }
            });

        Frame::from_raw(width, height, data, time).ok_or(RenderError::InvalidSize { width, height })
    }
}
