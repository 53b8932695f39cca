use bytemuck::{Pod, Zeroable};

use crate::types::{EffectParams, ShaderParams};

/// Host mirror of the `Params` uniform block in the fragment program.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EffectUniforms {
    pub time: f32,
    pub ratio: f32,
    pub img_ratio: f32,
    pub pattern_scale: f32,
    pub refraction: f32,
    pub edge: f32,
    pub pattern_blur: f32,
    pub liquid: f32,
    pub dither_type: i32,
    pub dither_intensity: f32,
    pub halftone_type: i32,
    pub halftone_size: f32,
    pub width: f32,
    pub height: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

impl EffectUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.img_ratio = 1.0;
        uniforms.set_resolution(width, height);
        uniforms.set_params(&ShaderParams::default(), &EffectParams::default());
        uniforms
    }

    /// Output size; also defines the viewport ratio.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width.max(1) as f32;
        self.height = height.max(1) as f32;
        self.ratio = self.width / self.height;
    }

    pub fn set_image_ratio(&mut self, ratio: f32) {
        self.img_ratio = ratio;
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    pub fn set_params(&mut self, shader: &ShaderParams, effects: &EffectParams) {
        self.pattern_scale = shader.pattern_scale;
        self.refraction = shader.refraction;
        self.edge = shader.edge;
        self.pattern_blur = shader.pattern_blur;
        self.liquid = shader.liquid;
        self.dither_type = effects.dither.code();
        self.dither_intensity = effects.intensity;
        self.halftone_type = effects.halftone_shape.code();
        self.halftone_size = effects.halftone_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DitherType, HalftoneShape};

    #[test]
    fn block_is_sixty_four_bytes() {
        assert_eq!(std::mem::size_of::<EffectUniforms>(), 64);
    }

    #[test]
    fn params_map_to_codes() {
        let mut uniforms = EffectUniforms::new(300, 150);
        assert_eq!(uniforms.ratio, 2.0);
        uniforms.set_params(
            &ShaderParams::default(),
            &EffectParams {
                dither: DitherType::Halftone,
                halftone_shape: HalftoneShape::Crosses,
                ..EffectParams::default()
            },
        );
        assert_eq!(uniforms.dither_type, 6);
        assert_eq!(uniforms.halftone_type, 3);
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(bytes.len(), 64);
    }
}
