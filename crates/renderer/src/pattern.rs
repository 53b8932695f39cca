//! The liquid-metal field: banded chrome stripes bent by a lens-like bulge,
//! warped by noise along the logo silhouette and split into offset colour
//! channels.

use std::f32::consts::PI;

use crate::noise::simplex;
use crate::shading::{fract, mix, smoothstep, Vec2};
use crate::types::ShaderParams;

/// Bright stripe colour.
pub const LIGHT: [f32; 3] = [0.98, 0.98, 1.0];

/// Width of the fade applied at the image border, in image UV units.
pub const FRAME_FADE: f32 = 0.01;

/// Per-frame inputs shared by every pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldInputs {
    /// Viewport width over height.
    pub ratio: f32,
    /// Source image width over height.
    pub img_ratio: f32,
    /// Simulated time in seconds.
    pub time: f32,
    pub params: ShaderParams,
}

/// Colour and coverage of one pixel before dithering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternSample {
    pub color: [f32; 3],
    pub opacity: f32,
}

/// Maps a viewport coordinate to image UV, fitting the image inside the
/// viewport and flipping to top-left image convention.
pub fn image_uv(v_uv: Vec2, ratio: f32, img_ratio: f32) -> Vec2 {
    let mut uv = v_uv - Vec2::splat(0.5);
    if ratio > img_ratio {
        uv.x = uv.x * ratio / img_ratio;
    } else {
        uv.y = uv.y * img_ratio / ratio;
    }
    uv += Vec2::splat(0.5);
    uv.y = 1.0 - uv.y;
    uv
}

/// Fades to zero within `width` of every image edge.
pub fn frame_alpha(uv: Vec2, width: f32) -> f32 {
    let x = smoothstep(0.0, width, uv.x) * smoothstep(1.0, 1.0 - width, uv.x);
    let y = smoothstep(0.0, width, uv.y) * smoothstep(1.0, 1.0 - width, uv.y);
    x * y
}

/// Five-zone banded ramp across one stripe cycle.
///
/// `widths` holds the two thin strip widths and the wide strip ratio; `bulge`
/// narrows the inner light band.
pub fn color_channel(
    c1: f32,
    c2: f32,
    stripe: f32,
    widths: [f32; 3],
    blur: f32,
    bulge: f32,
) -> f32 {
    let edge = |border: f32| smoothstep(border - blur, border + blur, stripe);

    let mut ch = c2;
    ch = mix(ch, c1, smoothstep(0.0, blur, stripe));

    let mut border = widths[0];
    ch = mix(ch, c2, edge(border));

    let b = smoothstep(0.2, 0.8, bulge);
    border = widths[0] + 0.4 * (1.0 - b) * widths[1];
    ch = mix(ch, c1, edge(border));

    border = widths[0] + 0.5 * (1.0 - b) * widths[1];
    ch = mix(ch, c2, edge(border));

    border = widths[0] + widths[1];
    ch = mix(ch, c1, edge(border));

    let gradient_t = (stripe - widths[0] - widths[1]) / widths[2];
    let gradient = mix(c1, c2, smoothstep(0.0, 1.0, gradient_t));
    mix(ch, gradient, edge(border))
}

/// Evaluates the pattern at viewport coordinate `v_uv` (origin bottom-left,
/// `[0, 1]²`). `edge_mask` samples the source image red channel at an
/// image UV.
pub fn shade<F>(v_uv: Vec2, inputs: &FieldInputs, edge_mask: F) -> PatternSample
where
    F: Fn(Vec2) -> f32,
{
    let params = &inputs.params;
    let mut uv = v_uv;
    uv.y = 1.0 - uv.y;
    uv.x *= inputs.ratio;
    let diagonal = uv.x - uv.y;
    let t = inputs.time;

    let img_uv = image_uv(v_uv, inputs.ratio, inputs.img_ratio);
    let mask = edge_mask(img_uv);

    let light = LIGHT;
    let dark = [0.1, 0.1, 0.1 + 0.1 * smoothstep(0.7, 1.3, uv.x + uv.y)];

    let mut edge = mask;

    let mut grad_uv = uv - Vec2::splat(0.5);
    let dist = (grad_uv + Vec2::new(0.0, 0.2 * diagonal)).length();
    grad_uv = grad_uv.rotate((0.25 - 0.2 * diagonal) * PI);

    let mut bulge = 1.0 - (1.8 * dist).powf(1.2);
    bulge *= uv.y.max(0.0).powf(0.3);

    let cycle_width = params.pattern_scale;
    let thin_1_ratio = 0.12 / cycle_width * (1.0 - 0.4 * bulge);
    let thin_2_ratio = 0.07 / cycle_width * (1.0 + 0.4 * bulge);
    let wide_ratio = 1.0 - thin_1_ratio - thin_2_ratio;
    let thin_1_width = cycle_width * thin_1_ratio;
    let thin_2_width = cycle_width * thin_2_ratio;

    let mut opacity = 1.0 - smoothstep(0.9 - 0.5 * params.edge, 1.0 - 0.5 * params.edge, edge);
    opacity *= frame_alpha(img_uv, FRAME_FADE);

    let noise = simplex(uv - Vec2::splat(t));
    edge += (1.0 - edge) * params.liquid * noise;

    let refr = (1.0 - bulge).clamp(0.0, 1.0);

    let mut dir = grad_uv.x + diagonal;
    dir -= 2.0 * noise * diagonal * (smoothstep(0.0, 1.0, edge) * smoothstep(1.0, 0.0, edge));
    bulge *= uv.y.max(0.0).powf(0.1).clamp(0.3, 1.0);
    dir *= 0.1 + (1.1 - edge) * bulge;
    dir *= smoothstep(1.0, 0.7, edge);
    dir += 0.18 * (smoothstep(0.1, 0.2, uv.y) * smoothstep(0.4, 0.2, uv.y));
    dir += 0.03 * (smoothstep(0.1, 0.2, 1.0 - uv.y) * smoothstep(0.4, 0.2, 1.0 - uv.y));
    dir *= 0.5 + 0.5 * uv.y * uv.y;
    dir *= cycle_width;
    dir -= t;

    let band = smoothstep(0.4, 0.6, bulge);
    let mut refr_r = refr + 0.03 * bulge * noise;
    let mut refr_b = 1.3 * refr;
    refr_r += 5.0
        * (smoothstep(-0.1, 0.2, uv.y) * smoothstep(0.5, 0.1, uv.y))
        * (band * smoothstep(1.0, 0.4, bulge));
    refr_r -= diagonal;
    refr_b += (smoothstep(0.0, 0.4, uv.y) * smoothstep(0.8, 0.1, uv.y))
        * (band * smoothstep(0.8, 0.4, bulge));
    refr_b -= 0.2 * edge;
    refr_r *= params.refraction;
    refr_b *= params.refraction;

    let mut widths = [thin_1_width, thin_2_width, wide_ratio];
    widths[1] -= 0.02 * smoothstep(0.0, 1.0, edge + bulge);

    let blur = params.pattern_blur;
    let r = color_channel(
        light[0],
        dark[0],
        fract(dir + refr_r),
        widths,
        blur + 0.02 + 0.03 * params.refraction * bulge,
        bulge,
    );
    let g = color_channel(
        light[1],
        dark[1],
        fract(dir),
        widths,
        blur + 0.01 / (1.0 - diagonal),
        bulge,
    );
    let b = color_channel(
        light[2],
        dark[2],
        fract(dir - refr_b),
        widths,
        blur + 0.01,
        bulge,
    );

    PatternSample {
        color: [r, g, b],
        opacity,
    }
}
