//! Per-pixel quantisation and halftone stylisation.
//!
//! Every algorithm here is stateless: a threshold is derived from the screen
//! position alone, so pixels can be processed in any order. Screen positions
//! follow the fragment-coordinate convention (origin bottom-left, pixel
//! centres at `n + 0.5`).

use std::f32::consts::PI;

use crate::noise::simplex;
use crate::shading::{fract, mix, smoothstep, step, Vec2};
use crate::types::{DitherType, EffectParams, HalftoneShape};

/// Pixels at or below this opacity are left untouched.
pub const MIN_DITHER_OPACITY: f32 = 0.05;

/// Ordered thresholds stored column by column: `BAYER_2X2[x][y]`.
const BAYER_2X2: [[f32; 2]; 2] = [[0.0 / 4.0, 2.0 / 4.0], [3.0 / 4.0, 1.0 / 4.0]];

/// Column-major like `BAYER_2X2`.
const BAYER_4X4: [[f32; 4]; 4] = [
    [0.0 / 16.0, 8.0 / 16.0, 2.0 / 16.0, 10.0 / 16.0],
    [12.0 / 16.0, 4.0 / 16.0, 14.0 / 16.0, 6.0 / 16.0],
    [3.0 / 16.0, 11.0 / 16.0, 1.0 / 16.0, 9.0 / 16.0],
    [15.0 / 16.0, 7.0 / 16.0, 13.0 / 16.0, 5.0 / 16.0],
];

/// Integer Bayer index for a `2^order` square matrix, built from the bits of
/// the cell coordinates. Row `y`, column `x`.
pub fn bayer_index(order: u32, x: u32, y: u32) -> u32 {
    let mut value = 0;
    for bit in 0..order {
        let xb = (x >> bit) & 1;
        let yb = (y >> bit) & 1;
        let cell = ((xb ^ yb) << 1) | yb;
        value |= cell << (2 * (order - 1 - bit));
    }
    value
}

/// Ordered 8×8 threshold in `[0, 1)`.
pub fn bayer8_threshold(x: u32, y: u32) -> f32 {
    bayer_index(3, x & 7, y & 7) as f32 / 64.0
}

fn ordered_cell(pos: Vec2, size: f32) -> (usize, usize) {
    let x = (pos.x - (pos.x / size).floor() * size) as usize;
    let y = (pos.y - (pos.y / size).floor() * size) as usize;
    (x, y)
}

/// Structured hash that resembles error-diffusion grain in a single pass.
pub fn floyd_steinberg_value(pos: Vec2) -> f32 {
    let noise = fract((pos * 0.01).dot(Vec2::new(12.9898, 78.233)).sin() * 43_758.547);
    let pattern = fract(pos.x * 0.13 + pos.y * 0.17 + noise * 0.1);
    let diagonal = fract((pos.x + pos.y) * 0.11);
    mix(pattern, diagonal, 0.4)
}

pub fn random_value(pos: Vec2) -> f32 {
    fract(pos.dot(Vec2::new(12.9898, 78.233)).sin() * 43_758.547)
}

/// Screen rotation applied before the halftone grid, in radians.
pub fn halftone_angle(shape: HalftoneShape) -> f32 {
    match shape {
        HalftoneShape::Circles => 0.785_398,
        HalftoneShape::Lines => 0.087_266,
        HalftoneShape::Diamonds => 0.261_799,
        HalftoneShape::Crosses => 0.523_599,
        HalftoneShape::Dots => 1.0472,
    }
}

pub fn halftone_value(pos: Vec2, shape: HalftoneShape, size: f32) -> f32 {
    let angle = halftone_angle(shape);
    let (sin, cos) = angle.sin_cos();
    let rotated = Vec2::new(pos.x * cos - pos.y * sin, pos.x * sin + pos.y * cos);

    let mut scaled = rotated * size;
    let variation = simplex(scaled * 0.1) * 0.05;
    scaled += Vec2::splat(variation);

    let mut grid = scaled.fract() - Vec2::splat(0.5);
    grid += Vec2::new((scaled.y * 3.0).sin(), (scaled.x * 2.7).sin()) * 0.03;

    let (dist, threshold, softness) = match shape {
        HalftoneShape::Circles => (grid.length(), 0.25, 0.07),
        HalftoneShape::Lines => (
            0.5 - 0.5 * (grid.y * PI * 2.0 + scaled.x * 0.2).sin(),
            0.5,
            0.1,
        ),
        HalftoneShape::Diamonds => (grid.x.abs() + grid.y.abs(), 0.3, 0.08),
        HalftoneShape::Crosses => (
            grid.x.abs().min(grid.y.abs()),
            0.15 + 0.05 * (scaled.x * 0.5).sin(),
            0.05,
        ),
        HalftoneShape::Dots => (
            grid.length(),
            0.2 + 0.05 * (scaled.x * 0.7 + scaled.y * 0.9).sin(),
            0.04,
        ),
    };
    smoothstep(threshold - softness, threshold + softness, dist)
}

/// Threshold for `dither` at a screen position. `None` reports 1.0, which
/// never lets a clamped channel through.
pub fn threshold(effects: &EffectParams, pos: Vec2) -> f32 {
    match effects.dither {
        DitherType::None => 1.0,
        DitherType::Bayer2x2 => {
            let (x, y) = ordered_cell(pos, 2.0);
            BAYER_2X2[x][y]
        }
        DitherType::Bayer4x4 => {
            let (x, y) = ordered_cell(pos, 4.0);
            BAYER_4X4[x][y]
        }
        DitherType::Bayer8x8 => {
            let (x, y) = ordered_cell(pos, 8.0);
            bayer8_threshold(x as u32, y as u32)
        }
        DitherType::FloydSteinberg => floyd_steinberg_value(pos),
        DitherType::Random => random_value(pos),
        DitherType::Halftone => halftone_value(pos, effects.halftone_shape, effects.halftone_size),
    }
}

/// Quantises one channel against `threshold` and blends by `intensity`.
pub fn quantize(dither: DitherType, value: f32, threshold: f32, intensity: f32) -> f32 {
    let dithered = if dither == DitherType::Halftone {
        let adjusted = mix(0.7, 0.3, value) * threshold;
        smoothstep(adjusted - 0.15, adjusted + 0.15, 0.5)
    } else {
        step(threshold, value)
    };
    mix(value, dithered, intensity)
}

/// Post-processes one pixel colour. Colours are returned untouched when
/// dithering is off, the intensity is zero, or the pixel is nearly
/// transparent.
pub fn apply(color: [f32; 3], opacity: f32, pos: Vec2, effects: &EffectParams) -> [f32; 3] {
    if effects.dither == DitherType::None
        || effects.intensity <= 0.0
        || opacity <= MIN_DITHER_OPACITY
    {
        return color;
    }
    let threshold = threshold(effects, pos);
    color.map(|channel| {
        let safe = channel.clamp(0.01, 0.99);
        quantize(effects.dither, safe, threshold, effects.intensity)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAYER_8X8: [[u32; 8]; 8] = [
        [0, 32, 8, 40, 2, 34, 10, 42],
        [48, 16, 56, 24, 50, 18, 58, 26],
        [12, 44, 4, 36, 14, 46, 6, 38],
        [60, 28, 52, 20, 62, 30, 54, 22],
        [3, 35, 11, 43, 1, 33, 9, 41],
        [51, 19, 59, 27, 49, 17, 57, 25],
        [15, 47, 7, 39, 13, 45, 5, 37],
        [63, 31, 55, 23, 61, 29, 53, 21],
    ];

    fn effects(dither: DitherType) -> EffectParams {
        EffectParams {
            dither,
            ..EffectParams::default()
        }
    }

    #[test]
    fn bayer8_matches_recursive_matrix_at_every_cell() {
        for (y, row) in BAYER_8X8.iter().enumerate() {
            for (x, &expected) in row.iter().enumerate() {
                assert_eq!(bayer_index(3, x as u32, y as u32), expected, "cell ({x}, {y})");
                assert_eq!(bayer8_threshold(x as u32, y as u32), expected as f32 / 64.0);
            }
        }
    }

    #[test]
    fn small_tables_are_column_major() {
        let bayer2 = effects(DitherType::Bayer2x2);
        let bayer4 = effects(DitherType::Bayer4x4);
        assert_eq!(threshold(&bayer2, Vec2::new(1.5, 0.5)), 0.75);
        assert_eq!(threshold(&bayer2, Vec2::new(0.5, 1.5)), 0.5);
        assert_eq!(threshold(&bayer4, Vec2::new(1.5, 0.5)), 12.0 / 16.0);
        assert_eq!(threshold(&bayer4, Vec2::new(0.5, 1.5)), 8.0 / 16.0);

        let listed2 = [0.0, 2.0, 3.0, 1.0];
        let listed4 = [
            0.0, 8.0, 2.0, 10.0, 12.0, 4.0, 14.0, 6.0, 3.0, 11.0, 1.0, 9.0, 15.0, 7.0, 13.0, 5.0,
        ];
        for x in 0..2 {
            for y in 0..2 {
                let pos = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                assert_eq!(threshold(&bayer2, pos), listed2[x * 2 + y] / 4.0, "2x2 ({x}, {y})");
            }
        }
        for x in 0..4 {
            for y in 0..4 {
                let pos = Vec2::new(x as f32 + 4.5, y as f32 + 8.5);
                assert_eq!(threshold(&bayer4, pos), listed4[x * 4 + y] / 16.0, "4x4 ({x}, {y})");
                assert_eq!(listed4[x * 4 + y], bayer_index(2, y as u32, x as u32) as f32);
            }
        }
    }

    #[test]
    fn ordered_lookup_uses_pixel_cell() {
        let fx = effects(DitherType::Bayer8x8);
        assert_eq!(threshold(&fx, Vec2::new(1.5, 0.5)), 32.0 / 64.0);
        assert_eq!(threshold(&fx, Vec2::new(9.5, 8.5)), 32.0 / 64.0);
        assert_eq!(threshold(&fx, Vec2::new(0.5, 1.5)), 48.0 / 64.0);
    }

    #[test]
    fn zero_intensity_is_identity_for_every_type() {
        let colors = [[0.0, 0.5, 1.0], [0.98, 0.98, 1.0], [0.1, 0.1, 0.17]];
        for dither in DitherType::ALL {
            let fx = EffectParams {
                dither,
                intensity: 0.0,
                ..EffectParams::default()
            };
            for color in colors {
                for ix in 0..9 {
                    let pos = Vec2::new(ix as f32 + 0.5, (ix * 3) as f32 + 0.5);
                    assert_eq!(apply(color, 1.0, pos, &fx), color, "{dither}");
                }
            }
        }
    }

    #[test]
    fn none_never_alters_colour() {
        let fx = EffectParams {
            dither: DitherType::None,
            intensity: 1.0,
            ..EffectParams::default()
        };
        for ix in 0..32 {
            let color = [ix as f32 / 31.0, 0.3, 0.7];
            assert_eq!(apply(color, 1.0, Vec2::new(ix as f32 + 0.5, 0.5), &fx), color);
        }
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let fx = effects(DitherType::Bayer4x4);
        let color = [0.4, 0.5, 0.6];
        assert_eq!(apply(color, 0.05, Vec2::new(0.5, 0.5), &fx), color);
        assert_ne!(apply(color, 0.5, Vec2::new(0.5, 0.5), &fx), color);
    }

    #[test]
    fn full_intensity_ordered_output_is_binary() {
        let fx = effects(DitherType::Bayer2x2);
        for ix in 0..4 {
            let pos = Vec2::new(ix as f32 + 0.5, (ix / 2) as f32 + 0.5);
            for channel in apply([0.2, 0.5, 0.9], 1.0, pos, &fx) {
                assert!(channel.abs() < 1e-6 || (channel - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn stochastic_and_halftone_thresholds_stay_in_unit_range() {
        for shape in HalftoneShape::ALL {
            let fx = EffectParams {
                dither: DitherType::Halftone,
                halftone_shape: shape,
                ..EffectParams::default()
            };
            for ix in 0..40 {
                let pos = Vec2::new(ix as f32 * 7.0 + 0.5, ix as f32 * 3.0 + 0.5);
                let value = threshold(&fx, pos);
                assert!((0.0..=1.0).contains(&value), "{shape}: {value}");
            }
        }
        for ix in 0..40 {
            let pos = Vec2::new(ix as f32 + 0.5, 200.5 - ix as f32);
            assert!((0.0..=1.0).contains(&random_value(pos)));
            assert!((0.0..=1.0).contains(&floyd_steinberg_value(pos)));
        }
    }
}
