//! Two-dimensional simplex noise on a skewed triangular grid.
//!
//! Gradients are hashed with the mod-289 permutation polynomial so the CPU
//! evaluation and the fragment program agree without lookup tables.

use crate::shading::{fract, Vec2};

/// `(3 - sqrt(3)) / 6`, `(sqrt(3) - 1) / 2`, `-1 + 2 * C.x`, `1 / 41`.
const C: [f32; 4] = [
    0.211_324_87,
    0.366_025_42,
    -0.577_350_26,
    0.024_390_243,
];

fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute(x: f32) -> f32 {
    mod289(((x * 34.0) + 1.0) * x)
}

/// Deterministic, continuous noise in roughly `[-1, 1]`.
pub fn simplex(v: Vec2) -> f32 {
    let skew = v.dot(Vec2::splat(C[1]));
    let mut i = (v + Vec2::splat(skew)).floor();
    let unskew = i.dot(Vec2::splat(C[0]));
    let x0 = v - i + Vec2::splat(unskew);

    let i1 = if x0.x > x0.y {
        Vec2::new(1.0, 0.0)
    } else {
        Vec2::new(0.0, 1.0)
    };
    let x1 = x0 + Vec2::splat(C[0]) - i1;
    let x2 = x0 + Vec2::splat(C[2]);

    i = Vec2::new(mod289(i.x), mod289(i.y));
    let p = [
        permute(permute(i.y) + i.x),
        permute(permute(i.y + i1.y) + i.x + i1.x),
        permute(permute(i.y + 1.0) + i.x + 1.0),
    ];

    let corners = [x0, x1, x2];
    let mut total = 0.0;
    for (corner, hash) in corners.into_iter().zip(p) {
        let mut m = (0.5 - corner.dot(corner)).max(0.0);
        m *= m;
        m *= m;

        let x = 2.0 * fract(hash * C[3]) - 1.0;
        let h = x.abs() - 0.5;
        let a0 = x - (x + 0.5).floor();
        m *= 1.792_842_9 - 0.853_734_7 * (a0 * a0 + h * h);

        total += m * (a0 * corner.x + h * corner.y);
    }
    130.0 * total
}
