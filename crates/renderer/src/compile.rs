use std::borrow::Cow;

use crate::error::RenderError;

/// Compiles the static full-screen triangle vertex stage.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule, RenderError> {
    compile_checked(device, "fullscreen triangle vertex", VERTEX_SHADER_WGSL)
}

/// Compiles the liquid-metal fragment program.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
) -> Result<wgpu::ShaderModule, RenderError> {
    compile_checked(device, "liquid metal fragment", FRAGMENT_SHADER_WGSL)
}

/// Creates a shader module inside a validation error scope so a broken
/// program surfaces as a typed error instead of a device panic.
fn compile_checked(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
) -> Result<wgpu::ShaderModule, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ShaderValidation(format!("{label}: {err}")));
    }
    Ok(module)
}

/// Minimal full-screen triangle vertex shader.
const VERTEX_SHADER_WGSL: &str = r"
@vertex
fn main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -3.0),
        vec2<f32>(3.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    return vec4<f32>(positions[vertex_index], 0.0, 1.0);
}
";

/// Fragment program. The uniform block layout must match `EffectUniforms` in
/// `gpu/uniforms.rs`; dither and halftone codes match `DitherType::code` and
/// `HalftoneShape::code`.
pub(crate) const FRAGMENT_SHADER_WGSL: &str = r"
struct Params {
    time: f32,
    ratio: f32,
    img_ratio: f32,
    pattern_scale: f32,
    refraction: f32,
    edge: f32,
    pattern_blur: f32,
    liquid: f32,
    dither_type: i32,
    dither_intensity: f32,
    halftone_type: i32,
    halftone_size: f32,
    width: f32,
    height: f32,
    _pad0: f32,
    _pad1: f32,
}

@group(0) @binding(0) var<uniform> u: Params;
@group(1) @binding(0) var image_texture: texture_2d<f32>;
@group(1) @binding(1) var image_sampler: sampler;

const PI: f32 = 3.14159265358979323846;

fn sstep(e0: f32, e1: f32, x: f32) -> f32 {
    if (e0 == e1) {
        return select(1.0, 0.0, x < e0);
    }
    let t = clamp((x - e0) / (e1 - e0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

fn mod289_2(x: vec2<f32>) -> vec2<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute(x: vec3<f32>) -> vec3<f32> {
    return mod289_3(((x * 34.0) + 1.0) * x);
}

fn snoise(v: vec2<f32>) -> f32 {
    let C = vec4<f32>(0.211324865405187, 0.366025403784439, -0.577350269189626, 0.024390243902439);
    var i = floor(v + dot(v, C.yy));
    let x0 = v - i + dot(i, C.xx);
    var i1 = vec2<f32>(0.0, 1.0);
    if (x0.x > x0.y) {
        i1 = vec2<f32>(1.0, 0.0);
    }
    let x1 = x0 + C.xx - i1;
    let x2 = x0 + C.zz;
    i = mod289_2(i);
    let p = permute(permute(i.y + vec3<f32>(0.0, i1.y, 1.0)) + i.x + vec3<f32>(0.0, i1.x, 1.0));
    var m = max(vec3<f32>(0.5) - vec3<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2)), vec3<f32>(0.0));
    m = m * m;
    m = m * m;
    let x = 2.0 * fract(p * C.www) - 1.0;
    let h = abs(x) - 0.5;
    let ox = floor(x + 0.5);
    let a0 = x - ox;
    m = m * (1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h));
    let g = vec3<f32>(a0.x * x0.x + h.x * x0.y, a0.y * x1.x + h.y * x1.y, a0.z * x2.x + h.z * x2.y);
    return 130.0 * dot(m, g);
}

fn get_img_uv(v_uv: vec2<f32>) -> vec2<f32> {
    var img_uv = v_uv - 0.5;
    if (u.ratio > u.img_ratio) {
        img_uv.x = img_uv.x * u.ratio / u.img_ratio;
    } else {
        img_uv.y = img_uv.y * u.img_ratio / u.ratio;
    }
    img_uv = img_uv + 0.5;
    img_uv.y = 1.0 - img_uv.y;
    return img_uv;
}

fn rotate(v: vec2<f32>, th: f32) -> vec2<f32> {
    return vec2<f32>(cos(th) * v.x - sin(th) * v.y, sin(th) * v.x + cos(th) * v.y);
}

fn get_color_channel(c1: f32, c2: f32, stripe_p: f32, w: vec3<f32>, extra_blur: f32, bulge: f32) -> f32 {
    var ch = c2;
    let blur = u.pattern_blur + extra_blur;
    ch = mix(ch, c1, sstep(0.0, blur, stripe_p));
    var border = w.x;
    ch = mix(ch, c2, sstep(border - blur, border + blur, stripe_p));
    let b = sstep(0.2, 0.8, bulge);
    border = w.x + 0.4 * (1.0 - b) * w.y;
    ch = mix(ch, c1, sstep(border - blur, border + blur, stripe_p));
    border = w.x + 0.5 * (1.0 - b) * w.y;
    ch = mix(ch, c2, sstep(border - blur, border + blur, stripe_p));
    border = w.x + w.y;
    ch = mix(ch, c1, sstep(border - blur, border + blur, stripe_p));
    let gradient_t = (stripe_p - w.x - w.y) / w.z;
    let gradient = mix(c1, c2, sstep(0.0, 1.0, gradient_t));
    ch = mix(ch, gradient, sstep(border - blur, border + blur, stripe_p));
    return ch;
}

fn get_img_frame_alpha(uv: vec2<f32>, width: f32) -> f32 {
    var alpha = sstep(0.0, width, uv.x) * sstep(1.0, 1.0 - width, uv.x);
    alpha = alpha * sstep(0.0, width, uv.y) * sstep(1.0, 1.0 - width, uv.y);
    return alpha;
}

fn bayer2(cell: vec2<u32>) -> f32 {
    var table = array<f32, 4>(0.0, 2.0, 3.0, 1.0);
    return table[cell.x * 2u + cell.y] / 4.0;
}

fn bayer4(cell: vec2<u32>) -> f32 {
    var table = array<f32, 16>(
        0.0, 8.0, 2.0, 10.0,
        12.0, 4.0, 14.0, 6.0,
        3.0, 11.0, 1.0, 9.0,
        15.0, 7.0, 13.0, 5.0,
    );
    return table[cell.x * 4u + cell.y] / 16.0;
}

fn bayer8(cell: vec2<u32>) -> f32 {
    var value = 0u;
    for (var bit = 0u; bit < 3u; bit = bit + 1u) {
        let xb = (cell.x >> bit) & 1u;
        let yb = (cell.y >> bit) & 1u;
        let c = ((xb ^ yb) << 1u) | yb;
        value = value | (c << (2u * (2u - bit)));
    }
    return f32(value) / 64.0;
}

fn ordered_cell(pos: vec2<f32>, size: f32) -> vec2<u32> {
    return vec2<u32>(pos - floor(pos / size) * size);
}

fn floyd_value(pos: vec2<f32>) -> f32 {
    let noise = fract(sin(dot(pos * 0.01, vec2<f32>(12.9898, 78.233))) * 43758.5453);
    let pattern = fract(pos.x * 0.13 + pos.y * 0.17 + noise * 0.1);
    let diagonal = fract((pos.x + pos.y) * 0.11);
    return mix(pattern, diagonal, 0.4);
}

fn random_value(pos: vec2<f32>) -> f32 {
    return fract(sin(dot(pos, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

fn halftone_value(pos: vec2<f32>) -> f32 {
    var angle = 0.785398;
    if (u.halftone_type == 1) {
        angle = 0.087266;
    } else if (u.halftone_type == 2) {
        angle = 0.261799;
    } else if (u.halftone_type == 3) {
        angle = 0.523599;
    } else if (u.halftone_type == 4) {
        angle = 1.0472;
    }
    let rotated = vec2<f32>(
        pos.x * cos(angle) - pos.y * sin(angle),
        pos.x * sin(angle) + pos.y * cos(angle),
    );
    var scaled = rotated * u.halftone_size;
    scaled = scaled + snoise(scaled * 0.1) * 0.05;
    var grid = fract(scaled) - 0.5;
    grid = grid + 0.03 * vec2<f32>(sin(scaled.y * 3.0), sin(scaled.x * 2.7));

    var dist = length(grid);
    var threshold = 0.25;
    var softness = 0.07;
    if (u.halftone_type == 1) {
        dist = 0.5 - 0.5 * sin(grid.y * PI * 2.0 + scaled.x * 0.2);
        threshold = 0.5;
        softness = 0.1;
    } else if (u.halftone_type == 2) {
        dist = abs(grid.x) + abs(grid.y);
        threshold = 0.3;
        softness = 0.08;
    } else if (u.halftone_type == 3) {
        dist = min(abs(grid.x), abs(grid.y));
        threshold = 0.15 + 0.05 * sin(scaled.x * 0.5);
        softness = 0.05;
    } else if (u.halftone_type == 4) {
        threshold = 0.2 + 0.05 * sin(scaled.x * 0.7 + scaled.y * 0.9);
        softness = 0.04;
    }
    return sstep(threshold - softness, threshold + softness, dist);
}

fn dither_threshold(pos: vec2<f32>) -> f32 {
    var threshold = 1.0;
    switch u.dither_type {
        case 1: { threshold = bayer2(ordered_cell(pos, 2.0)); }
        case 2: { threshold = bayer4(ordered_cell(pos, 4.0)); }
        case 3: { threshold = bayer8(ordered_cell(pos, 8.0)); }
        case 4: { threshold = floyd_value(pos); }
        case 5: { threshold = random_value(pos); }
        case 6: { threshold = halftone_value(pos); }
        default: {}
    }
    return threshold;
}

fn quantize(value: f32, threshold: f32) -> f32 {
    var dithered = 0.0;
    if (u.dither_type == 6) {
        let adjusted = mix(0.7, 0.3, value) * threshold;
        dithered = sstep(adjusted - 0.15, adjusted + 0.15, 0.5);
    } else {
        dithered = select(1.0, 0.0, value < threshold);
    }
    return mix(value, dithered, u.dither_intensity);
}

@fragment
fn main(@builtin(position) position: vec4<f32>) -> @location(0) vec4<f32> {
    let frag = vec2<f32>(position.x, u.height - position.y);
    let v_uv = frag / vec2<f32>(u.width, u.height);

    var uv = v_uv;
    uv.y = 1.0 - uv.y;
    uv.x = uv.x * u.ratio;
    let diagonal = uv.x - uv.y;
    let t = u.time;

    let img_uv = get_img_uv(v_uv);
    let img = textureSample(image_texture, image_sampler, img_uv);

    let color1 = vec3<f32>(0.98, 0.98, 1.0);
    let color2 = vec3<f32>(0.1, 0.1, 0.1 + 0.1 * sstep(0.7, 1.3, uv.x + uv.y));

    var edge = img.r;

    var grad_uv = uv - 0.5;
    let dist = length(grad_uv + vec2<f32>(0.0, 0.2 * diagonal));
    grad_uv = rotate(grad_uv, (0.25 - 0.2 * diagonal) * PI);

    var bulge = 1.0 - pow(1.8 * dist, 1.2);
    bulge = bulge * pow(max(uv.y, 0.0), 0.3);

    let cycle_width = u.pattern_scale;
    let thin_1_ratio = 0.12 / cycle_width * (1.0 - 0.4 * bulge);
    let thin_2_ratio = 0.07 / cycle_width * (1.0 + 0.4 * bulge);
    let wide_ratio = 1.0 - thin_1_ratio - thin_2_ratio;
    let thin_1_width = cycle_width * thin_1_ratio;
    let thin_2_width = cycle_width * thin_2_ratio;

    var opacity = 1.0 - sstep(0.9 - 0.5 * u.edge, 1.0 - 0.5 * u.edge, edge);
    opacity = opacity * get_img_frame_alpha(img_uv, 0.01);

    let noise = snoise(uv - t);
    edge = edge + (1.0 - edge) * u.liquid * noise;

    let refr = clamp(1.0 - bulge, 0.0, 1.0);

    var dir = grad_uv.x + diagonal;
    dir = dir - 2.0 * noise * diagonal * (sstep(0.0, 1.0, edge) * sstep(1.0, 0.0, edge));
    bulge = bulge * clamp(pow(max(uv.y, 0.0), 0.1), 0.3, 1.0);
    dir = dir * (0.1 + (1.1 - edge) * bulge);
    dir = dir * sstep(1.0, 0.7, edge);
    dir = dir + 0.18 * (sstep(0.1, 0.2, uv.y) * sstep(0.4, 0.2, uv.y));
    dir = dir + 0.03 * (sstep(0.1, 0.2, 1.0 - uv.y) * sstep(0.4, 0.2, 1.0 - uv.y));
    dir = dir * (0.5 + 0.5 * uv.y * uv.y);
    dir = dir * cycle_width;
    dir = dir - t;

    var refr_r = refr + 0.03 * bulge * noise;
    var refr_b = 1.3 * refr;
    refr_r = refr_r + 5.0 * (sstep(-0.1, 0.2, uv.y) * sstep(0.5, 0.1, uv.y)) * (sstep(0.4, 0.6, bulge) * sstep(1.0, 0.4, bulge));
    refr_r = refr_r - diagonal;
    refr_b = refr_b + (sstep(0.0, 0.4, uv.y) * sstep(0.8, 0.1, uv.y)) * (sstep(0.4, 0.6, bulge) * sstep(0.8, 0.4, bulge));
    refr_b = refr_b - 0.2 * edge;
    refr_r = refr_r * u.refraction;
    refr_b = refr_b * u.refraction;

    var w = vec3<f32>(thin_1_width, thin_2_width, wide_ratio);
    w.y = w.y - 0.02 * sstep(0.0, 1.0, edge + bulge);

    let r = get_color_channel(color1.r, color2.r, fract(dir + refr_r), w, 0.02 + 0.03 * u.refraction * bulge, bulge);
    let g = get_color_channel(color1.g, color2.g, fract(dir), w, 0.01 / (1.0 - diagonal), bulge);
    let b = get_color_channel(color1.b, color2.b, fract(dir - refr_b), w, 0.01, bulge);
    var color = vec3<f32>(r, g, b);

    if (u.dither_type > 0 && u.dither_intensity > 0.0 && opacity > 0.05) {
        let threshold = dither_threshold(frag);
        let safe = clamp(color, vec3<f32>(0.01), vec3<f32>(0.99));
        color = vec3<f32>(quantize(safe.r, threshold), quantize(safe.g, threshold), quantize(safe.b, threshold));
    }

    return vec4<f32>(color * opacity, opacity);
}
";
