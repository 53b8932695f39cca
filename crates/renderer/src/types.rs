use std::fmt;
use std::str::FromStr;

/// Inclusive numeric range a parameter must stay within before it reaches the
/// effect core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamps `value` into the range; NaN collapses to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const PATTERN_SCALE: ParamRange = ParamRange::new(1.0, 10.0, 2.0);
pub const REFRACTION: ParamRange = ParamRange::new(0.0, 0.06, 0.015);
pub const EDGE: ParamRange = ParamRange::new(0.0, 1.0, 0.4);
pub const PATTERN_BLUR: ParamRange = ParamRange::new(0.0, 0.1, 0.005);
pub const LIQUID: ParamRange = ParamRange::new(0.0, 1.0, 0.07);
pub const SPEED: ParamRange = ParamRange::new(0.0, 5.0, 0.3);
pub const DITHER_INTENSITY: ParamRange = ParamRange::new(0.0, 1.0, 1.0);
pub const HALFTONE_SIZE: ParamRange = ParamRange::new(0.01, 1.0, 0.15);

/// Continuous controls of the liquid-metal pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderParams {
    pub pattern_scale: f32,
    pub refraction: f32,
    pub edge: f32,
    pub pattern_blur: f32,
    pub liquid: f32,
    /// Rate of simulated time relative to display time.
    pub speed: f32,
}

impl Default for ShaderParams {
    fn default() -> Self {
        Self {
            pattern_scale: PATTERN_SCALE.default,
            refraction: REFRACTION.default,
            edge: EDGE.default,
            pattern_blur: PATTERN_BLUR.default,
            liquid: LIQUID.default,
            speed: SPEED.default,
        }
    }
}

impl ShaderParams {
    /// Returns a copy with every field forced into its valid range.
    pub fn clamped(&self) -> Self {
        Self {
            pattern_scale: PATTERN_SCALE.clamp(self.pattern_scale),
            refraction: REFRACTION.clamp(self.refraction),
            edge: EDGE.clamp(self.edge),
            pattern_blur: PATTERN_BLUR.clamp(self.pattern_blur),
            liquid: LIQUID.clamp(self.liquid),
            speed: SPEED.clamp(self.speed),
        }
    }

    /// Names of fields that sit outside their valid range.
    pub fn out_of_range(&self) -> Vec<&'static str> {
        let checks = [
            ("pattern_scale", PATTERN_SCALE, self.pattern_scale),
            ("refraction", REFRACTION, self.refraction),
            ("edge", EDGE, self.edge),
            ("pattern_blur", PATTERN_BLUR, self.pattern_blur),
            ("liquid", LIQUID, self.liquid),
            ("speed", SPEED, self.speed),
        ];
        checks
            .into_iter()
            .filter(|(_, range, value)| !range.contains(*value))
            .map(|(name, _, _)| name)
            .collect()
    }
}

/// Dithering algorithm applied after the pattern is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DitherType {
    #[default]
    None,
    Bayer2x2,
    Bayer4x4,
    Bayer8x8,
    /// Single-pass approximation of Floyd-Steinberg; no error propagation.
    FloydSteinberg,
    Random,
    Halftone,
}

impl DitherType {
    pub const ALL: [DitherType; 7] = [
        DitherType::None,
        DitherType::Bayer2x2,
        DitherType::Bayer4x4,
        DitherType::Bayer8x8,
        DitherType::FloydSteinberg,
        DitherType::Random,
        DitherType::Halftone,
    ];

    /// Integer code shared with the GPU program.
    pub fn code(self) -> i32 {
        match self {
            DitherType::None => 0,
            DitherType::Bayer2x2 => 1,
            DitherType::Bayer4x4 => 2,
            DitherType::Bayer8x8 => 3,
            DitherType::FloydSteinberg => 4,
            DitherType::Random => 5,
            DitherType::Halftone => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DitherType::None => "none",
            DitherType::Bayer2x2 => "bayer2x2",
            DitherType::Bayer4x4 => "bayer4x4",
            DitherType::Bayer8x8 => "bayer8x8",
            DitherType::FloydSteinberg => "floydSteinberg",
            DitherType::Random => "random",
            DitherType::Halftone => "halftone",
        }
    }
}

impl fmt::Display for DitherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DitherType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "none" | "off" => Ok(DitherType::None),
            "bayer2x2" | "bayer2" => Ok(DitherType::Bayer2x2),
            "bayer4x4" | "bayer4" => Ok(DitherType::Bayer4x4),
            "bayer8x8" | "bayer8" => Ok(DitherType::Bayer8x8),
            "floydsteinberg" | "floyd" => Ok(DitherType::FloydSteinberg),
            "random" | "noise" => Ok(DitherType::Random),
            "halftone" => Ok(DitherType::Halftone),
            _ => Err(format!(
                "unknown dither type '{}'; expected none, bayer2x2, bayer4x4, bayer8x8, floydSteinberg, random, or halftone",
                value.trim()
            )),
        }
    }
}

/// Mark shape used by the halftone dither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum HalftoneShape {
    #[default]
    Circles,
    Lines,
    Diamonds,
    Crosses,
    Dots,
}

impl HalftoneShape {
    pub const ALL: [HalftoneShape; 5] = [
        HalftoneShape::Circles,
        HalftoneShape::Lines,
        HalftoneShape::Diamonds,
        HalftoneShape::Crosses,
        HalftoneShape::Dots,
    ];

    pub fn code(self) -> i32 {
        match self {
            HalftoneShape::Circles => 0,
            HalftoneShape::Lines => 1,
            HalftoneShape::Diamonds => 2,
            HalftoneShape::Crosses => 3,
            HalftoneShape::Dots => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HalftoneShape::Circles => "circles",
            HalftoneShape::Lines => "lines",
            HalftoneShape::Diamonds => "diamonds",
            HalftoneShape::Crosses => "crosses",
            HalftoneShape::Dots => "dots",
        }
    }
}

impl fmt::Display for HalftoneShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HalftoneShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "circles" | "circle" => Ok(HalftoneShape::Circles),
            "lines" | "line" => Ok(HalftoneShape::Lines),
            "diamonds" | "diamond" => Ok(HalftoneShape::Diamonds),
            "crosses" | "cross" => Ok(HalftoneShape::Crosses),
            "dots" | "dot" => Ok(HalftoneShape::Dots),
            other => Err(format!(
                "unknown halftone shape '{other}'; expected circles, lines, diamonds, crosses, or dots"
            )),
        }
    }
}

/// Post-process controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectParams {
    pub dither: DitherType,
    /// Blend factor between the undithered and the quantised colour.
    pub intensity: f32,
    pub halftone_shape: HalftoneShape,
    /// Scale applied to screen positions before the halftone grid; smaller
    /// values give larger marks.
    pub halftone_size: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            dither: DitherType::None,
            intensity: DITHER_INTENSITY.default,
            halftone_shape: HalftoneShape::Circles,
            halftone_size: HALFTONE_SIZE.default,
        }
    }
}

impl EffectParams {
    pub fn clamped(&self) -> Self {
        Self {
            dither: self.dither,
            intensity: DITHER_INTENSITY.clamp(self.intensity),
            halftone_shape: self.halftone_shape,
            halftone_size: HALFTONE_SIZE.clamp(self.halftone_size),
        }
    }
}

/// Which compositor implementation evaluates the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// wgpu fragment program rendered offscreen.
    #[default]
    Gpu,
    /// Parallel per-pixel loop on the CPU.
    Cpu,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Gpu => f.write_str("gpu"),
            Backend::Cpu => f.write_str("cpu"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gpu" | "wgpu" => Ok(Backend::Gpu),
            "cpu" | "software" => Ok(Backend::Cpu),
            other => Err(format!("unknown backend '{other}'; expected gpu or cpu")),
        }
    }
}

/// Configuration handed to a compositor when a render session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Output frame size in physical pixels.
    pub surface_size: (u32, u32),
    pub shader: ShaderParams,
    pub effects: EffectParams,
    pub backend: Backend,
}

impl Default for RendererConfig {
    /// Square 1000px viewport.
    fn default() -> Self {
        Self {
            surface_size: (1000, 1000),
            shader: ShaderParams::default(),
            effects: EffectParams::default(),
            backend: Backend::default(),
        }
    }
}

impl RendererConfig {
    pub fn viewport_ratio(&self) -> f32 {
        let (width, height) = self.surface_size;
        width.max(1) as f32 / height.max(1) as f32
    }
}
