//! TOML presets for liquidmetal.
//!
//! A preset has three optional tables:
//!
//! ```toml
//! [shader]
//! pattern_scale = 2.0
//! speed = 0.3
//!
//! [effects]
//! dither = "bayer4x4"
//! halftone_shape = "circles"
//!
//! [export]
//! frame_count = 60
//! frame_delay = "50ms"
//! size = 512
//! ```
//!
//! Anything left out falls back to the built-in defaults.

use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use capture::options::{FRAME_COUNT_RANGE, FRAME_DELAY_MS_RANGE, QUALITY_RANGE, SIZE_RANGE};
use capture::{delay_for_fps, CaptureOptions, CaptureTiming};
use renderer::types::{
    ParamRange, DITHER_INTENSITY, EDGE, HALFTONE_SIZE, LIQUID, PATTERN_BLUR, PATTERN_SCALE,
    REFRACTION, SPEED,
};
use renderer::{DitherType, EffectParams, HalftoneShape, ShaderParams};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("failed to parse preset: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialise preset: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid preset: {0}")]
    Invalid(String),
    #[error("failed to read preset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How out-of-range values are treated when a preset is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validation {
    /// Reject the preset.
    #[default]
    Strict,
    /// Clamp into range and log a warning.
    Clamp,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    #[serde(default)]
    pub shader: ShaderSection,
    #[serde(default)]
    pub effects: EffectsSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refraction: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_blur: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquid: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EffectsSection {
    #[serde(
        default,
        deserialize_with = "deserialize_parsed_opt",
        serialize_with = "serialize_display_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub dither: Option<DitherType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(
        default,
        deserialize_with = "deserialize_parsed_opt",
        serialize_with = "serialize_display_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub halftone_shape: Option<HalftoneShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halftone_size: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u32>,
    #[serde(
        default,
        deserialize_with = "deserialize_delay_opt",
        serialize_with = "serialize_delay_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_delay: Option<Duration>,
    /// Alternative to `frame_delay`; converted with millisecond rounding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_parsed_opt",
        serialize_with = "serialize_display_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub timing: Option<CaptureTiming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

/// Fully populated parameters produced by [`Preset::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPreset {
    pub shader: ShaderParams,
    pub effects: EffectParams,
    pub export: CaptureOptions,
    pub output: Option<PathBuf>,
}

fn deserialize_parsed_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| value.parse().map_err(de::Error::custom))
        .transpose()
}

fn serialize_display_opt<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: fmt::Display,
{
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

fn serialize_delay_opt<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(delay) => serializer.serialize_u64(delay.as_millis() as u64),
        None => serializer.serialize_none(),
    }
}

/// Frame delays are whole milliseconds when given as numbers, or any
/// `humantime` duration when given as a string.
fn deserialize_delay_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a delay as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid delay '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("delay must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("delay must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v / 1000.0)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

/// Collects out-of-range fields and, in clamp mode, their clamped values.
struct RangeCheck {
    validation: Validation,
    issues: Vec<String>,
}

impl RangeCheck {
    fn new(validation: Validation) -> Self {
        Self {
            validation,
            issues: Vec::new(),
        }
    }

    fn param(&mut self, name: &str, value: Option<f32>, range: ParamRange) -> f32 {
        let Some(value) = value else {
            return range.default;
        };
        if range.contains(value) {
            return value;
        }
        self.issues.push(format!(
            "{name} = {value} (expected {}..={})",
            range.min, range.max
        ));
        range.clamp(value)
    }

    fn bounded<T>(&mut self, name: &str, value: T, range: &RangeInclusive<T>) -> T
    where
        T: PartialOrd + Copy + fmt::Display,
    {
        if range.contains(&value) {
            return value;
        }
        self.issues.push(format!(
            "{name} = {value} (expected {}..={})",
            range.start(),
            range.end()
        ));
        if value < *range.start() {
            *range.start()
        } else {
            *range.end()
        }
    }

    fn finish(self) -> Result<(), PresetError> {
        if self.issues.is_empty() {
            return Ok(());
        }
        let summary = self.issues.join(", ");
        match self.validation {
            Validation::Strict => Err(PresetError::Invalid(format!(
                "values out of range: {summary}"
            ))),
            Validation::Clamp => {
                tracing::warn!(fields = %summary, "clamping out-of-range preset values");
                Ok(())
            }
        }
    }
}

impl Preset {
    pub fn from_toml_str(input: &str) -> Result<Self, PresetError> {
        let preset: Preset = toml::from_str(input)?;
        preset.validate()?;
        Ok(preset)
    }

    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let input = fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let preset = Self::from_toml_str(&input)?;
        tracing::debug!(path = %path.display(), "loaded preset");
        Ok(preset)
    }

    pub fn to_toml_string(&self) -> Result<String, PresetError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Preset with every field spelled out at its default value.
    pub fn defaults() -> Self {
        let shader = ShaderParams::default();
        let effects = EffectParams::default();
        let export = CaptureOptions::default();
        Self {
            shader: ShaderSection {
                pattern_scale: Some(shader.pattern_scale),
                refraction: Some(shader.refraction),
                edge: Some(shader.edge),
                pattern_blur: Some(shader.pattern_blur),
                liquid: Some(shader.liquid),
                speed: Some(shader.speed),
            },
            effects: EffectsSection {
                dither: Some(effects.dither),
                intensity: Some(effects.intensity),
                halftone_shape: Some(effects.halftone_shape),
                halftone_size: Some(effects.halftone_size),
            },
            export: ExportSection {
                frame_count: Some(export.frame_count),
                frame_delay: Some(export.frame_delay),
                fps: None,
                quality: Some(export.quality),
                size: Some(export.size),
                transparent: Some(export.transparent),
                timing: Some(export.timing),
                start_time: Some(export.start_time),
                output: None,
            },
        }
    }

    /// Checks constraints that hold regardless of validation mode.
    pub fn validate(&self) -> Result<(), PresetError> {
        if self.export.frame_delay.is_some() && self.export.fps.is_some() {
            return Err(PresetError::Invalid(
                "export.frame_delay and export.fps are mutually exclusive".into(),
            ));
        }
        if let Some(fps) = self.export.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(PresetError::Invalid(format!(
                    "export.fps must be > 0, got {fps}"
                )));
            }
        }
        if let Some(output) = &self.export.output {
            if output.as_os_str().is_empty() {
                return Err(PresetError::Invalid("export.output may not be empty".into()));
            }
        }
        Ok(())
    }

    /// Layers every value set in `overrides` on top of this preset.
    pub fn merge(&mut self, overrides: &Preset) {
        fn layer<T: Clone>(base: &mut Option<T>, over: &Option<T>) {
            if over.is_some() {
                base.clone_from(over);
            }
        }

        let (shader, over) = (&mut self.shader, &overrides.shader);
        layer(&mut shader.pattern_scale, &over.pattern_scale);
        layer(&mut shader.refraction, &over.refraction);
        layer(&mut shader.edge, &over.edge);
        layer(&mut shader.pattern_blur, &over.pattern_blur);
        layer(&mut shader.liquid, &over.liquid);
        layer(&mut shader.speed, &over.speed);

        let (effects, over) = (&mut self.effects, &overrides.effects);
        layer(&mut effects.dither, &over.dither);
        layer(&mut effects.intensity, &over.intensity);
        layer(&mut effects.halftone_shape, &over.halftone_shape);
        layer(&mut effects.halftone_size, &over.halftone_size);

        let (export, over) = (&mut self.export, &overrides.export);
        // A delay given either way replaces the other form.
        if over.frame_delay.is_some() || over.fps.is_some() {
            export.frame_delay = over.frame_delay;
            export.fps = over.fps;
        }
        layer(&mut export.frame_count, &over.frame_count);
        layer(&mut export.quality, &over.quality);
        layer(&mut export.size, &over.size);
        layer(&mut export.transparent, &over.transparent);
        layer(&mut export.timing, &over.timing);
        layer(&mut export.start_time, &over.start_time);
        layer(&mut export.output, &over.output);
    }

    /// Fills in defaults and applies range validation.
    pub fn resolve(&self, validation: Validation) -> Result<ResolvedPreset, PresetError> {
        self.validate()?;
        let mut check = RangeCheck::new(validation);

        let section = &self.shader;
        let shader = ShaderParams {
            pattern_scale: check.param("shader.pattern_scale", section.pattern_scale, PATTERN_SCALE),
            refraction: check.param("shader.refraction", section.refraction, REFRACTION),
            edge: check.param("shader.edge", section.edge, EDGE),
            pattern_blur: check.param("shader.pattern_blur", section.pattern_blur, PATTERN_BLUR),
            liquid: check.param("shader.liquid", section.liquid, LIQUID),
            speed: check.param("shader.speed", section.speed, SPEED),
        };

        let section = &self.effects;
        let effects = EffectParams {
            dither: section.dither.unwrap_or_default(),
            intensity: check.param("effects.intensity", section.intensity, DITHER_INTENSITY),
            halftone_shape: section.halftone_shape.unwrap_or_default(),
            halftone_size: check.param("effects.halftone_size", section.halftone_size, HALFTONE_SIZE),
        };

        let section = &self.export;
        let defaults = CaptureOptions::default();
        let frame_delay = section
            .frame_delay
            .or_else(|| section.fps.map(delay_for_fps))
            .unwrap_or(defaults.frame_delay);
        let delay_ms = check.bounded(
            "export.frame_delay",
            frame_delay.as_millis() as u64,
            &FRAME_DELAY_MS_RANGE,
        );
        let frame_delay = if FRAME_DELAY_MS_RANGE.contains(&(frame_delay.as_millis() as u64)) {
            frame_delay
        } else {
            Duration::from_millis(delay_ms)
        };
        let start_time = match section.start_time {
            Some(start) if !start.is_finite() || start < 0.0 => {
                check.issues.push(format!("export.start_time = {start} (expected >= 0)"));
                0.0
            }
            Some(start) => start,
            None => defaults.start_time,
        };
        let export = CaptureOptions {
            frame_count: check.bounded(
                "export.frame_count",
                section.frame_count.unwrap_or(defaults.frame_count),
                &FRAME_COUNT_RANGE,
            ),
            frame_delay,
            quality: check.bounded(
                "export.quality",
                section.quality.unwrap_or(defaults.quality),
                &QUALITY_RANGE,
            ),
            size: check.bounded(
                "export.size",
                section.size.unwrap_or(defaults.size),
                &SIZE_RANGE,
            ),
            transparent: section.transparent.unwrap_or(defaults.transparent),
            dither: effects.dither,
            timing: section.timing.unwrap_or_default(),
            start_time,
            speed: shader.speed,
        };

        check.finish()?;
        Ok(ResolvedPreset {
            shader,
            effects,
            export,
            output: section.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[shader]
pattern_scale = 3.5
refraction = 0.02
speed = 1

[effects]
dither = "floydSteinberg"
intensity = 0.5
halftone_shape = "diamonds"

[export]
frame_count = 24
frame_delay = "40ms"
size = 256
transparent = false
timing = "live"
output = "logo.gif"
"#;

    #[test]
    fn parses_sample_preset() {
        let preset = Preset::from_toml_str(SAMPLE).expect("parse preset");
        assert_eq!(preset.shader.pattern_scale, Some(3.5));
        assert_eq!(preset.effects.dither, Some(DitherType::FloydSteinberg));
        assert_eq!(preset.effects.halftone_shape, Some(HalftoneShape::Diamonds));
        assert_eq!(preset.export.frame_delay, Some(Duration::from_millis(40)));

        let resolved = preset.resolve(Validation::Strict).unwrap();
        assert_eq!(resolved.shader.pattern_scale, 3.5);
        assert_eq!(resolved.shader.edge, EDGE.default);
        assert_eq!(resolved.effects.intensity, 0.5);
        assert_eq!(resolved.export.frame_count, 24);
        assert_eq!(resolved.export.size, 256);
        assert!(!resolved.export.transparent);
        assert_eq!(resolved.export.timing, CaptureTiming::Live);
        assert_eq!(resolved.export.dither, DitherType::FloydSteinberg);
        assert_eq!(resolved.export.speed, 1.0);
        assert_eq!(resolved.output.as_deref(), Some(Path::new("logo.gif")));
    }

    #[test]
    fn empty_preset_resolves_to_defaults() {
        let resolved = Preset::from_toml_str("")
            .unwrap()
            .resolve(Validation::Strict)
            .unwrap();
        assert_eq!(resolved.shader, ShaderParams::default());
        assert_eq!(resolved.effects, EffectParams::default());
        assert_eq!(resolved.export, CaptureOptions::default());
        assert_eq!(resolved.output, None);
    }

    #[test]
    fn delay_accepts_milliseconds_or_humantime() {
        let numeric = Preset::from_toml_str("[export]\nframe_delay = 80").unwrap();
        assert_eq!(numeric.export.frame_delay, Some(Duration::from_millis(80)));
        let text = Preset::from_toml_str("[export]\nframe_delay = \"0.1s\"").unwrap();
        assert_eq!(text.export.frame_delay, Some(Duration::from_millis(100)));
        assert!(Preset::from_toml_str("[export]\nframe_delay = -5").is_err());
        assert!(Preset::from_toml_str("[export]\nframe_delay = \"soon\"").is_err());
    }

    #[test]
    fn fps_converts_to_delay() {
        let resolved = Preset::from_toml_str("[export]\nfps = 25")
            .unwrap()
            .resolve(Validation::Strict)
            .unwrap();
        assert_eq!(resolved.export.frame_delay, Duration::from_millis(40));

        let err = Preset::from_toml_str("[export]\nfps = 25\nframe_delay = 40").unwrap_err();
        assert!(matches!(err, PresetError::Invalid(_)));
        let err = Preset::from_toml_str("[export]\nfps = 0").unwrap_err();
        assert!(matches!(err, PresetError::Invalid(_)));
    }

    #[test]
    fn strict_mode_rejects_out_of_range_values() {
        let preset =
            Preset::from_toml_str("[shader]\nrefraction = 0.5\n[export]\nsize = 8").unwrap();
        let err = preset.resolve(Validation::Strict).unwrap_err();
        match err {
            PresetError::Invalid(message) => {
                assert!(message.contains("shader.refraction"), "{message}");
                assert!(message.contains("export.size"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn clamp_mode_forces_values_into_range() {
        let preset = Preset::from_toml_str(
            "[shader]\nrefraction = 0.5\nspeed = -2\n[effects]\nhalftone_size = 0\n[export]\nsize = 8\nframe_delay = 1000\nframe_count = 1000\nquality = 0",
        )
        .unwrap();
        let resolved = preset.resolve(Validation::Clamp).unwrap();
        assert_eq!(resolved.shader.refraction, REFRACTION.max);
        assert_eq!(resolved.shader.speed, 0.0);
        assert_eq!(resolved.effects.halftone_size, HALFTONE_SIZE.min);
        assert_eq!(resolved.export.size, 16);
        assert_eq!(resolved.export.frame_delay, Duration::from_millis(200));
        assert_eq!(resolved.export.frame_count, 400);
        assert_eq!(resolved.export.quality, 1);
        assert!(resolved.export.validate().is_ok());
    }

    #[test]
    fn unknown_names_are_reported() {
        let err = Preset::from_toml_str("[effects]\ndither = \"sparkle\"").unwrap_err();
        assert!(err.to_string().contains("sparkle"), "{err}");
        assert!(Preset::from_toml_str("[shader]\nwobble = 1").is_err());
        assert!(Preset::from_toml_str("[lighting]\nangle = 1").is_err());
    }

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let text = Preset::defaults().to_toml_string().unwrap();
        assert!(text.contains("dither = \"none\""), "{text}");
        assert!(text.contains("frame_delay = 50"), "{text}");
        let reparsed = Preset::from_toml_str(&text).unwrap();
        assert_eq!(reparsed, Preset::defaults());
    }

    #[test]
    fn merge_prefers_overrides() {
        let mut base = Preset::from_toml_str(SAMPLE).unwrap();
        let overrides = Preset {
            shader: ShaderSection {
                speed: Some(2.0),
                ..Default::default()
            },
            export: ExportSection {
                fps: Some(30.0),
                ..Default::default()
            },
            ..Default::default()
        };
        base.merge(&overrides);
        assert_eq!(base.shader.speed, Some(2.0));
        assert_eq!(base.shader.pattern_scale, Some(3.5));
        assert_eq!(base.export.frame_delay, None);
        assert_eq!(base.export.fps, Some(30.0));
        assert_eq!(base.export.frame_count, Some(24));
        let resolved = base.resolve(Validation::Strict).unwrap();
        assert_eq!(resolved.export.frame_delay, Duration::from_millis(33));
    }
}
