use std::path::PathBuf;

use capture::CaptureTiming;
use clap::{Args, Parser, Subcommand};
use renderer::{Backend, DitherType, HalftoneShape};

#[derive(Parser, Debug)]
#[command(
    name = "liquidmetal",
    author,
    version,
    about = "Liquid-metal logo effect: stills, GIF export and a live preview"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a single frame to a PNG.
    Still(StillArgs),
    /// Capture an animation and encode it as a looping GIF.
    Export(ExportArgs),
    /// Animate the effect in a window (Space pauses, Escape quits).
    Preview(PreviewArgs),
    /// Print parameter ranges and defaults.
    Params(ParamsArgs),
}

/// Effect parameters shared by every rendering command. Flags override the
/// preset, which overrides the built-in defaults.
#[derive(Args, Debug, Default)]
pub struct EffectArgs {
    /// Preset TOML file with `[shader]`, `[effects]` and `[export]` tables.
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,

    /// Clamp out-of-range values into range instead of failing.
    #[arg(long)]
    pub clamp: bool,

    /// Stripe density (1-10).
    #[arg(long, value_name = "SCALE")]
    pub pattern_scale: Option<f32>,

    /// Refraction strength (0-0.06).
    #[arg(long, value_name = "AMOUNT")]
    pub refraction: Option<f32>,

    /// Edge sharpness of the silhouette (0-1).
    #[arg(long, value_name = "AMOUNT")]
    pub edge: Option<f32>,

    /// Blur between stripe bands (0-0.1).
    #[arg(long, value_name = "AMOUNT")]
    pub pattern_blur: Option<f32>,

    /// Noise distortion of the field (0-1).
    #[arg(long, value_name = "AMOUNT")]
    pub liquid: Option<f32>,

    /// Animation speed multiplier (0-5).
    #[arg(long, value_name = "MULTIPLIER")]
    pub speed: Option<f32>,

    /// Dither type: none, bayer2x2, bayer4x4, bayer8x8, floydSteinberg, random, halftone.
    #[arg(long, value_name = "TYPE")]
    pub dither: Option<DitherType>,

    /// Blend between the plain and the dithered colour (0-1).
    #[arg(long, value_name = "AMOUNT")]
    pub intensity: Option<f32>,

    /// Halftone mark: circles, lines, diamonds, crosses, dots.
    #[arg(long, value_name = "SHAPE")]
    pub halftone_shape: Option<HalftoneShape>,

    /// Halftone grid scale (0.01-1).
    #[arg(long, value_name = "SIZE")]
    pub halftone_size: Option<f32>,

    /// Compositor backend: `gpu` (falls back to `cpu` without an adapter) or `cpu`.
    #[arg(
        long,
        value_name = "BACKEND",
        env = "LIQUIDMETAL_BACKEND",
        default_value_t = Backend::default()
    )]
    pub backend: Backend,
}

#[derive(Args, Debug)]
pub struct StillArgs {
    /// Logo image (PNG, JPEG, BMP or GIF).
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    #[command(flatten)]
    pub effect: EffectArgs,

    /// Destination PNG.
    #[arg(short, long, value_name = "PATH", default_value = "liquid-metal.png")]
    pub output: PathBuf,

    /// Simulated time to evaluate, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    pub time: f32,

    /// Output resolution.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions, default_value = "1000x1000")]
    pub size: (u32, u32),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Logo image (PNG, JPEG, BMP or GIF).
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    #[command(flatten)]
    pub effect: EffectArgs,

    /// Destination GIF; defaults to the preset's output or `liquid-metal-favicon.gif`.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Number of frames (1-400).
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u32>,

    /// Delay between frames in milliseconds (10-200).
    #[arg(long, value_name = "MILLISECONDS", conflicts_with = "fps")]
    pub delay: Option<u64>,

    /// Frame rate; converted to a whole-millisecond delay.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Palette quality, 1 (best) to 10 (fastest).
    #[arg(long, value_name = "LEVEL")]
    pub quality: Option<u8>,

    /// Edge length of the square GIF (16-2048).
    #[arg(long, value_name = "PIXELS")]
    pub size: Option<u32>,

    /// Flatten onto black instead of keeping transparency.
    #[arg(long)]
    pub opaque: bool,

    /// Frame timing: `fixed` (reproducible) or `live` (sample the running loop).
    #[arg(long, value_name = "MODE")]
    pub timing: Option<CaptureTiming>,

    /// Simulated time of the first frame, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub start_time: Option<f32>,

    /// Render resolution before letterboxing; defaults to the GIF size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub render_size: Option<(u32, u32)>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Logo image (PNG, JPEG, BMP or GIF).
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    #[command(flatten)]
    pub effect: EffectArgs,

    /// Initial window size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions, default_value = "1000x1000")]
    pub size: (u32, u32),
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Print the defaults as a preset file instead of a table.
    #[arg(long)]
    pub toml: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_dimensions() {
        assert_eq!(parse_dimensions("640x480").unwrap(), (640, 480));
        assert_eq!(parse_dimensions(" 32 X 16 ").unwrap(), (32, 16));
        assert!(parse_dimensions("640").is_err());
        assert!(parse_dimensions("0x10").is_err());
        assert!(parse_dimensions("ax10").is_err());
    }

    #[test]
    fn parses_export_flags() {
        let cli = Cli::try_parse_from([
            "liquidmetal",
            "export",
            "logo.png",
            "--dither",
            "floyd-steinberg",
            "--halftone-shape",
            "dots",
            "--frames",
            "12",
            "--fps",
            "25",
            "--timing",
            "live",
            "--backend",
            "cpu",
            "--opaque",
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.effect.dither, Some(DitherType::FloydSteinberg));
        assert_eq!(args.effect.halftone_shape, Some(HalftoneShape::Dots));
        assert_eq!(args.effect.backend, Backend::Cpu);
        assert_eq!(args.frames, Some(12));
        assert_eq!(args.fps, Some(25.0));
        assert_eq!(args.timing, Some(CaptureTiming::Live));
        assert!(args.opaque);
    }

    #[test]
    fn delay_and_fps_conflict() {
        let result = Cli::try_parse_from([
            "liquidmetal",
            "export",
            "logo.png",
            "--delay",
            "40",
            "--fps",
            "25",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_dither() {
        let result = Cli::try_parse_from(["liquidmetal", "still", "logo.png", "--dither", "glitter"]);
        assert!(result.is_err());
    }
}
