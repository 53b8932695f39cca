use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use capture::{capture_from_compositor, CaptureSession, GifFile, DEFAULT_FILE_NAME};
use presets::{
    EffectsSection, ExportSection, Preset, ResolvedPreset, ShaderSection, Validation,
};
use renderer::{
    create_compositor, Backend, BoxedCompositor, FrameCompositor, RenderError, RendererConfig,
    SourceImage,
};
use tracing_subscriber::EnvFilter;

use crate::cli::{EffectArgs, ExportArgs, ParamsArgs, PreviewArgs, StillArgs};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run_still(args: StillArgs) -> Result<()> {
    let resolved = resolve_preset(&args.effect, ExportSection::default())?;
    let image = load_image(&args.image)?;
    let config = renderer_config(&resolved, args.size, args.effect.backend);
    let mut compositor = compositor_with_fallback(&config, &image)?;

    let frame = compositor
        .compose(args.time)
        .with_context(|| format!("failed to render frame at t={}s", args.time))?;
    frame
        .to_straight_alpha()
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    tracing::info!(
        path = %args.output.display(),
        width = frame.width(),
        height = frame.height(),
        time = args.time,
        "wrote still frame"
    );
    Ok(())
}

pub fn run_export(args: ExportArgs) -> Result<()> {
    let overrides = ExportSection {
        frame_count: args.frames,
        frame_delay: args.delay.map(Duration::from_millis),
        fps: args.fps,
        quality: args.quality,
        size: args.size,
        transparent: args.opaque.then_some(false),
        timing: args.timing,
        start_time: args.start_time,
        output: args.output.clone(),
    };
    let resolved = resolve_preset(&args.effect, overrides)?;
    let image = load_image(&args.image)?;

    let options = resolved.export.clone();
    let render_size = args.render_size.unwrap_or((options.size, options.size));
    let config = renderer_config(&resolved, render_size, args.effect.backend);
    let compositor = compositor_with_fallback(&config, &image)?;

    let output = resolved
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));
    tracing::info!(
        frames = options.frame_count,
        delay_ms = options.frame_delay.as_millis() as u64,
        framerate = %capture::Framerate::for_delay(options.frame_delay),
        size = options.size,
        timing = %options.timing,
        path = %output.display(),
        "exporting animation"
    );

    let session = CaptureSession::new(options).with_progress(report_progress);
    let mut encoder = GifFile::new(&output);
    let written = capture_from_compositor(
        compositor,
        resolved.shader,
        resolved.effects,
        session,
        &mut encoder,
    )
    .with_context(|| format!("failed to export {}", output.display()))?;
    println!("{}", written.display());
    Ok(())
}

pub fn run_preview(args: PreviewArgs) -> Result<()> {
    if args.effect.backend == Backend::Cpu {
        bail!("the preview window always renders on the GPU; drop --backend cpu");
    }
    let resolved = resolve_preset(&args.effect, ExportSection::default())?;
    let image = load_image(&args.image)?;
    let config = renderer_config(&resolved, args.size, Backend::Gpu);
    renderer::run_preview(config, image)
}

pub fn run_params(args: ParamsArgs) -> Result<()> {
    if args.toml {
        print!("{}", Preset::defaults().to_toml_string()?);
        return Ok(());
    }
    let mut out = std::io::stdout().lock();
    write_param_table(&mut out)?;
    Ok(())
}

fn write_param_table(out: &mut impl Write) -> std::io::Result<()> {
    use capture::options::{
        FRAME_COUNT_RANGE, FRAME_DELAY_MS_RANGE, QUALITY_RANGE, SIZE_RANGE,
    };
    use renderer::types::{
        DITHER_INTENSITY, EDGE, HALFTONE_SIZE, LIQUID, PATTERN_BLUR, PATTERN_SCALE, REFRACTION,
        SPEED,
    };

    let defaults = capture::CaptureOptions::default();
    writeln!(out, "{:<18} {:>6} {:>6} {:>8}", "parameter", "min", "max", "default")?;
    for (name, range) in [
        ("pattern_scale", PATTERN_SCALE),
        ("refraction", REFRACTION),
        ("edge", EDGE),
        ("pattern_blur", PATTERN_BLUR),
        ("liquid", LIQUID),
        ("speed", SPEED),
        ("dither_intensity", DITHER_INTENSITY),
        ("halftone_size", HALFTONE_SIZE),
    ] {
        writeln!(
            out,
            "{name:<18} {:>6} {:>6} {:>8}",
            range.min, range.max, range.default
        )?;
    }
    for (name, min, max, default) in [
        (
            "frame_count",
            u64::from(*FRAME_COUNT_RANGE.start()),
            u64::from(*FRAME_COUNT_RANGE.end()),
            u64::from(defaults.frame_count),
        ),
        (
            "frame_delay (ms)",
            *FRAME_DELAY_MS_RANGE.start(),
            *FRAME_DELAY_MS_RANGE.end(),
            defaults.frame_delay.as_millis() as u64,
        ),
        (
            "quality",
            u64::from(*QUALITY_RANGE.start()),
            u64::from(*QUALITY_RANGE.end()),
            u64::from(defaults.quality),
        ),
        (
            "size (px)",
            u64::from(*SIZE_RANGE.start()),
            u64::from(*SIZE_RANGE.end()),
            u64::from(defaults.size),
        ),
    ] {
        writeln!(out, "{name:<18} {min:>6} {max:>6} {default:>8}")?;
    }

    let dithers: Vec<&str> = renderer::DitherType::ALL.iter().map(|d| d.name()).collect();
    let shapes: Vec<&str> = renderer::HalftoneShape::ALL
        .iter()
        .map(|s| s.name())
        .collect();
    writeln!(out)?;
    writeln!(out, "dither types:     {}", dithers.join(", "))?;
    writeln!(out, "halftone shapes:  {}", shapes.join(", "))?;
    writeln!(
        out,
        "standard rates:   {} fps",
        capture::framerate::STANDARD_FRAMERATES
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    )?;
    Ok(())
}

/// Layers CLI flags over the preset file (if any) and resolves the result.
fn resolve_preset(effect: &EffectArgs, export: ExportSection) -> Result<ResolvedPreset> {
    let mut preset = match &effect.preset {
        Some(path) => Preset::load(path)?,
        None => Preset::default(),
    };
    let overrides = Preset {
        shader: ShaderSection {
            pattern_scale: effect.pattern_scale,
            refraction: effect.refraction,
            edge: effect.edge,
            pattern_blur: effect.pattern_blur,
            liquid: effect.liquid,
            speed: effect.speed,
        },
        effects: EffectsSection {
            dither: effect.dither,
            intensity: effect.intensity,
            halftone_shape: effect.halftone_shape,
            halftone_size: effect.halftone_size,
        },
        export,
    };
    preset.merge(&overrides);

    let validation = if effect.clamp {
        Validation::Clamp
    } else {
        Validation::Strict
    };
    let resolved = preset
        .resolve(validation)
        .context("invalid effect parameters (pass --clamp to force them into range)")?;
    tracing::debug!(
        shader = ?resolved.shader,
        effects = ?resolved.effects,
        "resolved effect parameters"
    );
    Ok(resolved)
}

fn renderer_config(resolved: &ResolvedPreset, size: (u32, u32), backend: Backend) -> RendererConfig {
    RendererConfig {
        surface_size: size,
        shader: resolved.shader,
        effects: resolved.effects,
        backend,
    }
}

fn load_image(path: &Path) -> Result<SourceImage> {
    let decoded = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    let image = SourceImage::from_rgba(width, height, decoded.into_raw())
        .with_context(|| format!("unusable image {}", path.display()))?;
    tracing::debug!(path = %path.display(), width, height, "loaded logo");
    Ok(image)
}

/// Builds the requested compositor, dropping to the CPU when no GPU adapter
/// or device is available.
fn compositor_with_fallback(config: &RendererConfig, image: &SourceImage) -> Result<BoxedCompositor> {
    match create_compositor(config, image) {
        Ok(compositor) => Ok(compositor),
        Err(err @ (RenderError::NoAdapter(_) | RenderError::Device(_)))
            if config.backend == Backend::Gpu =>
        {
            tracing::warn!(error = %err, "GPU unavailable; rendering on the CPU");
            let cpu = RendererConfig {
                backend: Backend::Cpu,
                ..config.clone()
            };
            create_compositor(&cpu, image).context("failed to create CPU compositor")
        }
        Err(err) => Err(err).context("failed to create compositor"),
    }
}

fn report_progress(done: u32, total: u32) {
    tracing::debug!(done, total, "captured frame");
    if done == total || done % 10 == 0 {
        tracing::info!("captured {done}/{total} frames");
    }
}
