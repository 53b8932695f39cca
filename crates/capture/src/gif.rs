use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::imageops::{self, ColorMap};
use image::{Delay, Rgba, RgbaImage};
use renderer::dither::bayer8_threshold;
use renderer::DitherType;

use crate::error::EncodeError;
use crate::session::{Animation, AnimationEncoder};

/// Palette dithering performed before the GIF quantiser sees a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteDither {
    Off,
    /// Ordered 8×8 Bayer offsets.
    Ordered,
    /// Floyd–Steinberg error diffusion.
    ErrorDiffusion,
}

impl From<DitherType> for PaletteDither {
    fn from(dither: DitherType) -> Self {
        match dither {
            DitherType::None => PaletteDither::Off,
            DitherType::FloydSteinberg => PaletteDither::ErrorDiffusion,
            _ => PaletteDither::Ordered,
        }
    }
}

/// Maps export quality (1 best, 10 fastest) onto the encoder's 1..=30 speed.
pub fn encoder_speed(quality: u8) -> i32 {
    let quality = i32::from(quality.clamp(1, 10));
    1 + ((quality - 1) * 29 + 4) / 9
}

const CUBE_LEVELS: u32 = 6;
const CUBE_STEP: u32 = 255 / (CUBE_LEVELS - 1);

/// The 216 colour web-safe cube; alpha passes through untouched.
struct CubePalette;

fn cube_level(channel: u8) -> u32 {
    (u32::from(channel) * (CUBE_LEVELS - 1) + 127) / 255
}

impl ColorMap for CubePalette {
    type Color = Rgba<u8>;

    fn index_of(&self, color: &Rgba<u8>) -> usize {
        let [r, g, b, _] = color.0;
        let index = (cube_level(r) * CUBE_LEVELS + cube_level(g)) * CUBE_LEVELS + cube_level(b);
        index as usize
    }

    fn map_color(&self, color: &mut Rgba<u8>) {
        for channel in &mut color.0[..3] {
            *channel = (cube_level(*channel) * CUBE_STEP) as u8;
        }
    }
}

/// Applies `dither` to a straight-alpha frame in place.
pub fn dither_frame(frame: &mut RgbaImage, dither: PaletteDither) {
    match dither {
        PaletteDither::Off => {}
        PaletteDither::ErrorDiffusion => {
            if frame.width() > 1 && frame.height() > 1 {
                imageops::dither(frame, &CubePalette);
            }
        }
        PaletteDither::Ordered => {
            let spread = CUBE_STEP as f32;
            for (x, y, pixel) in frame.enumerate_pixels_mut() {
                if pixel.0[3] == 0 {
                    continue;
                }
                let offset = (bayer8_threshold(x, y) - 0.5) * spread;
                for channel in &mut pixel.0[..3] {
                    *channel = (f32::from(*channel) + offset).round().clamp(0.0, 255.0) as u8;
                }
                CubePalette.map_color(pixel);
            }
        }
    }
}

/// Writes `animation` as a looping GIF to `writer`.
pub fn write_gif<W: Write>(animation: &Animation, writer: W) -> Result<(), EncodeError> {
    animation.validate()?;
    let dither = PaletteDither::from(animation.dither);
    let speed = encoder_speed(animation.quality);
    tracing::debug!(
        frames = animation.len(),
        size = animation.size,
        speed,
        ?dither,
        transparent = animation.transparent,
        "encoding GIF"
    );

    let mut encoder = GifEncoder::new_with_speed(writer, speed);
    encoder.set_repeat(Repeat::Infinite)?;
    let delay = Delay::from_saturating_duration(animation.delay);
    for frame in animation.frames() {
        let mut frame = frame.clone();
        dither_frame(&mut frame, dither);
        encoder.encode_frame(image::Frame::from_parts(frame, 0, 0, delay))?;
    }
    Ok(())
}

/// Encodes into memory and returns the GIF bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct GifBytes;

impl AnimationEncoder for GifBytes {
    type Output = Vec<u8>;

    fn encode(&mut self, animation: Animation) -> Result<Vec<u8>, EncodeError> {
        let mut bytes = Vec::new();
        write_gif(&animation, &mut bytes)?;
        Ok(bytes)
    }
}

/// Encodes to a file and returns its path. The file only appears once the
/// whole animation has been written.
#[derive(Debug, Clone)]
pub struct GifFile {
    path: PathBuf,
}

impl GifFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".part");
        PathBuf::from(name)
    }

    fn write_to(&self, animation: &Animation, partial: &Path) -> Result<(), EncodeError> {
        let io_error = |source| EncodeError::Io {
            path: partial.to_path_buf(),
            source,
        };
        let file = File::create(partial).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        write_gif(animation, &mut writer)?;
        writer.flush().map_err(io_error)?;
        Ok(())
    }
}

impl AnimationEncoder for GifFile {
    type Output = PathBuf;

    fn encode(&mut self, animation: Animation) -> Result<PathBuf, EncodeError> {
        let partial = self.partial_path();
        if let Err(err) = self.write_to(&animation, &partial) {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        fs::rename(&partial, &self.path).map_err(|source| EncodeError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), frames = animation.len(), "wrote GIF");
        Ok(self.path.clone())
    }
}
