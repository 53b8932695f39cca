use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use renderer::Frame;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Dimensions of `width × height` scaled to fit inside a `size` square with
/// its aspect ratio preserved.
pub fn fitted_size(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = (size as f64 / width as f64).min(size as f64 / height as f64);
    let fit = |extent: u32| ((extent as f64 * scale).round() as u32).clamp(1, size);
    (fit(width), fit(height))
}

/// Scales `frame` into a centred `size × size` canvas with straight alpha.
///
/// Padding is transparent when `transparent` is set. Otherwise the frame is
/// flattened onto opaque black, padding included.
pub fn letterbox(frame: &Frame, size: u32, transparent: bool) -> RgbaImage {
    let (fit_width, fit_height) = fitted_size(frame.width(), frame.height(), size);

    // Resample while still premultiplied so transparent texels do not bleed
    // black into the edges.
    let scaled = if (fit_width, fit_height) == (frame.width(), frame.height()) {
        frame.clone()
    } else {
        let resized = imageops::resize(frame.image(), fit_width, fit_height, FilterType::Triangle);
        Frame::new(resized, frame.time())
    };

    let content = if transparent {
        scaled.to_straight_alpha()
    } else {
        // Premultiplied colour is exactly the frame composited over black.
        let mut flat = scaled.into_image();
        for pixel in flat.pixels_mut() {
            pixel.0[3] = 255;
        }
        flat
    };

    let background = if transparent { TRANSPARENT } else { OPAQUE_BLACK };
    let mut canvas = RgbaImage::from_pixel(size, size, background);
    let x = (size - fit_width) / 2;
    let y = (size - fit_height) / 2;
    imageops::replace(&mut canvas, &content, i64::from(x), i64::from(y));
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> Frame {
        Frame::new(RgbaImage::from_pixel(width, height, Rgba(rgba)), 0.0)
    }

    #[test]
    fn fit_preserves_aspect() {
        assert_eq!(fitted_size(200, 100, 256), (256, 128));
        assert_eq!(fitted_size(100, 400, 256), (64, 256));
        assert_eq!(fitted_size(50, 50, 256), (256, 256));
        assert_eq!(fitted_size(1000, 1, 16), (16, 1));
    }

    #[test]
    fn wide_frame_gets_transparent_bars() {
        let frame = solid_frame(64, 32, [255, 255, 255, 255]);
        let boxed = letterbox(&frame, 128, true);
        assert_eq!(boxed.dimensions(), (128, 128));
        assert_eq!(boxed.get_pixel(64, 0).0[3], 0);
        assert_eq!(boxed.get_pixel(64, 127).0[3], 0);
        assert_eq!(boxed.get_pixel(64, 64).0, [255, 255, 255, 255]);
        assert_eq!(boxed.get_pixel(0, 64).0, [255, 255, 255, 255]);
    }

    #[test]
    fn opaque_mode_flattens_onto_black() {
        // Half-transparent white, premultiplied.
        let frame = solid_frame(32, 64, [128, 128, 128, 128]);
        let boxed = letterbox(&frame, 64, false);
        assert_eq!(boxed.get_pixel(0, 32).0, [0, 0, 0, 255]);
        assert_eq!(boxed.get_pixel(32, 32).0, [128, 128, 128, 255]);
        assert!(boxed.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn transparent_mode_restores_straight_alpha() {
        let frame = solid_frame(16, 16, [100, 50, 0, 200]);
        let boxed = letterbox(&frame, 16, true);
        let [r, g, b, a] = boxed.get_pixel(8, 8).0;
        assert_eq!(a, 200);
        assert!(r.abs_diff(128) <= 1, "r = {r}");
        assert!(g.abs_diff(64) <= 1, "g = {g}");
        assert_eq!(b, 0);
    }
}
