use image::{Rgba, RgbaImage};

/// One fully resolved output frame. Pixels carry premultiplied alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
    /// Simulated time the frame was evaluated at, in seconds.
    time: f32,
}

impl Frame {
    pub fn new(image: RgbaImage, time: f32) -> Self {
        Self { image, time }
    }

    /// Wraps a tightly packed RGBA8 buffer; `None` when the length does not
    /// match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>, time: f32) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self::new(image, time))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    /// Copy with colour divided back out of alpha, as most image encoders
    /// expect straight alpha.
    pub fn to_straight_alpha(&self) -> RgbaImage {
        let mut out = self.image.clone();
        for pixel in out.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            if a == 0 {
                pixel.0 = [0, 0, 0, 0];
                continue;
            }
            let unpremultiply = |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
            pixel.0 = [unpremultiply(r), unpremultiply(g), unpremultiply(b), a];
        }
        out
    }
}

/// Converts a unit-range colour and opacity into a premultiplied RGBA8 pixel.
pub fn premultiplied_pixel(color: [f32; 3], opacity: f32) -> [u8; 4] {
    let alpha = opacity.clamp(0.0, 1.0);
    let to_byte = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    let a = to_byte(alpha);
    let channel = |c: f32| to_byte(c.clamp(0.0, 1.0) * alpha).min(a);
    [channel(color[0]), channel(color[1]), channel(color[2]), a]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiplied_channels_never_exceed_alpha() {
        for step in 0..=20 {
            let opacity = step as f32 / 20.0;
            let [r, g, b, a] = premultiplied_pixel([1.0, 0.98, 0.5], opacity);
            assert!(r <= a && g <= a && b <= a);
        }
        assert_eq!(premultiplied_pixel([0.5, 0.5, 0.5], 0.0), [0, 0, 0, 0]);
        assert_eq!(premultiplied_pixel([2.0, -1.0, 1.0], 1.0), [255, 0, 255, 255]);
    }

    #[test]
    fn straight_alpha_restores_colour() {
        let frame = Frame::from_raw(1, 1, vec![64, 32, 0, 128], 0.0).unwrap();
        let straight = frame.to_straight_alpha();
        assert_eq!(straight.get_pixel(0, 0).0, [128, 64, 0, 128]);
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(Frame::from_raw(2, 2, vec![0; 15], 0.0).is_none());
    }
}
