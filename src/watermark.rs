use std::fs;
use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};

use crate::config::constants;
use crate::error::{PreflightError, WatermarkError};

/// Stamps a caption into the bottom-right corner of captured stills.
pub struct Watermarker {
    font: Font<'static>,
    text: String,
}

impl Watermarker {
    /// Load the TrueType font at `font_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The font file cannot be read ([`PreflightError::FontUnavailable`])
    /// - The file is not a parsable font ([`WatermarkError::InvalidFont`])
    pub fn load(font_path: &Path, text: String) -> Result<Self> {
        let data = fs::read(font_path).map_err(|e| PreflightError::FontUnavailable {
            path: font_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let font = Font::try_from_vec(data).ok_or_else(|| WatermarkError::InvalidFont {
            path: font_path.display().to_string(),
        })?;

        Ok(Self { font, text })
    }

    /// Render the caption as white text on a black box.
    ///
    /// The box is opaque; transparency is applied when it is composited.
    fn render_stamp(&self) -> RgbaImage {
        let scale = Scale::uniform(constants::WATERMARK_FONT_SIZE);
        let (text_w, text_h) = text_size(scale, &self.font, &self.text);

        let width = text_w.max(1) as u32 + 2 * constants::WATERMARK_PADDING;
        let height = text_h.max(1) as u32;

        let mut stamp = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        draw_text_mut(
            &mut stamp,
            Rgba([255, 255, 255, 255]),
            constants::WATERMARK_PADDING as i32,
            0,
            scale,
            &self.font,
            &self.text,
        );
        stamp
    }

    /// Composite the caption onto `image`.
    pub fn stamp(&self, image: &DynamicImage) -> DynamicImage {
        let mut stamp = self.render_stamp();
        for pixel in stamp.pixels_mut() {
            pixel[3] = constants::WATERMARK_ALPHA;
        }

        let mut canvas = image.to_rgba8();
        let (x, y) = watermark_origin(
            canvas.dimensions(),
            stamp.dimensions(),
            constants::WATERMARK_MARGIN,
        );
        image::imageops::overlay(&mut canvas, &stamp, x, y);

        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }

    /// Watermark the JPEG at `path` in place.
    pub fn apply(&self, path: &Path) -> Result<()> {
        let failed = |reason: String| WatermarkError::ImageFailed {
            path: path.display().to_string(),
            reason,
        };

        let image = image::open(path).map_err(|e| failed(e.to_string()))?;
        self.stamp(&image)
            .save_with_format(path, ImageFormat::Jpeg)
            .map_err(|e| failed(e.to_string()))?;

        Ok(())
    }
}

/// Top-left corner of a `stamp`-sized box anchored to the right edge of an
/// `image`-sized frame, `margin` pixels above the bottom edge.
///
/// Coordinates may be negative when the stamp is larger than the frame; the
/// overlay clips.
pub fn watermark_origin(image: (u32, u32), stamp: (u32, u32), margin: u32) -> (i64, i64) {
    let x = i64::from(image.0) - i64::from(stamp.0);
    let y = i64::from(image.1) - i64::from(stamp.1) - i64::from(margin);
    (x, y)
}
