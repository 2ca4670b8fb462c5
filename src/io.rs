use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, ImageError, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

use crate::canvas::{CanvasError, PixelGrid};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] ImageError),
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("document has no file path")]
    NoPath,
    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

// ============================================================================
// COLOR MODE CONVERSION
// ============================================================================

/// Pixel layout of a decoded image, as far as the loader cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Rgba,
    Rgb,
    /// Anything else (grayscale, 16-bit, float...).
    Other,
}

impl ColorMode {
    pub fn of(img: &DynamicImage) -> Self {
        match img {
            DynamicImage::ImageRgba8(_) => ColorMode::Rgba,
            DynamicImage::ImageRgb8(_) => ColorMode::Rgb,
            _ => ColorMode::Other,
        }
    }
}

/// Map one decoded pixel to RGBA.  RGB gains opaque alpha; unsupported modes
/// become transparent black.
pub fn convert_pixel(channels: &[u8], mode: ColorMode) -> Rgba<u8> {
    match (mode, channels) {
        (ColorMode::Rgba, &[r, g, b, a, ..]) => Rgba([r, g, b, a]),
        (ColorMode::Rgb, &[r, g, b, ..]) => Rgba([r, g, b, 255]),
        _ => Rgba([0, 0, 0, 0]),
    }
}

/// Convert a decoded image into a grid, pixel by pixel through
/// [`convert_pixel`].
pub fn grid_from_dynamic(img: DynamicImage) -> Result<PixelGrid, CanvasError> {
    let mode = ColorMode::of(&img);
    let (w, h) = (img.width(), img.height());
    match img {
        DynamicImage::ImageRgba8(buf) => PixelGrid::from_rgba_image(buf),
        DynamicImage::ImageRgb8(buf) => {
            let out = RgbaImage::from_fn(w, h, |x, y| convert_pixel(&buf.get_pixel(x, y).0, mode));
            PixelGrid::from_rgba_image(out)
        }
        other => {
            tracing::warn!(
                "Unsupported colour layout {:?}, loading as transparent",
                other.color()
            );
            PixelGrid::from_rgba_image(RgbaImage::from_pixel(w, h, convert_pixel(&[], ColorMode::Other)))
        }
    }
}

// ============================================================================
// LOAD
// ============================================================================

pub fn load_image(path: &Path) -> Result<PixelGrid, ImageIoError> {
    let img = image::open(path).map_err(|e| match e {
        ImageError::IoError(io) => ImageIoError::Io(io),
        other => ImageIoError::Decode(other),
    })?;
    tracing::debug!("Decoded {} as {:?}", path.display(), img.color());
    Ok(grid_from_dynamic(img)?)
}

// ============================================================================
// SAVE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SaveFormat::Png => "PNG",
            SaveFormat::Jpeg => "JPEG",
            SaveFormat::Bmp => "BMP",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ImageIoError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| ImageIoError::UnsupportedFormat(ext.to_string()))
    }

    pub fn supports_alpha(&self) -> bool {
        !matches!(self, SaveFormat::Jpeg)
    }
}

/// Write a flat RGBA8 buffer (`width * height * 4` bytes) to `path`.
pub fn save_buffer(
    path: &Path,
    width: u32,
    height: u32,
    rgba: &[u8],
    format: SaveFormat,
) -> Result<(), ImageIoError> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(ImageIoError::BufferSize {
            expected,
            actual: rgba.len(),
        });
    }
    let image = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or(ImageIoError::BufferSize {
        expected,
        actual: rgba.len(),
    })?;
    encode_and_write(&image, path, format, DEFAULT_JPEG_QUALITY)
}

pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), ImageIoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            encoder
                .write_image(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(ImageIoError::Encode)?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder
                .encode(
                    rgb_image.as_raw(),
                    rgb_image.width(),
                    rgb_image.height(),
                    image::ColorType::Rgb8,
                )
                .map_err(ImageIoError::Encode)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(ImageIoError::Encode)?;
        }
    }

    std::io::Write::flush(&mut writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_convert_pixel_modes() {
        assert_eq!(convert_pixel(&[1, 2, 3, 4], ColorMode::Rgba), Rgba([1, 2, 3, 4]));
        assert_eq!(convert_pixel(&[1, 2, 3], ColorMode::Rgb), Rgba([1, 2, 3, 255]));
        assert_eq!(convert_pixel(&[77], ColorMode::Other), Rgba([0, 0, 0, 0]));
        // Short buffers never panic
        assert_eq!(convert_pixel(&[1, 2], ColorMode::Rgb), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_grid_from_rgb_gets_opaque_alpha() {
        let img = RgbImage::from_pixel(2, 2, Rgb([10, 20, 30]));
        let grid = grid_from_dynamic(DynamicImage::ImageRgb8(img)).unwrap();
        assert!(grid.as_image().pixels().all(|p| *p == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn test_grid_from_rgba_passes_through() {
        let img = RgbaImage::from_pixel(3, 1, Rgba([5, 6, 7, 8]));
        let grid = grid_from_dynamic(DynamicImage::ImageRgba8(img.clone())).unwrap();
        assert_eq!(grid.as_image(), &img);
    }

    #[test]
    fn test_grid_from_gray_is_transparent() {
        let img = GrayImage::from_pixel(2, 3, Luma([200]));
        let grid = grid_from_dynamic(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(grid.dimensions(), (2, 3));
        assert!(grid.as_image().pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SaveFormat::from_extension("PNG"), Some(SaveFormat::Png));
        assert_eq!(SaveFormat::from_extension("jpeg"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_extension("jpg"), Some(SaveFormat::Jpeg));
        assert_eq!(SaveFormat::from_extension("bmp"), Some(SaveFormat::Bmp));
        assert_eq!(SaveFormat::from_extension("tga"), None);
        assert!(matches!(
            SaveFormat::from_path(Path::new("out.webp")),
            Err(ImageIoError::UnsupportedFormat(ext)) if ext == "webp"
        ));
        assert!(!SaveFormat::Jpeg.supports_alpha());
    }

    #[test]
    fn test_save_buffer_rejects_bad_length() {
        let err = save_buffer(Path::new("never-written.png"), 2, 2, &[0; 3], SaveFormat::Png).unwrap_err();
        assert!(matches!(err, ImageIoError::BufferSize { expected: 16, actual: 3 }));
    }
}
