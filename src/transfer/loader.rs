use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageReader, Rgb, RgbImage};
use tracing::debug;

use crate::error::{ImageError, Result};
use crate::transfer::tensor::ImageTensor;

/// Decodes images and brings them to the size and layout used for style transfer
#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    max_dim: u32,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self { max_dim: 512 }
    }
}

impl ImageLoader {
    pub fn new(max_dim: u32) -> Self {
        Self { max_dim: max_dim.max(1) }
    }

    pub fn max_dim(&self) -> u32 {
        self.max_dim
    }

    /// Decode an image, flatten any alpha over white and resize it so the
    /// longer side equals `max_dim`
    pub fn load_img<P: AsRef<Path>>(&self, path: P) -> Result<RgbImage> {
        let path = path.as_ref();
        let image = Self::decode(path)?;
        let rgb = flatten_alpha(image);

        let (width, height) = rgb.dimensions();
        let (new_width, new_height) = self.target_dimensions(width, height);
        debug!("Resizing {:?} from {}x{} to {}x{}", path, width, height, new_width, new_height);

        if (new_width, new_height) == (width, height) {
            return Ok(rgb);
        }

        Ok(image::imageops::resize(&rgb, new_width, new_height, FilterType::Lanczos3))
    }

    /// [`load_img`](Self::load_img) followed by VGG normalization
    pub fn load_and_process_img<P: AsRef<Path>>(&self, path: P) -> Result<ImageTensor> {
        let image = self.load_img(path)?;
        Ok(ImageTensor::from_rgb_image(&image).normalize())
    }

    /// Dimensions after scaling the longer side to `max_dim`
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let long = width.max(height).max(1) as f64;
        let scale = self.max_dim as f64 / long;

        let scaled = |side: u32| ((side as f64 * scale).round_ties_even() as u32).max(1);
        (scaled(width), scaled(height))
    }

    fn decode(path: &Path) -> Result<DynamicImage> {
        let reader = ImageReader::open(path).map_err(|_| ImageError::LoadFailed {
            path: path.display().to_string(),
        })?;

        reader
            .with_guessed_format()
            .map_err(|_| ImageError::LoadFailed {
                path: path.display().to_string(),
            })?
            .decode()
            .map_err(|e| {
                ImageError::DecodeFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

/// Composite an image carrying alpha over a white background
pub fn flatten_alpha(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
