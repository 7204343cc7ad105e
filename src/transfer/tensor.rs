//! Pixel tensors in the layout the VGG19 network expects.
//!
//! The network was trained on Caffe-style inputs: BGR channel order with the
//! ImageNet per-channel mean subtracted and no scaling. [`ImageTensor`] keeps
//! pixels as a `[1, height, width, 3]` row-major array so the same buffer can
//! be handed to the tensor backend without copying channel planes around.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::{Rgb, RgbImage};

use crate::error::{ImageError, Result, TransferError};

/// ImageNet channel means in BGR order
pub const VGG_MEANS_BGR: [f32; 3] = [103.939, 116.779, 123.68];

const CHANNELS: usize = 3;

/// A single image as a `[1, height, width, 3]` f32 array
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    values: Vec<f32>,
    height: usize,
    width: usize,
}

impl ImageTensor {
    /// Wrap raw NHWC values; the length must match the dimensions
    pub fn from_values(values: Vec<f32>, height: usize, width: usize) -> Result<Self> {
        if values.len() != height * width * CHANNELS {
            return Err(ImageError::InvalidDimensions {
                details: format!(
                    "{} values cannot form a {}x{}x{} tensor",
                    values.len(),
                    height,
                    width,
                    CHANNELS
                ),
            }
            .into());
        }

        Ok(Self { values, height, width })
    }

    /// Unnormalized RGB values in `0.0..=255.0`
    pub fn from_rgb_image(image: &RgbImage) -> Self {
        Self {
            values: image.as_raw().iter().map(|&v| v as f32).collect(),
            height: image.height() as usize,
            width: image.width() as usize,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Shape including the leading batch dimension
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height, self.width, CHANNELS]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// RGB -> BGR, then subtract the channel means
    pub fn normalize(mut self) -> Self {
        for pixel in self.values.chunks_exact_mut(CHANNELS) {
            pixel.swap(0, 2);
            for (value, mean) in pixel.iter_mut().zip(VGG_MEANS_BGR) {
                *value -= mean;
            }
        }
        self
    }

    /// Inverse of [`normalize`](Self::normalize), without clipping
    pub fn denormalize(mut self) -> Self {
        for pixel in self.values.chunks_exact_mut(CHANNELS) {
            for (value, mean) in pixel.iter_mut().zip(VGG_MEANS_BGR) {
                *value += mean;
            }
            pixel.swap(0, 2);
        }
        self
    }

    /// Clip unnormalized values to `0..=255` and round to bytes
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut image = RgbImage::new(self.width as u32, self.height as u32);
        for (pixel, values) in image.pixels_mut().zip(self.values.chunks_exact(CHANNELS)) {
            *pixel = Rgb([
                values[0].clamp(0.0, 255.0).round() as u8,
                values[1].clamp(0.0, 255.0).round() as u8,
                values[2].clamp(0.0, 255.0).round() as u8,
            ]);
        }
        image
    }

    /// Normalized tensor back to a displayable RGB image
    pub fn deprocess(&self) -> RgbImage {
        self.clone().denormalize().to_rgb_image()
    }

    pub fn into_tensor<B: Backend>(self, device: &B::Device) -> Tensor<B, 4> {
        let shape = self.shape();
        Tensor::from_data(TensorData::new(self.values, shape), device)
    }

    /// Read a `[1, height, width, 3]` tensor back into host memory
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 4>) -> Result<Self> {
        let [batch, height, width, channels] = tensor.dims();
        if batch != 1 || channels != CHANNELS {
            return Err(TransferError::InvalidParameters {
                details: format!(
                    "expected a [1, h, w, 3] image tensor, got [{}, {}, {}, {}]",
                    batch, height, width, channels
                ),
            }
            .into());
        }

        let values = tensor
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| TransferError::Backend {
                reason: format!("{:?}", e),
            })?;

        Self::from_values(values, height, width)
    }
}

/// Per-channel bounds of a normalized image: `[-mean, 255 - mean]`
pub fn valid_range() -> ([f32; 3], [f32; 3]) {
    let min = VGG_MEANS_BGR.map(|mean| -mean);
    let max = VGG_MEANS_BGR.map(|mean| 255.0 - mean);
    (min, max)
}

/// Clamp a normalized NHWC tensor into the range the network accepts
pub fn clip_to_valid_range<B: Backend>(tensor: Tensor<B, 4>) -> Tensor<B, 4> {
    let dims = tensor.dims();
    let pixels = dims[0] * dims[1] * dims[2];
    let offsets: Vec<f32> = VGG_MEANS_BGR
        .iter()
        .copied()
        .cycle()
        .take(pixels * CHANNELS)
        .collect();
    let offsets = Tensor::<B, 4>::from_data(TensorData::new(offsets, dims), &tensor.device());

    (tensor + offsets.clone()).clamp(0.0, 255.0) - offsets
}
