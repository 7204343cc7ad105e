use std::time::Instant;

use burn::module::{Module, Param};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use image::RgbImage;
use tracing::{debug, info};

use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::transfer::loss::{compute_loss, LossWeights, StyleTargets};
use crate::transfer::tensor::{clip_to_valid_range, ImageTensor};
use crate::transfer::vgg::FeatureExtractor;

/// Optimization parameters for one style transfer run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferSettings {
    pub iterations: usize,
    pub weights: LossWeights,
    pub learning_rate: f64,
    pub beta_1: f32,
    pub epsilon: f32,
    pub snapshot_grid: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            iterations: 1000,
            weights: LossWeights::default(),
            learning_rate: 5.0,
            beta_1: 0.99,
            epsilon: 1e-1,
            snapshot_grid: 10,
        }
    }
}

impl TransferSettings {
    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        Ok(Self {
            iterations: config.iterations,
            weights: LossWeights::new(config.style_weight, config.content_weight)?,
            learning_rate: config.learning_rate,
            beta_1: config.beta_1,
            epsilon: config.epsilon,
            snapshot_grid: config.snapshot_grid,
        })
    }
}

/// Iterations between two intermediate snapshots, so that at most `grid`
/// snapshots are taken over the run
pub fn snapshot_interval(iterations: usize, grid: usize) -> usize {
    iterations.div_ceil(grid.max(1)).max(1)
}

/// Lowest loss seen so far and the image that produced it
#[derive(Debug, Clone)]
pub struct BestCandidate {
    loss: f32,
    image: RgbImage,
}

impl BestCandidate {
    /// Start from the initial image with an infinite loss
    pub fn new(initial: RgbImage) -> Self {
        Self {
            loss: f32::INFINITY,
            image: initial,
        }
    }

    /// Replace the best candidate if `loss` is strictly lower. The image is
    /// only rendered when it is kept.
    pub fn observe<F>(&mut self, loss: f32, render: F) -> Result<bool>
    where
        F: FnOnce() -> Result<RgbImage>,
    {
        if !(loss < self.loss) {
            return Ok(false);
        }

        self.image = render()?;
        self.loss = loss;
        Ok(true)
    }

    pub fn loss(&self) -> f32 {
        self.loss
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_parts(self) -> (f32, RgbImage) {
        (self.loss, self.image)
    }
}

/// Intermediate result captured during optimization
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub iteration: usize,
    pub total_loss: f32,
    pub style_loss: f32,
    pub content_loss: f32,
    pub image: RgbImage,
}

/// Result of the optimization loop
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub best_image: RgbImage,
    pub best_loss: f32,
    pub snapshots: Vec<Snapshot>,
}

/// The candidate image as the only trainable parameter
#[derive(Module, Debug)]
struct Canvas<B: Backend> {
    pixels: Param<Tensor<B, 4>>,
}

/// Gradient-descent style transfer over a frozen feature extractor
pub struct StyleTransfer<B: AutodiffBackend, E: FeatureExtractor<B>> {
    extractor: E,
    settings: TransferSettings,
    device: B::Device,
}

impl<B: AutodiffBackend, E: FeatureExtractor<B>> StyleTransfer<B, E> {
    pub fn new(extractor: E, settings: TransferSettings, device: B::Device) -> Self {
        Self {
            extractor,
            settings,
            device,
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Content activations of `content` and Gram matrices of `style`
    pub fn reference_targets(&self, content: &ImageTensor, style: &ImageTensor) -> StyleTargets<B> {
        let style_features = self
            .extractor
            .extract(style.clone().into_tensor::<B>(&self.device));
        let content_features = self
            .extractor
            .extract(content.clone().into_tensor::<B>(&self.device));

        StyleTargets::from_features(style_features, content_features)
    }

    /// Optimize a copy of `content` towards the style of `style`.
    ///
    /// Always runs the configured number of iterations. After each step and
    /// clip the updated image becomes the best candidate when the loss of
    /// that iteration is the lowest so far; with no iterations the unmodified
    /// content image is returned.
    pub fn run(&self, content: &ImageTensor, style: &ImageTensor) -> Result<TransferOutcome> {
        let settings = self.settings;
        let targets = self.reference_targets(content, style);

        let mut best = BestCandidate::new(content.deprocess());
        let mut canvas = Canvas {
            pixels: Param::from_tensor(content.clone().into_tensor::<B>(&self.device).require_grad()),
        };
        let mut optimizer = AdamConfig::new()
            .with_beta_1(settings.beta_1)
            .with_epsilon(settings.epsilon)
            .init::<B, Canvas<B>>();

        let interval = snapshot_interval(settings.iterations, settings.snapshot_grid);
        let mut snapshots = Vec::new();

        info!(
            "Optimizing for {} iterations (snapshot every {})",
            settings.iterations, interval
        );
        let global_start = Instant::now();

        for iteration in 0..settings.iterations {
            let start = Instant::now();

            let features = self.extractor.extract(canvas.pixels.val());
            let terms = compute_loss(features, &targets, settings.weights)?;
            let total_loss = scalar(terms.total.clone());

            let grads = GradientsParams::from_grads(terms.total.backward(), &canvas);
            canvas = optimizer.step(settings.learning_rate, canvas, grads);
            canvas.pixels = canvas
                .pixels
                .map(|pixels| clip_to_valid_range(pixels.detach()).require_grad());

            let current = canvas.pixels.val();
            if best.observe(total_loss, || Ok(ImageTensor::from_tensor(current)?.deprocess()))? {
                debug!("Iteration {}: new best loss {:.4e}", iteration, total_loss);
            }

            if iteration % interval == 0 {
                let style_loss = scalar(terms.style);
                let content_loss = scalar(terms.content);
                let image = ImageTensor::from_tensor(canvas.pixels.val())?.deprocess();

                info!("Iteration: {}", iteration);
                info!(
                    "Total loss: {:.4e}, style loss: {:.4e}, content loss: {:.4e}, time: {:.4}s",
                    total_loss,
                    style_loss,
                    content_loss,
                    start.elapsed().as_secs_f64()
                );

                snapshots.push(Snapshot {
                    iteration,
                    total_loss,
                    style_loss,
                    content_loss,
                    image,
                });
            }
        }

        info!("Total time: {:.4}s", global_start.elapsed().as_secs_f64());

        let (best_loss, best_image) = best.into_parts();
        if !best_loss.is_finite() && settings.iterations > 0 {
            return Err(TransferError::Backend {
                reason: format!("loss never became finite over {} iterations", settings.iterations),
            }
            .into());
        }

        Ok(TransferOutcome {
            best_image,
            best_loss,
            snapshots,
        })
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use image::Rgb;
    use std::cell::RefCell;

    use crate::transfer::tensor::valid_range;

    use crate::transfer::vgg::{drop_batch, FeatureSet, LayerActivation};

    type TestBackend = Autodiff<NdArray<f32>>;

    /// Uses the raw pixels as both style and content activations
    struct PixelExtractor;

    impl<B: Backend> FeatureExtractor<B> for PixelExtractor {
        fn extract(&self, image: Tensor<B, 4>) -> FeatureSet<B> {
            let activation = drop_batch(image.permute([0, 3, 1, 2]));
            FeatureSet {
                style: vec![LayerActivation::new("pixels", activation.clone())],
                content: vec![LayerActivation::new("pixels", activation)],
            }
        }
    }

    /// Pixel features that also record every input it sees
    #[derive(Default)]
    struct RecordingExtractor {
        inputs: RefCell<Vec<Vec<f32>>>,
    }

    impl<B: Backend> FeatureExtractor<B> for RecordingExtractor {
        fn extract(&self, image: Tensor<B, 4>) -> FeatureSet<B> {
            let values = image.clone().into_data().to_vec::<f32>().unwrap();
            self.inputs.borrow_mut().push(values);
            PixelExtractor.extract(image)
        }
    }

    fn image_tensor(color: [u8; 3]) -> ImageTensor {
        let image = RgbImage::from_fn(6, 4, |x, y| {
            Rgb([
                color[0].wrapping_add(x as u8 * 10),
                color[1].wrapping_add(y as u8 * 10),
                color[2],
            ])
        });
        ImageTensor::from_rgb_image(&image).normalize()
    }

    fn transfer(iterations: usize) -> StyleTransfer<TestBackend, PixelExtractor> {
        let settings = TransferSettings {
            iterations,
            weights: LossWeights::new(1e-4, 1.0).unwrap(),
            ..TransferSettings::default()
        };
        StyleTransfer::new(PixelExtractor, settings, Default::default())
    }

    #[test]
    fn test_snapshot_interval() {
        assert_eq!(snapshot_interval(1000, 10), 100);
        assert_eq!(snapshot_interval(15, 10), 2);
        assert_eq!(snapshot_interval(5, 10), 1);
        assert_eq!(snapshot_interval(0, 10), 1);
        assert_eq!(snapshot_interval(7, 0), 7);
    }

    #[test]
    fn test_best_candidate_keeps_strictly_lower_loss() {
        let mut best = BestCandidate::new(RgbImage::new(1, 1));
        assert!(best.observe(3.0, || Ok(RgbImage::from_pixel(1, 1, Rgb([3, 3, 3])))).unwrap());
        assert!(!best.observe(3.0, || panic!("equal loss must not render")).unwrap());
        assert!(!best.observe(f32::NAN, || panic!("NaN must not render")).unwrap());
        assert!(best.observe(1.0, || Ok(RgbImage::from_pixel(1, 1, Rgb([1, 1, 1])))).unwrap());

        assert_eq!(best.loss(), 1.0);
        assert_eq!(best.image().get_pixel(0, 0), &Rgb([1, 1, 1]));
    }

    #[test]
    fn test_zero_iterations_returns_initial_image() {
        let content = image_tensor([120, 60, 30]);
        let style = image_tensor([10, 200, 90]);

        let outcome = transfer(0).run(&content, &style).unwrap();

        assert_eq!(outcome.best_image, content.deprocess());
        assert!(outcome.best_loss.is_infinite());
        assert!(outcome.snapshots.is_empty());
    }

    #[test]
    fn test_run_tracks_best_and_snapshots() {
        let content = image_tensor([120, 60, 30]);
        let style = image_tensor([10, 200, 90]);

        let outcome = transfer(4).run(&content, &style).unwrap();

        assert!(outcome.best_loss.is_finite());
        assert_eq!(outcome.best_image.dimensions(), (6, 4));

        let iterations: Vec<usize> = outcome.snapshots.iter().map(|s| s.iteration).collect();
        assert_eq!(iterations, vec![0, 1, 2, 3]);

        let lowest = outcome
            .snapshots
            .iter()
            .map(|s| s.total_loss)
            .fold(f32::INFINITY, f32::min);
        assert_eq!(outcome.best_loss, lowest);
    }

    #[test]
    fn test_single_iteration_returns_stepped_image() {
        let content = image_tensor([120, 60, 30]);
        let style = image_tensor([10, 200, 90]);

        let outcome = transfer(1).run(&content, &style).unwrap();

        assert_eq!(outcome.snapshots.len(), 1);
        assert!(outcome.best_loss.is_finite());
        assert_ne!(outcome.best_image, content.deprocess());
        assert_eq!(outcome.best_image, outcome.snapshots[0].image);
    }

    #[test]
    fn test_pixels_stay_in_range_after_each_step() {
        let content = image_tensor([250, 5, 128]);
        let style = image_tensor([0, 255, 40]);
        let settings = TransferSettings {
            iterations: 4,
            weights: LossWeights::new(1.0, 1.0).unwrap(),
            learning_rate: 1000.0,
            ..TransferSettings::default()
        };
        let transfer: StyleTransfer<TestBackend, RecordingExtractor> =
            StyleTransfer::new(RecordingExtractor::default(), settings, Default::default());

        transfer.run(&content, &style).unwrap();

        // style and content references, then one input per iteration
        let inputs = transfer.extractor.inputs.borrow();
        assert_eq!(inputs.len(), 2 + 4);

        let (min, max) = valid_range();
        for (index, values) in inputs.iter().enumerate() {
            for pixel in values.chunks(3) {
                for channel in 0..3 {
                    assert!(
                        pixel[channel] >= min[channel] - 1e-3 && pixel[channel] <= max[channel] + 1e-3,
                        "input {} channel {} out of range: {}",
                        index,
                        channel,
                        pixel[channel]
                    );
                }
            }
        }
    }

    #[test]
    fn test_settings_from_config() {
        let config = TransferConfig {
            iterations: 12,
            ..TransferConfig::default()
        };
        let settings = TransferSettings::from_config(&config).unwrap();
        assert_eq!(settings.iterations, 12);
        assert_eq!(settings.weights, LossWeights::new(1e-2, 1e3).unwrap());
        assert_eq!(settings.snapshot_grid, 10);
    }
}
