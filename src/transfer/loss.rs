use burn::tensor::{backend::Backend, Tensor};

use crate::error::{Result, TransferError};
use crate::transfer::vgg::{FeatureSet, LayerActivation};

/// Relative importance of style and content; both constant for a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    pub style: f32,
    pub content: f32,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self {
            style: 1e-2,
            content: 1e3,
        }
    }
}

impl LossWeights {
    pub fn new(style: f32, content: f32) -> Result<Self> {
        if !(style.is_finite() && style > 0.0 && content.is_finite() && content > 0.0) {
            return Err(TransferError::InvalidParameters {
                details: format!("loss weights must be positive, got style={} content={}", style, content),
            }
            .into());
        }

        Ok(Self { style, content })
    }
}

/// Gram matrix of a `[channels, height, width]` activation, normalized by
/// the number of spatial positions
pub fn gram_matrix<B: Backend>(activation: Tensor<B, 3>) -> Tensor<B, 2> {
    let [channels, height, width] = activation.dims();
    let positions = (height * width).max(1);

    let features: Tensor<B, 2> = activation.reshape([channels, height * width]);
    features
        .clone()
        .matmul(features.transpose())
        .div_scalar(positions as f32)
}

/// Mean squared error between two activations
pub fn content_loss<B: Backend>(base: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 1> {
    (base - target).powf_scalar(2.0).mean()
}

/// Mean squared error between the Gram matrix of `base` and a precomputed one
pub fn style_loss<B: Backend>(base: Tensor<B, 3>, gram_target: Tensor<B, 2>) -> Tensor<B, 1> {
    (gram_matrix(base) - gram_target).powf_scalar(2.0).mean()
}

/// Reference statistics of the content and style images.
///
/// Built once before optimization and never touched afterwards.
#[derive(Debug, Clone)]
pub struct StyleTargets<B: Backend> {
    grams: Vec<Tensor<B, 2>>,
    content: Vec<Tensor<B, 3>>,
}

impl<B: Backend> StyleTargets<B> {
    /// Precompute Gram matrices of the style image and keep the content
    /// image's activations, both detached from any graph
    pub fn from_features(style: FeatureSet<B>, content: FeatureSet<B>) -> Self {
        Self {
            grams: style
                .style
                .into_iter()
                .map(|activation| gram_matrix(activation.value.detach()).detach())
                .collect(),
            content: content
                .content
                .into_iter()
                .map(LayerActivation::detach)
                .map(|activation| activation.value)
                .collect(),
        }
    }

    pub fn grams(&self) -> &[Tensor<B, 2>] {
        &self.grams
    }

    pub fn content(&self) -> &[Tensor<B, 3>] {
        &self.content
    }
}

/// Weighted loss terms for one candidate image
#[derive(Debug, Clone)]
pub struct LossTerms<B: Backend> {
    pub total: Tensor<B, 1>,
    pub style: Tensor<B, 1>,
    pub content: Tensor<B, 1>,
}

/// Weighted style + content loss of a candidate's features against the targets
pub fn compute_loss<B: Backend>(
    features: FeatureSet<B>,
    targets: &StyleTargets<B>,
    weights: LossWeights,
) -> Result<LossTerms<B>> {
    check_layers("style", targets.grams.len(), features.style.len())?;
    check_layers("content", targets.content.len(), features.content.len())?;

    let device = targets
        .grams
        .first()
        .map(|gram| gram.device())
        .or_else(|| targets.content.first().map(|content| content.device()))
        .ok_or_else(|| TransferError::InvalidParameters {
            details: "no reference layers to compare against".to_string(),
        })?;

    let per_style_layer = 1.0 / features.style.len().max(1) as f32;
    let style = features
        .style
        .into_iter()
        .zip(&targets.grams)
        .fold(Tensor::<B, 1>::zeros([1], &device), |acc, (activation, gram)| {
            acc + style_loss(activation.value, gram.clone()).mul_scalar(per_style_layer)
        })
        .mul_scalar(weights.style);

    let per_content_layer = 1.0 / features.content.len().max(1) as f32;
    let content = features
        .content
        .into_iter()
        .zip(&targets.content)
        .fold(Tensor::<B, 1>::zeros([1], &device), |acc, (activation, target)| {
            acc + content_loss(activation.value, target.clone()).mul_scalar(per_content_layer)
        })
        .mul_scalar(weights.content);

    Ok(LossTerms {
        total: style.clone() + content.clone(),
        style,
        content,
    })
}

fn check_layers(kind: &str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(TransferError::LayerMismatch {
            kind: kind.to_string(),
            expected,
            found,
        }
        .into());
    }
    Ok(())
}
