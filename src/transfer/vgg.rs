//! Frozen VGG19 feature extractor.
//!
//! Only the convolutional trunk is kept. Activations are read after the ReLU
//! of the five style layers (`blockN_conv1`) and of the content layer
//! (`block5_conv2`); the forward pass stops there.

use std::path::Path;

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::PaddingConfig2d;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use tracing::info;

use crate::error::{Result, TransferError};

/// Layers whose Gram matrices describe style
pub const STYLE_LAYERS: [&str; 5] = [
    "block1_conv1",
    "block2_conv1",
    "block3_conv1",
    "block4_conv1",
    "block5_conv1",
];

/// Layers whose activations describe content
pub const CONTENT_LAYERS: [&str; 1] = ["block5_conv2"];

/// One activation map, `[channels, height, width]`
#[derive(Debug, Clone)]
pub struct LayerActivation<B: Backend> {
    pub layer: String,
    pub value: Tensor<B, 3>,
}

impl<B: Backend> LayerActivation<B> {
    pub fn new<S: Into<String>>(layer: S, value: Tensor<B, 3>) -> Self {
        Self {
            layer: layer.into(),
            value,
        }
    }

    /// Cut the activation out of the autodiff graph
    pub fn detach(self) -> Self {
        Self {
            layer: self.layer,
            value: self.value.detach(),
        }
    }
}

/// Style activations followed by content activations, each in layer order
#[derive(Debug, Clone)]
pub struct FeatureSet<B: Backend> {
    pub style: Vec<LayerActivation<B>>,
    pub content: Vec<LayerActivation<B>>,
}

impl<B: Backend> FeatureSet<B> {
    pub fn layer_names(&self) -> Vec<&str> {
        self.style
            .iter()
            .chain(self.content.iter())
            .map(|activation| activation.layer.as_str())
            .collect()
    }
}

/// Anything that can turn a normalized `[1, height, width, 3]` image into
/// style and content activations
pub trait FeatureExtractor<B: Backend> {
    fn extract(&self, image: Tensor<B, 4>) -> FeatureSet<B>;
}

/// VGG19 convolutional trunk
#[derive(Module, Debug)]
pub struct Vgg19<B: Backend> {
    // Block 1
    conv1_1: Conv2d<B>,
    conv1_2: Conv2d<B>,
    // Block 2
    conv2_1: Conv2d<B>,
    conv2_2: Conv2d<B>,
    // Block 3
    conv3_1: Conv2d<B>,
    conv3_2: Conv2d<B>,
    conv3_3: Conv2d<B>,
    conv3_4: Conv2d<B>,
    // Block 4
    conv4_1: Conv2d<B>,
    conv4_2: Conv2d<B>,
    conv4_3: Conv2d<B>,
    conv4_4: Conv2d<B>,
    // Block 5
    conv5_1: Conv2d<B>,
    conv5_2: Conv2d<B>,
    conv5_3: Conv2d<B>,
    conv5_4: Conv2d<B>,
    pool: MaxPool2d,
}

impl<B: Backend> Vgg19<B> {
    /// Randomly initialized network with the VGG19 topology
    pub fn new(device: &B::Device) -> Self {
        let conv = |in_ch: usize, out_ch: usize| {
            Conv2dConfig::new([in_ch, out_ch], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .with_bias(true)
                .init(device)
        };

        Self {
            conv1_1: conv(3, 64),
            conv1_2: conv(64, 64),
            conv2_1: conv(64, 128),
            conv2_2: conv(128, 128),
            conv3_1: conv(128, 256),
            conv3_2: conv(256, 256),
            conv3_3: conv(256, 256),
            conv3_4: conv(256, 256),
            conv4_1: conv(256, 512),
            conv4_2: conv(512, 512),
            conv4_3: conv(512, 512),
            conv4_4: conv(512, 512),
            conv5_1: conv(512, 512),
            conv5_2: conv(512, 512),
            conv5_3: conv(512, 512),
            conv5_4: conv(512, 512),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    /// Load pretrained weights and freeze them
    pub fn pretrained<P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading VGG19 weights from {:?}", path);

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let model = Self::new(device)
            .load_file(path.to_path_buf(), &recorder, device)
            .map_err(|e| TransferError::ModelLoadFailed {
                path: path.display().to_string(),
                reason: format!("{:?}", e),
            })?;

        Ok(model.no_grad())
    }

    /// Run the trunk up to the content layer on an NCHW batch
    fn forward_nchw(&self, x: Tensor<B, 4>) -> (Vec<Tensor<B, 4>>, Tensor<B, 4>) {
        let mut style = Vec::with_capacity(STYLE_LAYERS.len());

        // Block 1
        let x = relu(self.conv1_1.forward(x));
        style.push(x.clone());
        let x = relu(self.conv1_2.forward(x));
        let x = self.pool.forward(x);

        // Block 2
        let x = relu(self.conv2_1.forward(x));
        style.push(x.clone());
        let x = relu(self.conv2_2.forward(x));
        let x = self.pool.forward(x);

        // Block 3
        let x = relu(self.conv3_1.forward(x));
        style.push(x.clone());
        let x = relu(self.conv3_2.forward(x));
        let x = relu(self.conv3_3.forward(x));
        let x = relu(self.conv3_4.forward(x));
        let x = self.pool.forward(x);

        // Block 4
        let x = relu(self.conv4_1.forward(x));
        style.push(x.clone());
        let x = relu(self.conv4_2.forward(x));
        let x = relu(self.conv4_3.forward(x));
        let x = relu(self.conv4_4.forward(x));
        let x = self.pool.forward(x);

        // Block 5
        let x = relu(self.conv5_1.forward(x));
        style.push(x.clone());
        let content = relu(self.conv5_2.forward(x));

        (style, content)
    }
}

impl<B: Backend> FeatureExtractor<B> for Vgg19<B> {
    fn extract(&self, image: Tensor<B, 4>) -> FeatureSet<B> {
        // NHWC -> NCHW
        let (style, content) = self.forward_nchw(image.permute([0, 3, 1, 2]));

        FeatureSet {
            style: STYLE_LAYERS
                .iter()
                .zip(style)
                .map(|(layer, value)| LayerActivation::new(*layer, drop_batch(value)))
                .collect(),
            content: vec![LayerActivation::new(CONTENT_LAYERS[0], drop_batch(content))],
        }
    }
}

/// `[1, c, h, w]` -> `[c, h, w]`
pub fn drop_batch<B: Backend>(tensor: Tensor<B, 4>) -> Tensor<B, 3> {
    let [_, channels, height, width] = tensor.dims();
    tensor.reshape([channels, height, width])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_feature_layers_and_shapes() {
        let device = Default::default();
        let model = Vgg19::<TestBackend>::new(&device);
        let image = Tensor::<TestBackend, 4>::zeros([1, 32, 32, 3], &device);

        let features = model.extract(image);

        assert_eq!(
            features.layer_names(),
            vec![
                "block1_conv1",
                "block2_conv1",
                "block3_conv1",
                "block4_conv1",
                "block5_conv1",
                "block5_conv2"
            ]
        );

        let shapes: Vec<[usize; 3]> = features.style.iter().map(|a| a.value.dims()).collect();
        assert_eq!(
            shapes,
            vec![[64, 32, 32], [128, 16, 16], [256, 8, 8], [512, 4, 4], [512, 2, 2]]
        );
        assert_eq!(features.content[0].value.dims(), [512, 2, 2]);
    }

    #[test]
    fn test_missing_weights_file() {
        let device = Default::default();
        let result = Vgg19::<TestBackend>::pretrained("/no/such/vgg19", &device);
        assert!(matches!(
            result,
            Err(crate::error::FxError::Transfer(TransferError::ModelLoadFailed { .. }))
        ));
    }
}
