//! Neural style transfer.
//!
//! A candidate image is optimized with Adam so that its VGG19 activations
//! match the content image at a deep layer and the Gram matrices of the
//! style image at five shallower layers.

pub mod loader;
pub mod loss;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod tensor;
pub mod vgg;

pub use loader::ImageLoader;
pub use loss::{compute_loss, gram_matrix, LossTerms, LossWeights, StyleTargets};
pub use optimizer::{snapshot_interval, BestCandidate, Snapshot, StyleTransfer, TransferOutcome, TransferSettings};
pub use pipeline::{run_nst, NstBackend};
pub use report::{ResultReporter, StylizedImage};
pub use tensor::ImageTensor;
pub use vgg::{FeatureExtractor, FeatureSet, LayerActivation, Vgg19, CONTENT_LAYERS, STYLE_LAYERS};
