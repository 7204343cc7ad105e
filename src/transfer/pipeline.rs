use burn::backend::{Autodiff, NdArray};
use tracing::info;

use crate::assets::{AssetManager, ImageFetcher};
use crate::config::Config;
use crate::error::{Result, TransferError};
use crate::transfer::loader::ImageLoader;
use crate::transfer::optimizer::{StyleTransfer, TransferSettings};
use crate::transfer::report::{ResultReporter, StylizedImage};
use crate::transfer::vgg::Vgg19;

/// CPU backend with gradient tracking used for style transfer
pub type NstBackend = Autodiff<NdArray<f32>>;

/// Full style transfer run.
///
/// The pipeline:
/// 1. Resolve both image references to local files
/// 2. Decode, resize and normalize the images
/// 3. Load the frozen VGG19 network
/// 4. Optimize the content image towards the style
/// 5. Publish snapshots and return the best image
pub fn run_nst(
    content_ref: &str,
    style_ref: &str,
    assets: Option<&dyn AssetManager>,
    config: &Config,
) -> Result<StylizedImage> {
    config.validate()?;
    let settings = TransferSettings::from_config(&config.transfer)?;

    info!("Step 1: Resolving images");
    let fetcher = ImageFetcher::from_config(&config.assets);
    let content_path = fetcher.resolve(content_ref)?;
    let style_path = fetcher.resolve(style_ref)?;

    info!("Step 2: Loading images (max side {})", config.transfer.max_dim);
    let loader = ImageLoader::new(config.transfer.max_dim);
    let content = loader.load_and_process_img(&content_path)?;
    let style = loader.load_and_process_img(&style_path)?;
    info!(
        "   Content: {}x{}, style: {}x{}",
        content.width(),
        content.height(),
        style.width(),
        style.height()
    );

    info!("Step 3: Loading VGG19");
    let weights = config
        .transfer
        .weights_path
        .as_ref()
        .ok_or(TransferError::MissingWeights)?;
    let device = Default::default();
    let model = Vgg19::<NstBackend>::pretrained(weights, &device)?;

    info!("Step 4: Optimizing");
    let outcome = StyleTransfer::new(model, settings, device).run(&content, &style)?;
    info!("   Best loss: {:.4e}", outcome.best_loss);

    info!("Step 5: Reporting");
    ResultReporter::new().report(outcome, assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssetError, FxError};
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_missing_weights_is_reported() {
        let dir = tempdir().unwrap();
        let content = dir.path().join("content.png");
        let style = dir.path().join("style.png");
        RgbImage::from_pixel(8, 8, Rgb([200, 10, 10])).save(&content).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([10, 10, 200])).save(&style).unwrap();

        let result = run_nst(
            content.to_str().unwrap(),
            style.to_str().unwrap(),
            None,
            &Config::default(),
        );
        assert!(matches!(result, Err(FxError::Transfer(TransferError::MissingWeights))));
    }

    #[test]
    fn test_unresolvable_content() {
        let result = run_nst("/no/content.png", "/no/style.png", None, &Config::default());
        assert!(matches!(result, Err(FxError::Asset(AssetError::Unresolvable { .. }))));
    }
}
