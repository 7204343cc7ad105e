use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::assets::AssetManager;
use crate::error::{ImageError, Result};
use crate::transfer::optimizer::{Snapshot, TransferOutcome};

/// Final style transfer result
#[derive(Debug, Clone)]
pub struct StylizedImage {
    pub image: RgbImage,
    pub best_loss: f32,
    pub snapshot_urls: Vec<String>,
}

impl StylizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Row-major RGB bytes
    pub fn into_rgb_bytes(self) -> Vec<u8> {
        self.image.into_raw()
    }
}

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Turns an optimization outcome into a [`StylizedImage`], publishing the
/// intermediate snapshots along the way
pub struct ResultReporter {
    scratch_dir: Option<PathBuf>,
}

impl Default for ResultReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultReporter {
    pub fn new() -> Self {
        Self { scratch_dir: None }
    }

    fn ensure_scratch_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.scratch_dir {
            return Ok(dir.clone());
        }

        let dir = std::env::temp_dir().join(format!(
            "canvas_fx_nst_{}_{}",
            std::process::id(),
            SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir)?;
        self.scratch_dir = Some(dir.clone());
        Ok(dir)
    }

    /// Upload every snapshot as `nst_temp_{index}.png` when an asset manager
    /// is given and return the best image
    pub fn report(
        &mut self,
        outcome: TransferOutcome,
        assets: Option<&dyn AssetManager>,
    ) -> Result<StylizedImage> {
        let snapshot_urls = match assets {
            Some(assets) => self.upload_snapshots(&outcome.snapshots, assets)?,
            None => Vec::new(),
        };

        Ok(StylizedImage {
            image: outcome.best_image,
            best_loss: outcome.best_loss,
            snapshot_urls,
        })
    }

    fn upload_snapshots(&mut self, snapshots: &[Snapshot], assets: &dyn AssetManager) -> Result<Vec<String>> {
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }

        info!("Uploading {} snapshots", snapshots.len());
        let scratch = self.ensure_scratch_dir()?.join("snapshot.png");

        let mut urls = Vec::with_capacity(snapshots.len());
        for (idx, snapshot) in snapshots.iter().enumerate() {
            snapshot.image.save(&scratch).map_err(|e| ImageError::EncodeFailed {
                reason: e.to_string(),
            })?;

            let url = assets.upload_temp_image(&scratch, &format!("nst_temp_{}.png", idx))?;
            debug!("Snapshot {} (iteration {}) -> {}", idx, snapshot.iteration, url);
            urls.push(url);
        }

        Ok(urls)
    }

    /// Remove the scratch directory
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.scratch_dir.take() {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("Failed to remove scratch directory {:?}: {}", dir, e);
            }
        }
    }
}

impl Drop for ResultReporter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LocalAssetStore;
    use image::Rgb;
    use tempfile::tempdir;

    fn snapshot(iteration: usize, shade: u8) -> Snapshot {
        Snapshot {
            iteration,
            total_loss: 1.0,
            style_loss: 0.5,
            content_loss: 0.5,
            image: RgbImage::from_pixel(3, 2, Rgb([shade, shade, shade])),
        }
    }

    fn outcome() -> TransferOutcome {
        TransferOutcome {
            best_image: RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])),
            best_loss: 0.25,
            snapshots: vec![snapshot(0, 10), snapshot(100, 200)],
        }
    }

    #[test]
    fn test_report_without_assets() {
        let result = ResultReporter::new().report(outcome(), None).unwrap();

        assert!(result.snapshot_urls.is_empty());
        assert_eq!((result.width(), result.height()), (3, 2));
        assert_eq!(result.into_rgb_bytes(), [1, 2, 3].repeat(6));
    }

    #[test]
    fn test_snapshots_are_uploaded_in_order() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path()).with_public_base_url("https://assets.test");

        let result = ResultReporter::new().report(outcome(), Some(&store)).unwrap();

        assert_eq!(
            result.snapshot_urls,
            vec!["https://assets.test/nst_temp_0.png", "https://assets.test/nst_temp_1.png"]
        );

        let second = image::open(dir.path().join("nst_temp_1.png")).unwrap().into_rgb8();
        assert_eq!(second.get_pixel(0, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_scratch_dir_removed_on_cleanup() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path());

        let mut reporter = ResultReporter::new();
        reporter.report(outcome(), Some(&store)).unwrap();
        let scratch = reporter.scratch_dir.clone().unwrap();
        assert!(scratch.exists());

        reporter.cleanup();
        assert!(!scratch.exists());
    }
}
