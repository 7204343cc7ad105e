//! Image references in, snapshot URLs out.
//!
//! [`ImageFetcher`] turns local paths, `file://` URLs and `http(s)://` URLs
//! into files on disk. [`AssetManager`] is the upload side used by the style
//! transfer reporter; [`LocalAssetStore`] publishes into a directory.

pub mod fetch;
pub mod local;

pub use fetch::ImageFetcher;
pub use local::LocalAssetStore;

use std::path::Path;

use crate::error::Result;

/// Somewhere intermediate images can be published to
pub trait AssetManager {
    /// Publish the file at `local` under `target_name` and return its URL
    fn upload_temp_image(&self, local: &Path, target_name: &str) -> Result<String>;
}

impl<T: AssetManager + ?Sized> AssetManager for &T {
    fn upload_temp_image(&self, local: &Path, target_name: &str) -> Result<String> {
        (**self).upload_temp_image(local, target_name)
    }
}

impl<T: AssetManager + ?Sized> AssetManager for Box<T> {
    fn upload_temp_image(&self, local: &Path, target_name: &str) -> Result<String> {
        (**self).upload_temp_image(local, target_name)
    }
}
