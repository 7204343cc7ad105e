use std::path::{Path, PathBuf};

use tracing::debug;

use crate::assets::AssetManager;
use crate::config::AssetConfig;
use crate::error::{AssetError, Result};

/// Publishes assets by copying them into a directory
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalAssetStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    /// Serve stored files under `base_url` instead of `file://` URLs
    pub fn with_public_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.public_base_url = Some(base_url.into());
        self
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self {
            root: config.store_dir.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn url_for(&self, name: &str, stored: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), name),
            None => {
                let absolute = stored.canonicalize().unwrap_or_else(|_| stored.to_path_buf());
                format!("file://{}", absolute.display())
            }
        }
    }
}

impl AssetManager for LocalAssetStore {
    fn upload_temp_image(&self, local: &Path, target_name: &str) -> Result<String> {
        let upload_failed = |reason: String| AssetError::UploadFailed {
            name: target_name.to_string(),
            reason,
        };

        // Names come from callers; keep them inside the store
        if target_name.is_empty() || target_name.contains(['/', '\\']) || target_name == ".." {
            return Err(upload_failed("target name must be a plain file name".to_string()).into());
        }

        std::fs::create_dir_all(&self.root).map_err(|e| upload_failed(e.to_string()))?;

        let stored = self.root.join(target_name);
        std::fs::copy(local, &stored).map_err(|e| upload_failed(e.to_string()))?;
        debug!("Stored {:?} as {:?}", local, stored);

        Ok(self.url_for(target_name, &stored))
    }
}
