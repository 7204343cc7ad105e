use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::AssetConfig;
use crate::error::{AssetError, Result};

const CACHE_NAME_LIMIT: usize = 128;

/// Resolves image references to local files, downloading remote ones into
/// a cache directory
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    cache_dir: PathBuf,
    timeout: Duration,
}

impl ImageFetcher {
    pub fn new<P: Into<PathBuf>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.cache_dir.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Turn a path, `file://` URL or `http(s)://` URL into a readable file
    pub fn resolve(&self, reference: &str) -> Result<PathBuf> {
        let reference = reference.trim();

        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.fetch_remote(reference);
        }

        let path = PathBuf::from(reference.strip_prefix("file://").unwrap_or(reference));
        if path.is_file() {
            Ok(path)
        } else {
            Err(AssetError::Unresolvable {
                reference: reference.to_string(),
            }
            .into())
        }
    }

    /// Cached file name for a URL: the last characters of its basename
    pub fn cache_name(url: &str) -> Option<String> {
        let parsed = reqwest::Url::parse(url).ok()?;
        let basename = parsed.path_segments()?.last()?;
        if basename.is_empty() {
            return None;
        }

        let skip = basename.chars().count().saturating_sub(CACHE_NAME_LIMIT);
        Some(basename.chars().skip(skip).collect())
    }

    fn fetch_remote(&self, url: &str) -> Result<PathBuf> {
        let fetch_failed = |reason: String| AssetError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        let name = Self::cache_name(url).ok_or_else(|| AssetError::Unresolvable {
            reference: url.to_string(),
        })?;
        let target = self.cache_dir.join(name);

        if target.is_file() {
            debug!("Using cached copy of {} at {:?}", url, target);
            return Ok(target);
        }

        info!("Downloading {}", url);
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| fetch_failed(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| fetch_failed(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| fetch_failed(e.to_string()))?;

        std::fs::create_dir_all(&self.cache_dir)?;

        // Write under a temporary name so an interrupted download is never reused
        let partial = target.with_extension("part");
        std::fs::write(&partial, &bytes)?;
        std::fs::rename(&partial, &target)?;

        debug!("Saved {} bytes to {:?}", bytes.len(), target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plain_and_file_url_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("content.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let fetcher = ImageFetcher::new(dir.path().join("cache"));
        assert_eq!(fetcher.resolve(path.to_str().unwrap()).unwrap(), path);

        let url = format!("file://{}", path.display());
        assert_eq!(fetcher.resolve(&url).unwrap(), path);
    }

    #[test]
    fn test_missing_path_is_unresolvable() {
        let dir = tempdir().unwrap();
        let fetcher = ImageFetcher::new(dir.path());

        let result = fetcher.resolve("/no/such/picture.png");
        assert!(matches!(
            result,
            Err(crate::error::FxError::Asset(AssetError::Unresolvable { .. }))
        ));
    }

    #[test]
    fn test_cache_name() {
        assert_eq!(
            ImageFetcher::cache_name("https://example.com/img/starry.jpg?size=large"),
            Some("starry.jpg".to_string())
        );
        assert_eq!(ImageFetcher::cache_name("https://example.com/"), None);

        let long = format!("https://example.com/{}.png", "a".repeat(300));
        let name = ImageFetcher::cache_name(&long).unwrap();
        assert_eq!(name.chars().count(), 128);
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn test_cached_download_is_reused() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("wave.png"), b"cached").unwrap();

        // Never touches the network because the cache already holds the file
        let fetcher = ImageFetcher::new(dir.path());
        let path = fetcher.resolve("https://invalid.example/art/wave.png").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"cached");
    }
}
