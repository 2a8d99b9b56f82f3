use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{default_seed, Catalog, FallbackTable, ImageDescriptor};
use crate::category::Category;
use crate::error::GalleryError;
use crate::locator::PresentationParams;
use crate::upload::MAX_UPLOAD_BYTES;

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub page_url: String,
    pub images: Vec<ImageDescriptor>,
    pub fallbacks: HashMap<Category, String>,
    pub presentation: PresentationParams,
    pub max_upload_bytes: u64,
    pub notice_seconds: u64,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_url: "http://127.0.0.1:8080/".to_string(),
            images: default_seed(),
            fallbacks: HashMap::new(),
            presentation: PresentationParams::default(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            notice_seconds: 3,
        }
    }
}

impl GalleryConfig {
    pub fn load(path: &Path) -> Result<Option<Self>, GalleryError> {
        match fs::read(path) {
            Ok(data) => {
                let config = serde_json::from_slice(&data).map_err(|source| GalleryError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Some(config))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(GalleryError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Reads `path` if given, else the default location, else built-in values.
    pub fn resolve(path: Option<&Path>) -> Result<Self, GalleryError> {
        let (path, required) = match path {
            Some(path) => (expand_tilde(path), true),
            None => (default_config_path(), false),
        };
        match Self::load(&path)? {
            Some(config) => Ok(config),
            None if required => Err(GalleryError::Io {
                path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            self.images
                .iter()
                .cloned()
                .map(|mut item| {
                    item.is_local = false;
                    item
                })
                .collect(),
        )
    }

    pub fn fallback_table(&self) -> FallbackTable {
        if self.fallbacks.is_empty() {
            return FallbackTable::default();
        }
        FallbackTable::new(self.fallbacks.clone())
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_secs(self.notice_seconds)
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join("image-gallery").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(".").join(CONFIG_FILE_NAME)
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let suffix = path_str.trim_start_matches('~');
            return home.join(suffix.trim_start_matches('/'));
        }
    }
    path.to_path_buf()
}
