use std::path::Path;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::catalog::ImageDescriptor;
use crate::category::Category;
use crate::error::GalleryError;
use crate::locator::encode_data_url;

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub type ReadFuture = BoxFuture<'static, std::io::Result<Vec<u8>>>;

/// A user-chosen file. Name, type and size are known up front; the contents
/// are only read when the upload is committed.
pub trait UploadSource: Send + Sync {
    fn name(&self) -> &str;
    fn mime(&self) -> &str;
    fn size(&self) -> u64;
    fn read(&self) -> ReadFuture;
}

#[derive(Clone, Debug)]
pub struct InMemoryFile {
    name: String,
    mime: String,
    bytes: Arc<[u8]>,
}

impl InMemoryFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }
}

impl UploadSource for InMemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime(&self) -> &str {
        &self.mime
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read(&self) -> ReadFuture {
        let bytes = self.bytes.clone();
        async move { Ok::<_, std::io::Error>(bytes.to_vec()) }.boxed()
    }
}

#[derive(thiserror::Error, Clone, Debug, Eq, PartialEq)]
pub enum UploadRejection {
    #[error("{mime} is not an image type")]
    NotAnImage { mime: String },
    #[error("{size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

pub fn validate(file: &dyn UploadSource, limit: u64) -> Result<(), UploadRejection> {
    if !file.mime().starts_with("image/") {
        return Err(UploadRejection::NotAnImage {
            mime: file.mime().to_string(),
        });
    }
    if file.size() > limit {
        return Err(UploadRejection::TooLarge {
            size: file.size(),
            limit,
        });
    }
    Ok(())
}

/// File name without its final extension.
pub fn label_from_filename(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(name)
        .to_string()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadAffordance {
    pub enabled: bool,
    pub text: String,
}

pub struct UploadSession {
    limit: u64,
    pending: Vec<Box<dyn UploadSource>>,
}

impl UploadSession {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            pending: Vec::new(),
        }
    }

    /// Replaces the pending selection with the files that pass validation and
    /// reports one error per rejected file.
    pub fn select(&mut self, files: Vec<Box<dyn UploadSource>>) -> Vec<GalleryError> {
        self.pending.clear();
        let mut rejected = Vec::new();
        for file in files {
            match validate(file.as_ref(), self.limit) {
                Ok(()) => {
                    debug!(name = file.name(), size = file.size(), "upload accepted");
                    self.pending.push(file);
                }
                Err(reason) => {
                    warn!(name = file.name(), error = %reason, "upload rejected");
                    rejected.push(GalleryError::InvalidUploadFile {
                        name: file.name().to_string(),
                        reason,
                    });
                }
            }
        }
        rejected
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_names(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|file| file.name())
    }

    pub fn affordance(&self) -> UploadAffordance {
        match self.pending.as_slice() {
            [] => UploadAffordance {
                enabled: false,
                text: "Choose images".to_string(),
            },
            [file] => UploadAffordance {
                enabled: true,
                text: format!("1 file: {}", file.name()),
            },
            files => UploadAffordance {
                enabled: true,
                text: format!("{} files selected", files.len()),
            },
        }
    }

    /// Hands over the pending selection and resets the session.
    pub fn take(&mut self) -> Result<Vec<Box<dyn UploadSource>>, GalleryError> {
        if self.pending.is_empty() {
            return Err(GalleryError::EmptySelection);
        }
        Ok(std::mem::take(&mut self.pending))
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new(MAX_UPLOAD_BYTES)
    }
}

/// Reads one accepted file into an embeddable descriptor.
pub async fn decode_upload(
    file: Box<dyn UploadSource>,
    category: Category,
) -> Result<ImageDescriptor, GalleryError> {
    let bytes = file.read().await.map_err(|source| GalleryError::Decode {
        name: file.name().to_string(),
        source,
    })?;
    let locator = encode_data_url(file.mime(), &bytes);
    Ok(ImageDescriptor::local(
        locator,
        label_from_filename(file.name()),
        category,
    ))
}
