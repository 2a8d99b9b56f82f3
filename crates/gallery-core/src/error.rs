use std::path::PathBuf;

use crate::upload::UploadRejection;

#[derive(thiserror::Error, Debug)]
pub enum GalleryError {
    #[error("rejected upload {name}: {reason}")]
    InvalidUploadFile {
        name: String,
        reason: UploadRejection,
    },
    #[error("no files selected for upload")]
    EmptySelection,
    #[error("index {index} is out of range for a view of {len} images")]
    InvalidIndex { index: usize, len: usize },
    #[error("cannot navigate an empty view")]
    EmptyViewNavigation,
    #[error("failed to read upload {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
