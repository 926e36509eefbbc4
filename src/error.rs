use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::ImageId;

/// Library error type for catalog loading.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog path is missing or neither a file nor a directory.
    #[error("invalid catalog path: {0}")]
    BadPath(PathBuf),

    /// A directory scan completed but found no images.
    #[error("no images found under {0}")]
    EmptyScan(PathBuf),

    /// Two records share the same id.
    #[error("duplicate image id {0}")]
    DuplicateId(ImageId),

    /// A record has an empty resource locator.
    #[error("image {0} has an empty path")]
    EmptyPath(ImageId),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON catalog decode error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
