use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by mount construction and derivation.
///
/// A path under no known mount is not an error anywhere in this crate; such
/// strings pass through translation unchanged.
#[derive(Error, Debug)]
pub enum MountError {
    /// The root directory given to the mount builder does not exist.
    #[error("root directory does not exist: {0}")]
    MissingRoot(PathBuf),

    /// A string claims to be a path but cannot be normalized.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}
