//! Host/container directory pairings.

use std::path::{Component, Path, PathBuf};

use crate::core::error::MountError;

/// A declared correspondence between a host directory and a container
/// directory, analogous to a bind mount.
///
/// Both sides are absolute and normalized: no trailing separators, no `.` or
/// `..` segments. Collections of mounts are ordered; when two mounts could
/// serve the same path, the earlier one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub host_path: PathBuf,
    pub container_path: PathBuf,
}

impl MountSpec {
    /// Build a mount from two absolute paths, normalizing both sides.
    pub fn new(host: impl AsRef<Path>, container: impl AsRef<Path>) -> Result<Self, MountError> {
        Ok(Self {
            host_path: normalize(host.as_ref())?,
            container_path: normalize(container.as_ref())?,
        })
    }

    /// A directory exposed at the same location inside the container.
    pub fn identity(path: impl AsRef<Path>) -> Result<Self, MountError> {
        let normalized = normalize(path.as_ref())?;
        Ok(Self {
            host_path: normalized.clone(),
            container_path: normalized,
        })
    }

    /// Wire form for a container runtime volume flag.
    pub fn bind_arg(&self) -> String {
        format!(
            "{}:{}",
            self.host_path.display(),
            self.container_path.display()
        )
    }

    /// Parse an externally supplied `HOST:CONTAINER` volume flag.
    pub fn parse_bind_arg(arg: &str) -> Result<Self, MountError> {
        let (host, container) = arg.split_once(':').ok_or_else(|| {
            MountError::InvalidPath(format!("expected HOST:CONTAINER, got '{arg}'"))
        })?;
        Self::new(host, container)
    }
}

/// Append mounts, skipping any whose host directory is already covered.
///
/// First-seen wins, so a duplicate host path with a different container side
/// resolves deterministically to the earlier mount.
pub fn extend_dedup(mounts: &mut Vec<MountSpec>, extra: impl IntoIterator<Item = MountSpec>) {
    for mount in extra {
        if !mounts.iter().any(|m| m.host_path == mount.host_path) {
            mounts.push(mount);
        }
    }
}

/// Lexically normalize an absolute path.
///
/// Drops `.` segments and trailing separators and resolves `..` against the
/// preceding segment. Relative paths are rejected; the caller decides what
/// they resolve against.
pub fn normalize(path: &Path) -> Result<PathBuf, MountError> {
    if !path.is_absolute() {
        return Err(MountError::InvalidPath(format!(
            "not absolute: {}",
            path.display()
        )));
    }
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            Component::Prefix(_) => {
                return Err(MountError::InvalidPath(format!(
                    "unsupported prefix in: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(out)
}
