//! Real-filesystem probe.

use std::path::Path;

use crate::core::mounts::PathProbe;

/// Answers [`PathProbe`] questions against the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl PathProbe for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
