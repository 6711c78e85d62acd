//! Mount set derivation from configuration trees.

use std::path::{Path, PathBuf};

use crate::core::error::MountError;
use crate::core::mount::{MountSpec, normalize};
use crate::core::value::ConfigValue;

/// Read-only filesystem questions the mount builder is allowed to ask.
///
/// The real answers come from [`crate::io::host::HostFs`]; tests substitute
/// an in-memory fake so derivation stays deterministic and I/O free.
pub trait PathProbe {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
}

/// Container-side placement policy for derived mounts.
///
/// The default is identity: a host directory appears at the same location
/// inside the container. When a reference-data root is configured, host
/// directories under it are placed at the corresponding location beneath the
/// fixed container prefix instead.
#[derive(Debug, Clone, Default)]
pub struct MountPolicy {
    /// Host reference-data root paired with the container prefix it maps to.
    pub data_root: Option<(PathBuf, PathBuf)>,
}

impl MountPolicy {
    fn place(&self, host_dir: &Path) -> PathBuf {
        if let Some((root, prefix)) = &self.data_root
            && let Ok(rest) = host_dir.strip_prefix(root)
        {
            return if rest.as_os_str().is_empty() {
                prefix.clone()
            } else {
                prefix.join(rest)
            };
        }
        host_dir.to_path_buf()
    }
}

/// Derive the mounts needed to expose every file referenced by `config`.
///
/// Walks the tree in deterministic order (sorted mapping keys, sequence
/// order) collecting string scalars that name existing host paths, either
/// absolute or relative to `root_dir`. Each discovered path contributes one
/// mount for its exposure directory (the path itself when it is a directory,
/// its parent otherwise), deduplicated by host directory with first-seen
/// order preserved.
///
/// Returns the mounts plus the configuration with those relative references
/// rewritten to their absolute host form. Strings that do not resolve to an
/// existing path are left alone; derivation is best effort and only an
/// unusable `root_dir` is fatal.
pub fn derive_mounts(
    config: &ConfigValue,
    root_dir: &Path,
    probe: &dyn PathProbe,
    policy: &MountPolicy,
) -> Result<(Vec<MountSpec>, ConfigValue), MountError> {
    if !probe.is_dir(root_dir) {
        return Err(MountError::MissingRoot(root_dir.to_path_buf()));
    }
    let mut builder = Builder {
        root_dir: normalize(root_dir)?,
        probe,
        policy,
        mounts: Vec::new(),
    };
    let rewritten = builder.visit(config);
    Ok((builder.mounts, rewritten))
}

/// Expose the reference-genome directory implicated by `path`, if any.
///
/// Genome data is read as a directory of co-located index files, so when a
/// path sits inside a genome directory the whole directory is mounted, not
/// just the referenced file. Returns an empty set when no genome directory
/// is implicated.
pub fn find_genome_mounts(path: &Path, probe: &dyn PathProbe) -> Vec<MountSpec> {
    let Ok(start) = normalize(path) else {
        return Vec::new();
    };
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if is_genome_dir(dir, probe) {
            return vec![MountSpec {
                host_path: dir.to_path_buf(),
                container_path: dir.to_path_buf(),
            }];
        }
        current = dir.parent();
    }
    Vec::new()
}

/// A genome directory holds a `seq` subdirectory of sequence data, or sits
/// directly under a `genomes` collection directory.
fn is_genome_dir(dir: &Path, probe: &dyn PathProbe) -> bool {
    if !probe.is_dir(dir) {
        return false;
    }
    if probe.is_dir(&dir.join("seq")) {
        return true;
    }
    dir.parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == "genomes")
}

struct Builder<'a> {
    root_dir: PathBuf,
    probe: &'a dyn PathProbe,
    policy: &'a MountPolicy,
    mounts: Vec<MountSpec>,
}

impl Builder<'_> {
    fn visit(&mut self, value: &ConfigValue) -> ConfigValue {
        match value {
            ConfigValue::Mapping(entries) => ConfigValue::Mapping(
                entries
                    .iter()
                    .map(|(key, child)| (key.clone(), self.visit(child)))
                    .collect(),
            ),
            ConfigValue::Sequence(items) => {
                ConfigValue::Sequence(items.iter().map(|item| self.visit(item)).collect())
            }
            ConfigValue::String(scalar) => self.visit_scalar(scalar),
            other => other.clone(),
        }
    }

    fn visit_scalar(&mut self, scalar: &str) -> ConfigValue {
        match self.resolve(scalar) {
            Some(resolved) => {
                self.record(&resolved);
                ConfigValue::String(resolved.to_string_lossy().into_owned())
            }
            None => ConfigValue::String(scalar.to_string()),
        }
    }

    /// An absolute existing path, or a relative reference that exists under
    /// the root directory. Anything else is treated as a non-path string.
    fn resolve(&self, scalar: &str) -> Option<PathBuf> {
        if scalar.is_empty() || scalar.contains('\n') {
            return None;
        }
        let candidate = Path::new(scalar);
        let absolute = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root_dir.join(candidate)
        };
        let normalized = normalize(&absolute).ok()?;
        self.probe.exists(&normalized).then_some(normalized)
    }

    fn record(&mut self, path: &Path) {
        let host_dir = if self.probe.is_dir(path) {
            path.to_path_buf()
        } else {
            match path.parent() {
                Some(parent) => parent.to_path_buf(),
                None => return,
            }
        };
        if self.mounts.iter().any(|m| m.host_path == host_dir) {
            return;
        }
        let container_path = self.policy.place(&host_dir);
        self.mounts.push(MountSpec {
            host_path: host_dir,
            container_path,
        });
    }
}
