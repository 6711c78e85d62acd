//! System configuration preparation.
//!
//! The system configuration describes the reference tool setup shared by all
//! analyses (the Galaxy tool data layout in particular). Before a dispatch
//! it needs its reference entries resolved to canonical host locations, and
//! it implies extra mounts: the directory holding each reference file, plus
//! any genome directory that directory sits in.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::mount::{MountSpec, extend_dedup, normalize};
use crate::core::mounts::{PathProbe, find_genome_mounts};
use crate::core::value::ConfigValue;
use crate::io::config::{load_config, write_config};

/// File name of the system configuration inside a data directory.
pub const SYSTEM_CONFIG_FILE: &str = "system.yaml";
/// Mapping keys whose values point at reference tool configuration files.
const REFERENCE_KEYS: &[&str] = &["galaxy_config"];

/// Resolve the system configuration file location.
///
/// An explicit path wins (made absolute against `base_dir` when relative);
/// otherwise the stock location inside the data directory is used.
pub fn system_config_path(explicit: Option<&Path>, base_dir: &Path, datadir: &Path) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base_dir.join(path),
        None => datadir.join("galaxy").join(SYSTEM_CONFIG_FILE),
    }
}

/// Load the system configuration, defaulting the `galaxy_config` entry to a
/// `galaxy.ini` sibling of the configuration file when absent.
pub fn load_system_config(path: &Path) -> Result<ConfigValue> {
    let mut config =
        load_config(path).with_context(|| format!("load system config {}", path.display()))?;
    if let ConfigValue::Mapping(entries) = &mut config
        && !entries.contains_key("galaxy_config")
        && let Some(dir) = path.parent()
    {
        entries.insert(
            "galaxy_config".to_string(),
            ConfigValue::String(dir.join("galaxy.ini").to_string_lossy().into_owned()),
        );
    }
    Ok(config)
}

/// Load the system configuration and derive the mounts exposing the
/// reference directories it points at.
///
/// Each reference entry is rewritten to its canonical (symlink-resolved)
/// location and contributes an identity mount for its directory, plus any
/// genome mounts implicated by that directory.
pub fn read_system_config(
    path: &Path,
    probe: &dyn PathProbe,
) -> Result<(ConfigValue, Vec<MountSpec>)> {
    let mut config = load_system_config(path)?;
    let mut mounts = Vec::new();
    if let ConfigValue::Mapping(entries) = &mut config {
        for key in REFERENCE_KEYS {
            let Some(ConfigValue::String(raw)) = entries.get(*key).cloned() else {
                continue;
            };
            let resolved = canonical_or_lexical(Path::new(&raw));
            let (Some(dir), Some(base)) = (resolved.parent(), resolved.file_name()) else {
                continue;
            };
            if let Ok(mount) = MountSpec::identity(dir) {
                extend_dedup(&mut mounts, [mount]);
            }
            extend_dedup(&mut mounts, find_genome_mounts(dir, probe));
            entries.insert(
                (*key).to_string(),
                ConfigValue::String(dir.join(base).to_string_lossy().into_owned()),
            );
        }
    }
    Ok((config, mounts))
}

/// Mount exposing the host reference-data directory at the container's
/// fixed biodata prefix.
pub fn prepare_data_mounts(datadir: &Path, biodata_dir: &Path) -> Result<Vec<MountSpec>> {
    Ok(vec![MountSpec::new(datadir, biodata_dir)?])
}

/// Write a ready-to-run copy of the system configuration into the working
/// directory, returning its path.
pub fn write_local_system_config(workdir: &Path, config: &ConfigValue) -> Result<PathBuf> {
    let path = workdir.join("system-prep.yaml");
    write_config(&path, config)?;
    Ok(path)
}

/// Resolve symlinks when the target exists, falling back to a lexical
/// normalization (the entry may point at data that is not present yet).
fn canonical_or_lexical(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .ok()
        .or_else(|| normalize(path).ok())
        .unwrap_or_else(|| path.to_path_buf())
}
