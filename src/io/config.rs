//! YAML configuration files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::value::ConfigValue;

/// Load a YAML document into a configuration tree.
pub fn load_config(path: &Path) -> Result<ConfigValue> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_yaml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Write a configuration tree as YAML, atomically (temp file + rename).
pub fn write_config(path: &Path, config: &ConfigValue) -> Result<()> {
    let buf = serde_yaml::to_string(config).context("serialize config yaml")?;
    write_atomic(path, &buf)
}

/// Container runtime settings (YAML).
///
/// Describes the container-side filesystem layout the orchestrators target.
/// Missing fields default to the stock layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Working directory inside the container.
    pub work_dir: PathBuf,
    /// Fixed container prefix where host reference data is exposed.
    pub biodata_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/mnt/work"),
            biodata_dir: PathBuf::from("/mnt/biodata"),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.work_dir.is_absolute() {
            return Err(anyhow!("work_dir must be absolute"));
        }
        if !self.biodata_dir.is_absolute() {
            return Err(anyhow!("biodata_dir must be absolute"));
        }
        Ok(())
    }
}

/// Load runtime settings from a YAML file.
///
/// If the file is missing, returns `RuntimeConfig::default()`.
pub fn load_runtime_config(path: &Path) -> Result<RuntimeConfig> {
    if !path.exists() {
        let cfg = RuntimeConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RuntimeConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{map, s, seq};

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sample.yaml");
        let config = map(vec![
            ("files", seq(vec![s("/data/a.bam")])),
            ("numcores", ConfigValue::Int(8)),
        ]);

        write_config(&path, &config).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sample.yaml");
        write_config(&path, &s("/data/a.bam")).expect("write");
        assert!(path.exists());
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn missing_runtime_config_returns_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_runtime_config(&temp.path().join("missing.yaml")).expect("load");
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn runtime_config_round_trips_and_validates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runtime.yaml");
        fs::write(&path, "work_dir: /scratch\n").expect("write");
        let cfg = load_runtime_config(&path).expect("load");
        assert_eq!(cfg.work_dir, PathBuf::from("/scratch"));
        assert_eq!(cfg.biodata_dir, RuntimeConfig::default().biodata_dir);

        fs::write(&path, "work_dir: relative/dir\n").expect("write");
        assert!(load_runtime_config(&path).is_err());
    }
}
