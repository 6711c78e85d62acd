//! Orchestration for a full multi-core analysis run.
//!
//! Unlike a single-function dispatch there is no result tree to read back:
//! the analysis writes its outputs into the mounted work directory. The
//! orchestration prepares container-namespace copies of the sample and
//! system configurations, derives the mounts they need, and hands both to
//! the image entrypoint.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::core::mount::{MountSpec, extend_dedup};
use crate::core::mounts::{PathProbe, derive_mounts};
use crate::core::remap::Direction;
use crate::core::translate::translate;
use crate::dispatch::{container_side, mount_policy};
use crate::io::config::{RuntimeConfig, load_config, write_config};
use crate::io::runtime::{ContainerRuntime, RunOutcome, RunRequest};
use crate::io::system::{prepare_data_mounts, read_system_config, system_config_path};

/// Container-namespace copy of the system configuration, placed in the work
/// directory before the run.
pub const SYSTEM_RUN_FILE: &str = "system-container.yaml";
/// Container-namespace copy of the sample configuration.
pub const SAMPLE_RUN_FILE: &str = "sample-container.yaml";

/// Inputs for a full analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Container image to run.
    pub image: String,
    /// Host working directory, mounted at the container work dir. Absolute.
    pub workdir: PathBuf,
    /// Sample configuration describing the input files.
    pub sample_config: PathBuf,
    /// Flow-cell directory that relative sample references resolve against.
    pub flowcell_dir: PathBuf,
    /// Host reference-data directory.
    pub datadir: PathBuf,
    /// Explicit system configuration file.
    pub system_config: Option<PathBuf>,
    /// Number of cores the analysis may use.
    pub numcores: u32,
    /// Caller-supplied mounts (e.g. the invoking user's home directory).
    pub extra_mounts: Vec<MountSpec>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Run a full analysis, leaving its outputs in the work directory.
pub fn run_analysis<R: ContainerRuntime>(
    runtime: &R,
    cfg: &RuntimeConfig,
    probe: &dyn PathProbe,
    request: &AnalysisRequest,
) -> Result<RunOutcome> {
    let sample = load_config(&request.sample_config).with_context(|| {
        format!("load sample config {}", request.sample_config.display())
    })?;
    let policy = mount_policy(cfg, Some(request.datadir.as_path()));
    let (derived, sample) = derive_mounts(&sample, &request.flowcell_dir, probe, &policy)?;

    let mut mounts = Vec::new();
    extend_dedup(&mut mounts, derived);
    extend_dedup(
        &mut mounts,
        [MountSpec::new(&request.workdir, &cfg.work_dir)?],
    );
    extend_dedup(
        &mut mounts,
        prepare_data_mounts(&request.datadir, &cfg.biodata_dir)?,
    );

    let sys_path = system_config_path(
        request.system_config.as_deref(),
        &request.workdir,
        &request.datadir,
    );
    let (system, system_mounts) = read_system_config(&sys_path, probe)?;
    extend_dedup(&mut mounts, system_mounts);
    extend_dedup(&mut mounts, request.extra_mounts.clone());

    let system_file = request.workdir.join(SYSTEM_RUN_FILE);
    let sample_file = request.workdir.join(SAMPLE_RUN_FILE);
    write_config(&system_file, &translate(&system, Direction::ToContainer, &mounts))?;
    write_config(&sample_file, &translate(&sample, Direction::ToContainer, &mounts))?;

    let mut args = vec![
        container_side(&system_file, &cfg.work_dir),
        container_side(&sample_file, &cfg.work_dir),
    ];
    args.push("--numcores".to_string());
    args.push(request.numcores.to_string());
    args.push(format!("--workdir={}", cfg.work_dir.display()));

    info!(
        image = %request.image,
        numcores = request.numcores,
        mounts = mounts.len(),
        "starting analysis"
    );
    runtime.run(&RunRequest {
        image: request.image.clone(),
        mounts,
        args,
        ports: Vec::new(),
        timeout: request.timeout,
        output_limit_bytes: request.output_limit_bytes,
    })
}
