//! Container runtime invocation.
//!
//! The [`ContainerRuntime`] trait decouples dispatch orchestration from the
//! actual runtime binary (currently `docker run`, or anything flag
//! compatible such as podman). Tests use fakes that never spawn processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::core::mount::MountSpec;
use crate::io::process::run_with_timeout;

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// One container invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Container image to run.
    pub image: String,
    /// Volume mounts exposing host data inside the container.
    pub mounts: Vec<MountSpec>,
    /// Command arguments passed to the image entrypoint.
    pub args: Vec<String>,
    /// `host:container` port pairs handed straight to the runtime.
    pub ports: Vec<String>,
    /// Maximum time to wait for the container to finish.
    pub timeout: Duration,
    /// Bound on captured stdout/stderr bytes.
    pub output_limit_bytes: usize,
}

/// Result of a finished container run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Abstraction over container runtime backends.
pub trait ContainerRuntime {
    /// Run the container to completion. A non-zero exit or timeout is an
    /// error; the caller decides whether the whole dispatch aborts.
    fn run(&self, request: &RunRequest) -> Result<RunOutcome>;
}

/// Runtime that shells out to the `docker` binary.
pub struct DockerRuntime {
    binary: String,
}

impl DockerRuntime {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a different but flag-compatible binary, e.g. `podman`.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the full `run` argument vector for a request.
///
/// Flag order is stable: volumes, then ports, then image, then command.
pub fn runtime_args(request: &RunRequest) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--rm".to_string()];
    for mount in &request.mounts {
        args.push("-v".to_string());
        args.push(mount.bind_arg());
    }
    for port in &request.ports {
        args.push("-p".to_string());
        args.push(port.clone());
    }
    args.push(request.image.clone());
    args.extend(request.args.iter().cloned());
    args
}

impl ContainerRuntime for DockerRuntime {
    fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        let args = runtime_args(request);
        info!(
            image = %request.image,
            mounts = request.mounts.len(),
            "starting container"
        );
        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);
        let output = run_with_timeout(cmd, request.timeout, request.output_limit_bytes)
            .with_context(|| format!("run {} container", self.binary))?;
        if output.timed_out {
            return Err(anyhow!("container timed out after {:?}", request.timeout));
        }
        let exit_code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            warn!(exit_code, "container exited with failure");
            return Err(anyhow!(
                "container failed with status {exit_code}: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        debug!(exit_code, "container finished");
        Ok(RunOutcome {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
