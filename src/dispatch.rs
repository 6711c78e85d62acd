//! Orchestration for dispatching one pipeline function into a container.
//!
//! The dispatch round trip: derive the mounts that expose every referenced
//! file, rewrite the argument tree into the container namespace, invoke the
//! runtime, read the result file back, rewrite it into the host namespace,
//! and clean up the temporary files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::mount::{MountSpec, extend_dedup};
use crate::core::mounts::{MountPolicy, PathProbe, derive_mounts};
use crate::core::remap::Direction;
use crate::core::translate::translate;
use crate::core::value::ConfigValue;
use crate::io::config::{RuntimeConfig, load_config, write_config};
use crate::io::runtime::{ContainerRuntime, RunRequest};
use crate::io::system::{prepare_data_mounts, read_system_config, system_config_path};

/// Inputs for a single-function dispatch.
///
/// Everything the dispatch needs from the ambient process — working
/// directory, home directory, data directory — arrives here explicitly;
/// nothing below this layer reads process globals.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Name of the pipeline function to run inside the container.
    pub function: String,
    /// Argument tree handed to the function, in host namespace.
    pub args: ConfigValue,
    /// Container image to run.
    pub image: String,
    /// Host working directory, mounted at the container work dir. Absolute.
    pub workdir: PathBuf,
    /// Sample configuration describing input files, when the function needs
    /// file mounts derived.
    pub sample_config: Option<PathBuf>,
    /// Directory that relative references in the sample config resolve
    /// against (the flow-cell directory). Defaults to `workdir`.
    pub flowcell_dir: Option<PathBuf>,
    /// Host reference-data directory.
    pub datadir: Option<PathBuf>,
    /// Explicit system configuration file.
    pub system_config: Option<PathBuf>,
    /// Caller-supplied mounts (e.g. the invoking user's home directory).
    pub extra_mounts: Vec<MountSpec>,
    /// `host:container` port pairs.
    pub ports: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Run `request.function` inside a container and return its result tree in
/// host namespace.
pub fn run_function<R: ContainerRuntime>(
    runtime: &R,
    cfg: &RuntimeConfig,
    probe: &dyn PathProbe,
    request: &DispatchRequest,
) -> Result<ConfigValue> {
    let mounts = collect_mounts(cfg, probe, request)?;

    let tag = Uuid::new_v4();
    let argfile = request
        .workdir
        .join(format!("runfn-{}-{}.yaml", request.function, tag));
    let outfile = request
        .workdir
        .join(format!("runfn-{}-{}-out.yaml", request.function, tag));

    let container_args = translate(&request.args, Direction::ToContainer, &mounts);
    write_config(&argfile, &container_args)
        .with_context(|| format!("write argument file {}", argfile.display()))?;
    debug!(argfile = %argfile.display(), mounts = mounts.len(), "dispatching function");

    let run = RunRequest {
        image: request.image.clone(),
        mounts: mounts.clone(),
        args: vec![
            "runfn".to_string(),
            request.function.clone(),
            container_side(&argfile, &cfg.work_dir),
        ],
        ports: request.ports.clone(),
        timeout: request.timeout,
        output_limit_bytes: request.output_limit_bytes,
    };

    let result = runtime.run(&run).and_then(|_| {
        if !outfile.exists() {
            return Err(anyhow!(
                "container produced no output file {}",
                outfile.display()
            ));
        }
        let container_out = load_config(&outfile)
            .with_context(|| format!("read output file {}", outfile.display()))?;
        Ok(translate(&container_out, Direction::ToHost, &mounts))
    });

    remove_temp(&argfile);
    remove_temp(&outfile);
    result
}

/// Assemble the full mount set for a dispatch: sample-derived mounts, the
/// work directory, reference data, system-config references, then
/// caller-supplied extras. Deduplicated by host path, first seen wins.
fn collect_mounts(
    cfg: &RuntimeConfig,
    probe: &dyn PathProbe,
    request: &DispatchRequest,
) -> Result<Vec<MountSpec>> {
    let mut mounts = Vec::new();

    if let Some(sample_config) = &request.sample_config {
        let root = request
            .flowcell_dir
            .clone()
            .unwrap_or_else(|| request.workdir.clone());
        let sample = load_config(sample_config)
            .with_context(|| format!("load sample config {}", sample_config.display()))?;
        let policy = mount_policy(cfg, request.datadir.as_deref());
        let (derived, _) = derive_mounts(&sample, &root, probe, &policy)?;
        extend_dedup(&mut mounts, derived);
    }

    extend_dedup(
        &mut mounts,
        [MountSpec::new(&request.workdir, &cfg.work_dir)?],
    );

    if let Some(datadir) = &request.datadir {
        extend_dedup(&mut mounts, prepare_data_mounts(datadir, &cfg.biodata_dir)?);
        let sys_path =
            system_config_path(request.system_config.as_deref(), &request.workdir, datadir);
        if probe.exists(&sys_path) {
            let (_, system_mounts) = read_system_config(&sys_path, probe)?;
            extend_dedup(&mut mounts, system_mounts);
        }
    }

    extend_dedup(&mut mounts, request.extra_mounts.clone());
    Ok(mounts)
}

/// Reference-data placement for derived mounts: identity unless the path
/// sits under the data directory, which lives at the biodata prefix.
pub(crate) fn mount_policy(cfg: &RuntimeConfig, datadir: Option<&Path>) -> MountPolicy {
    MountPolicy {
        data_root: datadir.map(|dir| (dir.to_path_buf(), cfg.biodata_dir.clone())),
    }
}

/// Container-side location of a file placed in the mounted work directory.
pub(crate) fn container_side(path: &Path, container_work_dir: &Path) -> String {
    match path.file_name() {
        Some(name) => container_work_dir.join(name).to_string_lossy().into_owned(),
        None => container_work_dir.to_string_lossy().into_owned(),
    }
}

fn remove_temp(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), err = %err, "failed to remove temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::host::HostFs;
    use crate::io::runtime::RunOutcome;
    use crate::test_support::{map, s, seq};
    use std::sync::Mutex;

    /// Runtime fake that records the request, captures the argument file as
    /// written to disk, and optionally writes the conventional output file.
    struct FakeRuntime {
        workdir: PathBuf,
        result: Option<ConfigValue>,
        seen_args: Mutex<Option<ConfigValue>>,
        seen_request: Mutex<Option<RunRequest>>,
    }

    impl FakeRuntime {
        fn new(workdir: &Path, result: Option<ConfigValue>) -> Self {
            Self {
                workdir: workdir.to_path_buf(),
                result,
                seen_args: Mutex::new(None),
                seen_request: Mutex::new(None),
            }
        }
    }

    impl ContainerRuntime for FakeRuntime {
        fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
            *self.seen_request.lock().expect("lock") = Some(request.clone());

            let container_argfile = PathBuf::from(&request.args[2]);
            let name = container_argfile
                .file_name()
                .expect("argfile name")
                .to_string_lossy()
                .into_owned();
            let host_argfile = self.workdir.join(&name);
            *self.seen_args.lock().expect("lock") = Some(load_config(&host_argfile)?);

            if let Some(result) = &self.result {
                let stem = name.trim_end_matches(".yaml");
                let outfile = self.workdir.join(format!("{stem}-out.yaml"));
                write_config(&outfile, result)?;
            }
            Ok(RunOutcome {
                exit_code: 0,
                stdout: Vec::new(),
                stderr: Vec::new(),
            })
        }
    }

    fn request(workdir: &Path, args: ConfigValue) -> DispatchRequest {
        DispatchRequest {
            function: "align".to_string(),
            args,
            image: "pipeline:1.2".to_string(),
            workdir: workdir.to_path_buf(),
            sample_config: None,
            flowcell_dir: None,
            datadir: None,
            system_config: None,
            extra_mounts: Vec::new(),
            ports: Vec::new(),
            timeout: Duration::from_secs(60),
            output_limit_bytes: 100_000,
        }
    }

    #[test]
    fn dispatch_translates_both_ways_and_cleans_up() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workdir = temp.path().canonicalize().expect("canonicalize");
        let cfg = RuntimeConfig::default();

        let input_bam = workdir.join("input.bam").to_string_lossy().into_owned();
        let args = map(vec![("files", seq(vec![s(&input_bam)]))]);

        // The fake's result carries a container-namespace path.
        let container_result = map(vec![("out", s("/mnt/work/result.bam"))]);
        let runtime = FakeRuntime::new(&workdir, Some(container_result));

        let result =
            run_function(&runtime, &cfg, &HostFs, &request(&workdir, args)).expect("dispatch");

        // Result paths came back in host namespace.
        let expected_out = workdir.join("result.bam").to_string_lossy().into_owned();
        assert_eq!(result, map(vec![("out", s(&expected_out))]));

        // The argument file the container saw was in container namespace.
        let seen = runtime.seen_args.lock().expect("lock").clone().expect("args seen");
        assert_eq!(seen, map(vec![("files", seq(vec![s("/mnt/work/input.bam")]))]));

        // Temp files are gone.
        let leftovers: Vec<_> = fs::read_dir(&workdir)
            .expect("read workdir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("runfn-"))
            .collect();
        assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
    }

    #[test]
    fn missing_output_file_is_an_error_and_argfile_is_removed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workdir = temp.path().canonicalize().expect("canonicalize");
        let cfg = RuntimeConfig::default();
        let runtime = FakeRuntime::new(&workdir, None);

        let err = run_function(&runtime, &cfg, &HostFs, &request(&workdir, ConfigValue::Null))
            .expect_err("must fail");
        assert!(err.to_string().contains("no output file"));

        let leftovers = fs::read_dir(&workdir).expect("read workdir").count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn sample_config_contributes_derived_mounts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let workdir = temp.path().canonicalize().expect("canonicalize");
        let flowcell = workdir.join("flowcell");
        fs::create_dir(&flowcell).expect("create flowcell");
        fs::write(flowcell.join("a_1.fastq.gz"), "x").expect("write fastq");

        let sample_path = workdir.join("sample.yaml");
        write_config(&sample_path, &map(vec![("files", seq(vec![s("a_1.fastq.gz")]))]))
            .expect("write sample config");

        let cfg = RuntimeConfig::default();
        let runtime = FakeRuntime::new(&workdir, Some(ConfigValue::Null));
        let mut req = request(&workdir, ConfigValue::Null);
        req.sample_config = Some(sample_path);
        req.flowcell_dir = Some(flowcell.clone());

        run_function(&runtime, &cfg, &HostFs, &req).expect("dispatch");

        let seen = runtime
            .seen_request
            .lock()
            .expect("lock")
            .clone()
            .expect("request seen");
        assert!(seen.mounts.iter().any(|m| m.host_path == flowcell));
        assert!(
            seen.mounts
                .iter()
                .any(|m| m.host_path == workdir && m.container_path == cfg.work_dir)
        );
    }
}
