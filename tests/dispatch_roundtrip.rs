//! End-to-end dispatch round trip against an echoing fake runtime.
//!
//! The fake reads the argument file the dispatcher wrote (container
//! namespace) and echoes it back as the function result, so a successful
//! dispatch must hand the caller its own arguments, translated out and back.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use isorun::core::value::ConfigValue;
use isorun::dispatch::{DispatchRequest, run_function};
use isorun::io::config::{RuntimeConfig, load_config, write_config};
use isorun::io::host::HostFs;
use isorun::io::runtime::{ContainerRuntime, RunOutcome, RunRequest};
use isorun::test_support::{map, s, seq};

/// Reads the argument file and writes it back as the result.
struct EchoRuntime {
    workdir: PathBuf,
    seen_mounts: Mutex<Vec<String>>,
}

impl ContainerRuntime for EchoRuntime {
    fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        let mut binds: Vec<String> = request.mounts.iter().map(|m| m.bind_arg()).collect();
        self.seen_mounts.lock().expect("lock").append(&mut binds);

        let container_argfile = PathBuf::from(&request.args[2]);
        let name = container_argfile
            .file_name()
            .expect("argfile name")
            .to_string_lossy()
            .into_owned();
        let args = load_config(&self.workdir.join(&name))?;
        let stem = name.trim_end_matches(".yaml");
        write_config(&self.workdir.join(format!("{stem}-out.yaml")), &args)?;
        Ok(RunOutcome {
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }
}

#[test]
fn function_arguments_survive_the_namespace_round_trip() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonicalize");

    let workdir = root.join("work");
    let flowcell = root.join("flowcell");
    let datadir = root.join("biodata");
    fs::create_dir_all(&workdir).expect("create workdir");
    fs::create_dir_all(&flowcell).expect("create flowcell");
    fs::create_dir_all(datadir.join("galaxy")).expect("create galaxy dir");
    fs::create_dir_all(datadir.join("genomes").join("hg38").join("seq"))
        .expect("create genome dir");
    fs::write(flowcell.join("a_1.fastq.gz"), "x").expect("write fastq");
    fs::write(
        datadir.join("galaxy").join("system.yaml"),
        "resources:\n  default:\n    cores: 4\n",
    )
    .expect("write system config");

    let sample_path = workdir.join("sample.yaml");
    write_config(
        &sample_path,
        &map(vec![(
            "details",
            seq(vec![map(vec![("files", seq(vec![s("a_1.fastq.gz")]))])]),
        )]),
    )
    .expect("write sample config");

    // Arguments reference the work dir and the flow-cell data.
    let input = flowcell.join("a_1.fastq.gz").to_string_lossy().into_owned();
    let out_dir = workdir.join("align").to_string_lossy().into_owned();
    let args = map(vec![
        ("input", s(&input)),
        ("out_dir", s(&out_dir)),
        ("cores", ConfigValue::Int(4)),
    ]);

    let runtime = EchoRuntime {
        workdir: workdir.clone(),
        seen_mounts: Mutex::new(Vec::new()),
    };
    let request = DispatchRequest {
        function: "align".to_string(),
        args: args.clone(),
        image: "pipeline:1.2".to_string(),
        workdir: workdir.clone(),
        sample_config: Some(sample_path),
        flowcell_dir: Some(flowcell.clone()),
        datadir: Some(datadir.clone()),
        system_config: None,
        extra_mounts: Vec::new(),
        ports: Vec::new(),
        timeout: Duration::from_secs(60),
        output_limit_bytes: 100_000,
    };

    let result = run_function(&runtime, &RuntimeConfig::default(), &HostFs, &request)
        .expect("dispatch");

    // Echoed arguments come back exactly as they went in.
    assert_eq!(result, args);

    // The mount set exposed the flow-cell data identity-style and the
    // reference data at the biodata prefix.
    let seen = runtime.seen_mounts.lock().expect("lock").clone();
    let flowcell_bind = format!("{}:{}", flowcell.display(), flowcell.display());
    let biodata_bind = format!("{}:/mnt/biodata", datadir.display());
    assert!(seen.contains(&flowcell_bind), "mounts: {seen:?}");
    assert!(seen.contains(&biodata_bind), "mounts: {seen:?}");

    // No dispatch temp files remain in the work dir.
    let leftovers: Vec<_> = fs::read_dir(&workdir)
        .expect("read workdir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("runfn-"))
        .collect();
    assert!(leftovers.is_empty(), "leftover temp files: {leftovers:?}");
}
