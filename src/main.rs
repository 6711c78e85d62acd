//! Container dispatch for bioinformatics pipeline functions.
//!
//! Runs full analyses (`run`) or single pipeline functions (`runfn`) inside
//! an isolated container, deriving the volume mounts that expose input and
//! reference data and translating every filesystem path in the
//! configuration between host and container namespaces.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use isorun::analysis::{AnalysisRequest, run_analysis};
use isorun::core::mount::MountSpec;
use isorun::dispatch::{DispatchRequest, run_function};
use isorun::exit_codes;
use isorun::io::config::{RuntimeConfig, load_config, load_runtime_config};
use isorun::io::host::HostFs;
use isorun::io::runtime::{DEFAULT_OUTPUT_LIMIT_BYTES, DockerRuntime};
use isorun::io::system::{load_system_config, system_config_path, write_local_system_config};
use isorun::logging;

#[derive(Parser)]
#[command(
    name = "isorun",
    version,
    about = "Run bioinformatics pipeline functions inside isolated containers"
)]
struct Cli {
    /// Runtime settings file (YAML); defaults apply when missing.
    #[arg(long, global = true)]
    runtime_config: Option<PathBuf>,

    /// Container runtime binary (docker or flag compatible).
    #[arg(long, global = true, default_value = "docker")]
    runtime_binary: String,

    /// Maximum seconds to wait for a container to finish.
    #[arg(long, global = true, default_value_t = 24 * 60 * 60)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full analysis on the local machine, using multiple cores.
    Run {
        /// Sample configuration describing the input files.
        #[arg(long)]
        sample_config: PathBuf,
        /// Flow-cell directory holding the raw input files.
        #[arg(long)]
        fcdir: PathBuf,
        /// System configuration file (defaults to one inside the data directory).
        #[arg(long)]
        systemconfig: Option<PathBuf>,
        /// Reference-data directory on the host.
        #[arg(long)]
        datadir: PathBuf,
        /// Number of cores the analysis may use.
        #[arg(long, default_value_t = 1)]
        numcores: u32,
        /// Container image to run.
        #[arg(long)]
        image: String,
        /// Extra volume mounts, HOST:CONTAINER.
        #[arg(short = 'v', long = "volume")]
        volumes: Vec<String>,
    },
    /// Run a single pipeline function inside a container and print its result.
    Runfn {
        /// Function name.
        name: String,
        /// YAML file holding the function arguments.
        #[arg(long)]
        argfile: PathBuf,
        /// Container image to run.
        #[arg(long)]
        image: String,
        /// Sample configuration to derive file mounts from.
        #[arg(long)]
        sample_config: Option<PathBuf>,
        /// Flow-cell directory for relative sample references.
        #[arg(long)]
        fcdir: Option<PathBuf>,
        /// System configuration file.
        #[arg(long)]
        systemconfig: Option<PathBuf>,
        /// Reference-data directory on the host.
        #[arg(long)]
        datadir: Option<PathBuf>,
        /// Extra volume mounts, HOST:CONTAINER.
        #[arg(short = 'v', long = "volume")]
        volumes: Vec<String>,
        /// Port mappings, HOST:CONTAINER.
        #[arg(short = 'p', long = "publish")]
        ports: Vec<String>,
        /// Write the result tree here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a ready-to-run system configuration into the working directory.
    PrepSystem {
        /// System configuration file.
        #[arg(long)]
        systemconfig: Option<PathBuf>,
        /// Reference-data directory on the host.
        #[arg(long)]
        datadir: PathBuf,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = match &cli.runtime_config {
        Some(path) => load_runtime_config(path)?,
        None => RuntimeConfig::default(),
    };
    let runtime = DockerRuntime::with_binary(cli.runtime_binary.clone());
    let timeout = Duration::from_secs(cli.timeout_secs);
    let workdir = std::env::current_dir().context("resolve working directory")?;

    match cli.command {
        Command::Run {
            sample_config,
            fcdir,
            systemconfig,
            datadir,
            numcores,
            image,
            volumes,
        } => {
            let request = AnalysisRequest {
                image,
                workdir: workdir.clone(),
                sample_config: absolutize(&sample_config, &workdir),
                flowcell_dir: absolutize(&fcdir, &workdir),
                datadir: absolutize(&datadir, &workdir),
                system_config: systemconfig,
                numcores,
                extra_mounts: base_mounts(&volumes)?,
                timeout,
                output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            };
            run_analysis(&runtime, &cfg, &HostFs, &request)?;
            Ok(())
        }
        Command::Runfn {
            name,
            argfile,
            image,
            sample_config,
            fcdir,
            systemconfig,
            datadir,
            volumes,
            ports,
            out,
        } => {
            let args = load_config(&argfile)
                .with_context(|| format!("load argument file {}", argfile.display()))?;
            let request = DispatchRequest {
                function: name,
                args,
                image,
                workdir: workdir.clone(),
                sample_config,
                flowcell_dir: fcdir.map(|dir| absolutize(&dir, &workdir)),
                datadir: datadir.map(|dir| absolutize(&dir, &workdir)),
                system_config: systemconfig,
                extra_mounts: base_mounts(&volumes)?,
                ports,
                timeout,
                output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            };
            let result = run_function(&runtime, &cfg, &HostFs, &request)?;
            let rendered = serde_yaml::to_string(&result).context("render result yaml")?;
            match out {
                Some(path) => std::fs::write(&path, rendered)
                    .with_context(|| format!("write result {}", path.display()))?,
                None => print!("{rendered}"),
            }
            Ok(())
        }
        Command::PrepSystem {
            systemconfig,
            datadir,
        } => {
            let datadir = absolutize(&datadir, &workdir);
            let path = system_config_path(systemconfig.as_deref(), &workdir, &datadir);
            let config = load_system_config(&path)?;
            let written = write_local_system_config(&workdir, &config)?;
            println!("{}", written.display());
            Ok(())
        }
    }
}

/// Make a CLI-supplied path absolute against the working directory.
fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Externally supplied mounts: CLI volume flags plus the invoking user's
/// home directory, exposed at the same location inside the container.
fn base_mounts(volumes: &[String]) -> Result<Vec<MountSpec>> {
    let mut mounts = Vec::new();
    for volume in volumes {
        mounts.push(MountSpec::parse_bind_arg(volume)?);
    }
    if let Ok(home) = std::env::var("HOME")
        && !home.is_empty()
    {
        mounts.push(MountSpec::identity(&home)?);
    }
    Ok(mounts)
}
