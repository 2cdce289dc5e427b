//! Hosting CLI: runs the pipeline once and maps the outcome to a process
//! exit code (0 on success with passing verification, non-zero otherwise).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use chroma_rs::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Target {
    Cpu,
    Gpu,
}

impl From<Target> for DeviceKind {
    fn from(target: Target) -> Self {
        match target {
            Target::Cpu => DeviceKind::Cpu,
            Target::Gpu => DeviceKind::Gpu,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "chroma",
    about = "Dispatch a bulk pixel transform to an OpenCL device and compare it against a serial baseline",
    version
)]
struct Cli {
    /// Number of records to generate and transform.
    #[arg(long, default_value_t = 1_000_000)]
    records: usize,

    /// Work-items per work-group for the device dispatch.
    #[arg(long, default_value_t = 64)]
    local_size: usize,

    /// Device class to dispatch to.
    #[arg(long, value_enum, default_value_t = Target::Gpu)]
    target: Target,

    /// Path to the kernel source text.
    #[arg(long, default_value = "kernels/halve_brightness.cl")]
    kernel: PathBuf,

    /// Entry point to resolve in the compiled program.
    #[arg(long, default_value = "halve_brightness")]
    entry: String,

    /// Per-component tolerance for the serial/device comparison.
    #[arg(long, default_value_t = 1e-5)]
    tolerance: f32,

    /// Also write the run report as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match PipelineConfig::builder()
        .record_count(cli.records)
        .local_group_size(cli.local_size)
        .target(cli.target.into())
        .kernel_path(cli.kernel)
        .entry_point(cli.entry)
        .tolerance(cli.tolerance)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid arguments: {err}");
            return ExitCode::from(2);
        }
    };

    let report = match chroma_rs::run(&config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("pipeline failed during {}: {err}", err.stage());
            return ExitCode::FAILURE;
        }
    };

    print!("{report}");

    if let Some(path) = &cli.json {
        if let Err(err) = report.write_json(path) {
            eprintln!("pipeline failed during {}: {err}", err.stage());
            return ExitCode::FAILURE;
        }
    }

    if report.verification.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
