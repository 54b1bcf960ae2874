//! Roster Attrs - Entry Point
//!
//! Batch commands over a source roster database: `attr-report` writes the
//! conversion report, `export` writes every converted worker.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use roster_attrs::convert::AttributeConverter;
use roster_attrs::core::{ImportError, PipelineConfig, Result};
use roster_attrs::profile::{load_profile, MappingProfile};
use roster_attrs::report::{write_json, ReportGenerator, SourceStore};

/// Roster Attrs - convert source roster attributes to the target scale
#[derive(Parser, Debug)]
#[command(name = "roster-attrs")]
#[command(about = "Convert and report on imported roster attributes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the per-attribute conversion report
    AttrReport(RunArgs),
    /// Write every converted worker
    Export(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Source roster database (SQLite)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Output JSON path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Mapping profile (JSON or TOML)
    #[arg(long, default_value_os_t = PipelineConfig::default().profile_path)]
    profile: PathBuf,

    /// Random seed, overriding the profile's
    #[arg(long)]
    seed: Option<u64>,
}

struct Run {
    store: SourceStore,
    converter: AttributeConverter,
    generator: ReportGenerator,
    out: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::AttrReport(args) => attr_report(args),
        Command::Export(args) => export(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn attr_report(args: RunArgs) -> Result<()> {
    let Run {
        store,
        mut converter,
        generator,
        out,
    } = prepare(args)?;

    let report = generator.generate(&store, &mut converter)?;
    write_json(&out, &report)?;
    println!(
        "Report for '{}' written to {}",
        report.source_table,
        out.display()
    );
    Ok(())
}

fn export(args: RunArgs) -> Result<()> {
    let Run {
        store,
        mut converter,
        generator,
        out,
    } = prepare(args)?;

    let workers = generator.export(&store, &mut converter)?;
    write_json(&out, &workers)?;
    println!("{} workers written to {}", workers.len(), out.display());
    Ok(())
}

fn prepare(args: RunArgs) -> Result<Run> {
    let source = args.source.ok_or(ImportError::MissingArgument("--source"))?;
    let out = args.out.ok_or(ImportError::MissingArgument("--out"))?;

    let config = PipelineConfig {
        profile_path: args.profile,
        ..PipelineConfig::default()
    };

    let profile = load_profile(&config.profile_path)?;
    let seed = resolve_seed(args.seed, &profile);
    tracing::info!("Using seed {}", seed);

    Ok(Run {
        store: open_store(&source)?,
        converter: AttributeConverter::seeded(profile, seed),
        generator: ReportGenerator::new(config)?,
        out,
    })
}

fn open_store(path: &Path) -> Result<SourceStore> {
    let store = SourceStore::open(path)?;
    tracing::info!("Opened source store {}", path.display());
    Ok(store)
}

/// CLI seed, else the profile's configured seed, else 0
fn resolve_seed(cli_seed: Option<u64>, profile: &MappingProfile) -> u64 {
    cli_seed.unwrap_or_else(|| profile.configured_seed())
}
