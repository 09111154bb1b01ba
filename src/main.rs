use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

use pod_report::session::read_labelled;
use pod_report::{
    Locale, PartitionOutput, PipelineConfig, ReportOutcome, ReportRequest, Selection, Session,
    Upload,
};

/// Split POD failure reports and summarize failure reasons
#[derive(Parser)]
#[command(name = "pod-report")]
#[command(about = "Split POD failure reports by warehouse/team and summarize failure reasons", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML pipeline configuration
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Report locales in output order (repeatable: en, zh); overrides the config
    #[arg(long = "locale", global = true)]
    locales: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split one table into per-warehouse/per-team workbooks bundled as a zip
    Partition {
        /// CSV or XLSX input
        input: PathBuf,

        #[command(flatten)]
        filters: PartitionArgs,

        /// Directory the zip bundle is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Summarize failure reasons across one or more tables
    Summarize {
        /// CSV or XLSX inputs
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,

        /// Report on each input separately instead of their union
        #[arg(long)]
        each: bool,
    },
    /// Partition one table, then summarize the resulting groups
    Run {
        input: PathBuf,

        #[command(flatten)]
        filters: PartitionArgs,

        #[command(flatten)]
        report: ReportArgs,

        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct PartitionArgs {
    /// Warehouse code, region name, or "All"
    #[arg(long, default_value = "All SEA AREAs")]
    area: String,

    /// Team ids to export (repeatable); "All" exports every team
    #[arg(long = "team", default_value = "All")]
    teams: Vec<String>,

    /// Keep only rows whose validity flag marks them invalid
    #[arg(long)]
    invalid_only: bool,
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Report date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Team id to report on, or "All"
    #[arg(long = "report-team", default_value = "All")]
    team: String,

    /// Failure reason to report on, or "All"
    #[arg(long, default_value = "All")]
    reason: String,
}

impl ReportArgs {
    fn request(&self) -> ReportRequest {
        ReportRequest {
            date: self.date.unwrap_or_else(|| Local::now().date_naive()),
            team: Selection::from_choice(&self.team),
            reason: Selection::from_choice(&self.reason),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    debug!("pod-report started with verbosity level: {}", cli.verbose);

    if let Err(e) = run(cli) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if !cli.locales.is_empty() {
        config.locales = cli
            .locales
            .iter()
            .map(|code| Locale::parse(code).with_context(|| format!("Unknown locale {code:?}")))
            .collect::<Result<_>>()?;
    }

    match cli.command {
        Commands::Partition {
            input,
            filters,
            out_dir,
        } => {
            config.pre_filter_invalid_only |= filters.invalid_only;
            let session = Session::new(config);
            run_partition(&session, &input, &filters, &out_dir)?;
        }
        Commands::Summarize {
            inputs,
            report,
            each,
        } => {
            let session = Session::new(config);
            let uploads = inputs
                .iter()
                .map(Upload::from_path)
                .collect::<Result<Vec<_>, _>>()?;
            let tables = read_labelled(&uploads)?;
            let request = report.request();
            if each {
                for (name, outcome) in session.summarize_each(&tables, &request) {
                    println!("## {name}\n");
                    match outcome {
                        Ok(outcome) => print_outcome(&outcome),
                        Err(e) if e.is_schema_validation() => println!("Warning: {e}\n"),
                        Err(e) => return Err(e.into()),
                    }
                }
            } else {
                print_outcome(&session.summarize(&tables, &request)?);
            }
        }
        Commands::Run {
            input,
            filters,
            report,
            out_dir,
        } => {
            config.pre_filter_invalid_only |= filters.invalid_only;
            let session = Session::new(config);
            run_partition(&session, &input, &filters, &out_dir)?;
            print_outcome(&session.summarize_cached(&report.request())?);
        }
    }
    Ok(())
}

fn run_partition(
    session: &Session,
    input: &Path,
    filters: &PartitionArgs,
    out_dir: &Path,
) -> Result<PartitionOutput> {
    let upload = Upload::from_path(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let output = session.partition_upload(
        &upload,
        &filters.area,
        Selection::from_choices(&filters.teams),
    )?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let target = out_dir.join(output.archive.file_name);
    fs::write(&target, &output.archive.bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    for group in &output.groups {
        println!("{} ({} rows)", group.artifact.name, group.frame.height());
    }
    info!(
        archive = %target.display(),
        entries = output.archive.entries.len(),
        "wrote export bundle"
    );
    Ok(output)
}

fn print_outcome(outcome: &ReportOutcome) {
    let report = match outcome {
        ReportOutcome::NoMatchingRecords => {
            println!("No matching records for the selected filters.\n");
            return;
        }
        ReportOutcome::Report(report) => report,
    };

    for summary in &report.summaries {
        println!("### {}\n", summary.heading);
        println!("{}\n", summary.text());
    }

    if let Some(last) = report.summaries.last() {
        println!("{}\n", last.examples_heading);
    }
    for view in &report.examples {
        if view.driver_header {
            println!("{}", view.caption());
        } else {
            println!("  Parcel: `{}`", view.tracking_number);
        }
        for url in &view.photos {
            println!("  - {url}");
        }
    }
    println!("\n---\n");
}
