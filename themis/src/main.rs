//! Themis CLI - Prepare SIDARTHE simulation input
//!
//! # Main Commands
//!
//! ```bash
//! themis run                                   # Full pipeline, all dates
//! themis run --from 2020-04-03 --to 2020-05-19 # Full pipeline, date range
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! themis check                 # Load and transform, write nothing
//! themis verify                # Check written artifacts against each other
//! themis config                # Show the effective configuration
//! ```

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use themis::config::{parse_delimiter, PipelineConfig};
use themis::logs::RUN_LOG;
use themis::{execute, verify, RunReport, TransformOptions};

#[derive(Parser)]
#[command(name = "themis")]
#[command(about = "Prepare state COVID-19 case counts for the SIDARTHE simulation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: input CSV → normalized CSV + SIDARTHE input
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// First date to keep (inclusive). Needs --to as well.
        /// The reference study used 2020-04-03.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to keep (inclusive). Needs --from as well.
        /// The reference study used 2020-05-19.
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Run every stage but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Only print errors
        #[arg(short, long)]
        quiet: bool,
    },

    /// Load and transform the input without writing artifacts
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Check that the written CSV and SIDARTHE files are consistent
    Verify {
        #[command(flatten)]
        config: ConfigArgs,

        /// CSV artifact (default: configured output)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// SIDARTHE artifact (default: configured output)
        #[arg(long)]
        sim: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Configuration flags shared by every command
#[derive(Args)]
struct ConfigArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Normalized CSV output
    #[arg(long)]
    output_csv: Option<PathBuf>,

    /// SIDARTHE input output
    #[arg(long)]
    output_sim: Option<PathBuf>,

    /// Rows before this date are dropped
    #[arg(long)]
    epidemic_start: Option<NaiveDate>,

    /// Input encoding label, or "auto"
    #[arg(long)]
    encoding: Option<String>,

    /// Input delimiter: a single character, "tab" or "auto"
    #[arg(short, long)]
    delimiter: Option<String>,
}

impl ConfigArgs {
    /// Defaults → config file → environment → flags.
    fn resolve(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;

        if let Some(ref p) = self.input {
            config.input_path = p.clone();
        }
        if let Some(ref p) = self.output_csv {
            config.output_csv_path = p.clone();
        }
        if let Some(ref p) = self.output_sim {
            config.output_sim_path = p.clone();
        }
        if let Some(d) = self.epidemic_start {
            config.epidemic_start_date = d;
        }
        if let Some(ref e) = self.encoding {
            config.encoding = e.trim().to_lowercase();
        }
        if let Some(ref d) = self.delimiter {
            config.delimiter = parse_delimiter(d)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            from,
            to,
            dry_run,
            report,
            quiet,
        } => {
            let options = TransformOptions {
                start: from,
                end: to,
                dry_run,
            };
            cmd_run(&config, &options, report.as_deref(), quiet)
        }

        Commands::Check { config } => cmd_check(&config),

        Commands::Verify { config, csv, sim } => cmd_verify(&config, csv, sim),

        Commands::Config { config } => cmd_config(&config),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(
    args: &ConfigArgs,
    options: &TransformOptions,
    report: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    RUN_LOG.set_quiet(quiet);
    let config = args.resolve()?;

    let run = execute(&config, options)?;

    if let Some(path) = report {
        let report = RunReport::collect(&config, options, run.stats.clone(), &RUN_LOG);
        report.write(path)?;
        if !quiet {
            eprintln!("💾 Report saved to: {}", path.display());
        }
    }

    if !quiet {
        eprintln!("\n✨ Done!");
    }
    Ok(())
}

fn cmd_check(args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let options = TransformOptions {
        dry_run: true,
        ..TransformOptions::default()
    };

    let run = execute(&config, &options)?;
    let stats = &run.stats;

    eprintln!("\n📊 Results:");
    eprintln!("   Rows read: {}", stats.rows_read);
    eprintln!("   Before {}: {}", config.epidemic_start_date, stats.rows_before_epidemic);
    eprintln!("   Records: {}", stats.rows_written);
    if let (Some(first), Some(last)) = (stats.first_date, stats.last_date) {
        eprintln!("   Dates: {} .. {}", first, last);
    }
    Ok(())
}

fn cmd_verify(
    args: &ConfigArgs,
    csv: Option<PathBuf>,
    sim: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    let csv = csv.unwrap_or(config.output_csv_path);
    let sim = sim.unwrap_or(config.output_sim_path);

    eprintln!("✔️  Verifying: {} + {}", csv.display(), sim.display());
    let summary = verify(&csv, &sim)?;

    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => eprintln!(
            "   ✅ {} records consistent ({} .. {})",
            summary.records, first, last
        ),
        _ => eprintln!("   ✅ Empty artifacts consistent"),
    }
    Ok(())
}

fn cmd_config(args: &ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    println!("{}", config.to_json()?);
    Ok(())
}
