use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use protobench_cli::commands;
use protobench_cli::completions;
use protobench_cli::config::Config;
use protobench_cli::output::ExportFormat;
use protobench_core::ParserRegistry;
use protobench_store::RunQuery;
use schemars::schema_for;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Protobench: benchmark metrics management
///
/// Imports the per-protocol result files written by the benchmark
/// requesters, stores them as runs in a SQLite database, and exports or
/// compares them.
///
/// Example usage:
///   protobench import --dir results/
///   protobench list --protocol REST
///   protobench export rest_20240101_120000 --format csv
///   protobench export-all --format excel --output exports/all_benchmarks
///   protobench compare --output exports/comparison --format json --format html
///   protobench --set storage.path=/tmp/bench.db stats
///
/// Settings are read from protobench.toml (or --config) and can be
/// overridden with dot notation:
///   --set export.dir=reports
///   --set export.pretty=false
///   --set 'export.compare_formats=["json","csv"]'
#[derive(Parser)]
#[command(name = "protobench")]
#[command(version, about = "Benchmark metrics management tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,

    /// Path to TOML configuration file (defaults to ./protobench.toml if present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Override any configuration value using dot notation (can be specified multiple times)
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import legacy benchmark results (*_out.txt) into the database
    Import {
        /// Directory containing *_out.txt files
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Export one benchmark run
    Export {
        /// Run ID to export
        run_id: String,

        /// Export format (defaults to export.format)
        #[arg(short = 'f', long, value_enum)]
        format: Option<ExportFormat>,

        /// Output file path (defaults to <export.dir>/<run_id>.<ext>)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Export the latest run of every protocol
    ExportAll {
        /// Export format
        #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Excel)]
        format: ExportFormat,

        /// Output file (html, excel) or directory (csv, json)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// List stored benchmark runs, newest first
    List {
        /// Filter by protocol label
        #[arg(short = 'p', long)]
        protocol: Option<String>,

        /// Number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Number of runs to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show statistics of one benchmark run
    Show {
        /// Run ID to show
        run_id: String,
    },

    /// Show database statistics
    Stats,

    /// Delete a benchmark run and its metrics
    Delete {
        /// Run ID to delete
        run_id: String,
    },

    /// Compare the latest run of every protocol
    Compare {
        /// Directory to export the comparison into
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Formats to export (repeatable, defaults to export.compare_formats)
        #[arg(short = 'f', long, value_enum)]
        format: Vec<ExportFormat>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the configuration file
    Schema,

    /// List all valid config paths for --set flag (used by shell completions)
    #[command(hide = true)]
    CompletePaths,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Commands::Completions { shell } => {
            let bin_name = "protobench";
            match shell {
                Shell::Bash => println!("{}", completions::generate_bash_completion(bin_name)),
                _ => {
                    let mut cmd = Cli::command();
                    generate(shell, &mut cmd, bin_name.to_string(), &mut io::stdout());
                }
            }
            return Ok(());
        }
        Commands::Schema => {
            let schema = schema_for!(Config);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }
        Commands::CompletePaths => {
            for path in completions::get_config_paths() {
                println!("{}", path);
            }
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(cli.config.as_deref(), &cli.set)?;
    tracing::debug!("Using metrics database {}", config.storage.path.display());
    let store = commands::open_store(&config)?;

    match cli.command {
        Commands::Import { dir } => {
            let dir = dir.unwrap_or_else(|| config.import.dir.clone());
            let summary = commands::import(&store, &ParserRegistry::with_defaults(), &dir);
            if summary.failed > 0 {
                anyhow::bail!("{} of {} imports failed", summary.failed, summary.total());
            }
            Ok(())
        }
        Commands::Export { run_id, format, output } => {
            commands::export(&store, &config, &run_id, format, output).map(|_| ())
        }
        Commands::ExportAll { format, output } => {
            commands::export_all(&store, &config, Some(format), output).map(|_| ())
        }
        Commands::List { protocol, limit, offset } => {
            commands::list(&store, &RunQuery { protocol, limit, offset })
        }
        Commands::Show { run_id } => commands::show(&store, &run_id),
        Commands::Stats => commands::stats(&store),
        Commands::Delete { run_id } => commands::delete(&store, &run_id),
        Commands::Compare { output, format } => {
            commands::compare(&store, &config, output.as_deref(), &format).map(|_| ())
        }
        Commands::Completions { .. } | Commands::Schema | Commands::CompletePaths => Ok(()),
    }
}
