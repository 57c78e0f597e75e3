use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};

use game_marts::app::query_use_case::{QueryParams, QueryUseCase};
use game_marts::config::Config;
use game_marts::error::MartError;
use game_marts::infra::csv_source::CsvRecordSource;
use game_marts::infra::dir_sink::DirectoryTableSink;
use game_marts::logging;
use game_marts::marts::{MartKind, UseCase};
use game_marts::pipeline::{self, CleanRunReport, MartBuildReport};
use game_marts::pipeline::processing::normalize::SchemaNormalizer;
use game_marts::storage::DurableTableWriter;

#[derive(Parser)]
#[command(name = "game_marts")]
#[command(about = "Clean game catalog exports and build reporting marts")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file (falls back to GAME_MARTS_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum UseCaseArg {
    Pricing,
    Reviews,
    Segments,
    All,
}

impl UseCaseArg {
    fn use_cases(self) -> Vec<UseCase> {
        match self {
            UseCaseArg::Pricing => vec![UseCase::PricingByTime],
            UseCaseArg::Reviews => vec![UseCase::ReviewsVsPrice],
            UseCaseArg::Segments => vec![UseCase::MarketSegments],
            UseCaseArg::All => UseCase::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize the raw export into the cleaned record set
    Clean,
    /// Build marts from the cleaned record set
    Marts {
        #[arg(long, value_enum, default_value = "all")]
        use_case: UseCaseArg,
    },
    /// Clean, then build every mart
    Run,
    /// Query one mart and print its rows as JSON
    Query {
        /// Mart name, e.g. q1_pricing_by_genre
        mart: String,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long)]
        name_contains: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.or_else(|| std::env::var_os("GAME_MARTS_CONFIG").map(PathBuf::from));
    match path {
        Some(p) => Config::load(&p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(Config::default()),
    }
}

fn print_clean(report: &CleanRunReport) {
    let n = &report.normalize;
    println!("\n🧹 Clean results ({}):", report.source.display());
    println!("   Rule set: {}{}", n.rule_version, if n.remapped { " (remapped)" } else { "" });
    println!("   Rows read: {}", n.total_rows);
    println!("   Kept: {}", n.kept);
    println!(
        "   Dropped: {} (missing name: {}, invalid price: {}, malformed: {})",
        n.dropped(),
        n.missing_name,
        n.invalid_price,
        n.malformed
    );
    println!("   Output file: {}", report.write.written_to().display());
    if report.write.used_fallback() {
        println!("⚠️  Destination was locked; wrote the fallback file instead");
    }
}

fn print_marts(report: &MartBuildReport) {
    println!("\n📊 Mart results ({} records):", report.records);
    for w in &report.written {
        println!("   {:<28} {:>6} rows  {}", w.mart, w.rows, w.destination.display());
        if let Some(fallback) = &w.fallback {
            println!("   ⚠️  {} was locked; wrote {} instead", w.destination.display(), fallback.display());
        }
    }
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let writer = DurableTableWriter::new();
    let sink = DirectoryTableSink::new(config.paths.marts_dir.clone());

    match cli.command {
        Commands::Clean => {
            println!("🧹 Running clean...");
            let report = pipeline::run_clean(&config, &writer)?;
            print_clean(&report);
        }
        Commands::Marts { use_case } => {
            println!("📊 Building marts...");
            let report = pipeline::build_marts(&config, &use_case.use_cases(), &sink)?;
            print_marts(&report);
        }
        Commands::Run => {
            println!("🚀 Running full pipeline (clean + marts)...");
            let (clean, marts) = pipeline::run_all(&config, &writer, &sink)?;
            print_clean(&clean);
            print_marts(&marts);
            println!("\n✅ Full pipeline completed successfully!");
        }
        Commands::Query {
            mart,
            max_price,
            name_contains,
            limit,
        } => {
            let kind: MartKind = mart.parse()?;
            let source = CsvRecordSource::new(
                config.paths.clean_file.clone(),
                SchemaNormalizer::from_config(&config.rules)?,
            );
            let facade = QueryUseCase::new(Box::new(source), &config);
            let params = QueryParams {
                max_price,
                name_contains,
                limit,
            };
            let rows = facade.query(kind, &params)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.clone())?;
    let _guard = logging::init_logging(&config.paths.log_dir);
    info!("Starting game_marts");

    if let Err(e) = run(cli, config) {
        error!("Run failed: {:#}", e);
        println!("❌ {:#}", e);
        if e
            .downcast_ref::<MartError>()
            .is_some_and(MartError::is_configuration)
        {
            println!("💡 Nothing was written; check the input file and the [paths] / [rules] settings");
        }
        return Err(e);
    }
    Ok(())
}
