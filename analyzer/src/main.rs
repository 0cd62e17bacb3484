//! rj-lethality CLI - ISP-RJ violent lethality for one municipality-year
//!
//! # Commands
//!
//! ```bash
//! rj-lethality clean                     # Raw file → cleaned file
//! rj-lethality summarize [--json out]    # Cleaned file → text summary
//! rj-lethality plot                      # Cleaned file → SVG charts
//! rj-lethality run                       # clean, summarize, plot
//! rj-lethality detect-year               # Latest complete year
//! ```
//!
//! Exit status is 0 on success, 2 when the filters match no rows, 1 for
//! any other failure.

use clap::{Args, Parser, Subcommand};
use lethality::{
    clean, detect_year, plot_cleaned, summarize_cleaned, AnalysisConfig, PipelineResult,
    TextEncoding, YearSelection,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rj-lethality")]
#[command(about = "Clean, summarize and chart ISP-RJ violent lethality data", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON config file (partial; omitted fields keep defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input and cleaned files
    #[arg(long, global = true, env = "RJL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Raw ISP-RJ monthly file
    #[arg(short, long, global = true, env = "RJL_INPUT")]
    input: Option<PathBuf>,

    /// Directory for rendered charts
    #[arg(long, global = true, env = "RJL_PLOTS_DIR")]
    plots_dir: Option<PathBuf>,

    /// Target year, or "auto" for the latest complete year
    #[arg(short, long, global = true, env = "RJL_YEAR")]
    year: Option<YearSelection>,

    /// Target municipality (case-insensitive)
    #[arg(short, long, global = true, env = "RJL_MUNICIPALITY")]
    municipality: Option<String>,

    /// Input encoding: latin1, utf-8, windows-1252 or auto
    #[arg(long, global = true)]
    encoding: Option<TextEncoding>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter and aggregate the raw file into the cleaned file
    Clean,

    /// Summarize the cleaned file into the text report
    Summarize {
        /// Also write the summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Render the four charts from the cleaned file
    Plot,

    /// Clean, summarize and plot in one go
    Run {
        /// Also write the summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print the latest complete year for the municipality
    DetectYear,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = build_config(&cli.global).and_then(|config| match cli.command {
        Commands::Clean => cmd_clean(&config),
        Commands::Summarize { json } => cmd_summarize(&config, json.as_deref()),
        Commands::Plot => cmd_plot(&config),
        Commands::Run { json } => cmd_run(&config, json.as_deref()),
        Commands::DetectYear => cmd_detect_year(&config),
    });

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Defaults, then the config file, then environment and flags.
fn build_config(args: &GlobalArgs) -> PipelineResult<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(input) = &args.input {
        config.input_file = input.clone();
    }
    if let Some(dir) = &args.plots_dir {
        config.plots_dir = dir.clone();
    }
    if let Some(year) = args.year {
        config.year = year;
    }
    if let Some(municipality) = &args.municipality {
        config.municipality = municipality.clone();
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }

    Ok(config.validate()?)
}

fn cmd_clean(config: &AnalysisConfig) -> PipelineResult<()> {
    eprintln!("📄 Processing: {}", config.input_file.display());
    let outcome = clean(config)?;

    eprintln!("   Encoding: {}", outcome.encoding);
    eprintln!("   Rows read: {}", outcome.rows_read);
    eprintln!("   Year: {}", outcome.year);
    eprintln!("   Components: {}", outcome.components.join(", "));
    if !outcome.missing_components.is_empty() {
        eprintln!("   ⚠️  Missing: {}", outcome.missing_components.join(", "));
    }
    eprintln!("\n💾 {} months saved to: {}", outcome.cleaned.len(), outcome.output.display());
    Ok(())
}

fn cmd_summarize(config: &AnalysisConfig, json: Option<&Path>) -> PipelineResult<()> {
    let (_, text) = summarize_cleaned(config, json)?;
    println!("{}", text);
    Ok(())
}

fn cmd_plot(config: &AnalysisConfig) -> PipelineResult<()> {
    let paths = plot_cleaned(config)?;
    for path in paths {
        eprintln!("🖼️  {}", path.display());
    }
    Ok(())
}

fn cmd_run(config: &AnalysisConfig, json: Option<&Path>) -> PipelineResult<()> {
    cmd_clean(config)?;
    cmd_summarize(config, json)?;
    cmd_plot(config)?;
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_detect_year(config: &AnalysisConfig) -> PipelineResult<()> {
    println!("{}", detect_year(config)?);
    Ok(())
}
