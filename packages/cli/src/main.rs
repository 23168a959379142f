// Command-line front end for the extraction pipeline.
//
// `finsight extract` runs (or reuses) an extraction for a report text
// file; `finsight query` answers a question from the cache without
// touching the oracle.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finsight::oracle::GroqOracle;
use finsight::{
    Document, ExtractionError, JsonFileStore, Metric, Pipeline, PipelineConfig, ReportPeriod,
};

#[derive(Parser)]
#[command(name = "finsight", about = "Financial-report metric extraction", version)]
struct Cli {
    /// Directory for the record and answer cache
    #[arg(long, global = true, default_value = ".finsight-cache")]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract metrics from a report text file (pages split on form feed)
    Extract {
        /// Path to the report text
        input: PathBuf,

        /// Pages per extraction chunk
        #[arg(long, default_value_t = 5)]
        chunk_size: usize,

        /// Fiscal period to scope extraction to, e.g. Q3FY25
        #[arg(long)]
        period: Option<String>,

        /// Groq model to use
        #[arg(long)]
        model: Option<String>,
    },

    /// Answer a question from an already-extracted report
    Query {
        /// Path to the report text (identifies the cached record)
        input: PathBuf,

        /// The question, e.g. "What is the EBITDA?"
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,finsight=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let store = JsonFileStore::open(&cli.cache_dir)
        .with_context(|| format!("failed to open cache at {}", cli.cache_dir.display()))?;

    match cli.command {
        Command::Extract {
            input,
            chunk_size,
            period,
            model,
        } => {
            let document = load_document(&input)?;
            tracing::info!(
                input = %input.display(),
                pages = document.page_count(),
                fingerprint = %document.fingerprint,
                "report ingested"
            );

            let mut config = PipelineConfig::default().with_chunk_size(chunk_size);
            if let Some(period) = &period {
                let period = ReportPeriod::parse(period)
                    .with_context(|| format!("unrecognized period '{period}'"))?;
                config = config.with_period(period);
            }

            let mut oracle = GroqOracle::from_env()?;
            if let Some(model) = model {
                oracle = oracle.with_model(model);
            }

            let pipeline = Pipeline::with_config(store, oracle, config);
            let record = pipeline.extract_document(&document).await?;

            println!("Document {}", record.fingerprint);
            if let Some(period) = record.period {
                println!("Period   {period}");
            }
            println!(
                "Chunks   {} ({} failed)",
                record.chunk_count,
                record.failed_chunks.len()
            );
            println!();
            for metric in Metric::ALL {
                match record.get(metric) {
                    Some(resolved) => println!(
                        "  {:<18} {} (chunk {})",
                        metric.label(),
                        resolved.value.raw,
                        resolved.provenance.chunk_index
                    ),
                    None => println!("  {:<18} not reported", metric.label()),
                }
            }
            if record.is_low_confidence() {
                println!("\nWarning: every chunk failed; the record is empty.");
            }
        }

        Command::Query { input, question } => {
            let document = load_document(&input)?;
            match finsight::resolve_answer(&store, &document.fingerprint, &question).await {
                Ok(answer) => println!("{answer}"),
                Err(ExtractionError::RecordNotFound { .. }) => {
                    anyhow::bail!(
                        "this report has not been extracted yet; run `finsight extract {}` first",
                        input.display()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

/// Read a report text file and split it into pages on form feeds. A
/// file with no form feeds is a single page.
fn load_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let pages: Vec<&str> = text.split('\u{0c}').collect();
    let document = Document::from_pages(pages)?;
    Ok(document.with_source(path.display().to_string()))
}
