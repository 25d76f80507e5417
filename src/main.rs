//! bias-probe CLI - demographic-substitution prompt batches against chat-completion LLMs.

use anyhow::{Context, Result};
use bias_probe::models::{Config, RunOutput};
use bias_probe::{BatchDriver, ChatClient, ResultWriter, RetryPolicy, read_run_output, write_reports};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "bias-probe")]
#[command(version)]
#[command(about = "Query an LLM with demographic variants of question-bank prompts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when config.toml is absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Query every question table and write the result document
    Run {
        /// Directory containing the question CSV files
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Directory the result document is written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Responses to request per manufactured prompt
        #[arg(short, long)]
        responses: Option<usize>,

        /// Model ID sent to the API
        #[arg(short, long)]
        model: Option<String>,

        /// Tag written as the `LLM` field (defaults to --model when that is given)
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Render a result document as text and PDF
    Report {
        /// Result document to read
        #[arg(short, long)]
        input: PathBuf,

        /// Text output path
        #[arg(long)]
        text: Option<PathBuf>,

        /// PDF output path
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Validate configuration file and credentials
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}"))?,
        None => Config::from_file_or_default(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("Failed to load config from {DEFAULT_CONFIG:?}"))?,
    };
    Ok(config)
}

fn print_example_config() {
    let example = r#"# bias-probe configuration file

[api]
# API key (can also use OPENAI_API_KEY env var or a .env file)
# api_key = "${OPENAI_API_KEY}"
base_url = "https://api.openai.com/v1"
timeout_secs = 120
max_retries = 3
retry_delay_secs = 2

[model]
id = "gpt-4"
label = "Chat GPT 4"
temperature = 0.7
max_tokens = 100

[batch]
input_dir = "prompts"
groups = [
    "white male", "white female", "black male", "black female",
    "asian male", "asian female", "hispanic male", "hispanic female",
]
responses_per_prompt = 1
label_prefix = "Nick LLM Prompts - "

[output]
# dir = "prompts/results"
filename = "chatGPT_responses.json"

[report]
max_idx = 15
break_width = 60
chars_per_line = 90
text_path = "output.txt"
pdf_path = "output.pdf"
"#;
    println!("{example}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate => {
            let config = load_config(cli.config.as_deref())?;
            config.validate().context("Invalid configuration")?;
            config
                .resolve_api_key()
                .context("Failed to resolve API key")?;

            info!("Configuration is valid");
            info!("  Model: {} ({})", config.model.id, config.model.label);
            info!(
                "  Groups: {}, responses per prompt: {}",
                config.batch.groups.len(),
                config.batch.responses_per_prompt
            );
            info!(
                "  Retries: {} attempts, {}s apart",
                config.api.max_retries, config.api.retry_delay_secs
            );
            return Ok(());
        }

        Commands::Run {
            input_dir,
            output_dir,
            responses,
            model,
            label,
        } => {
            let mut config = load_config(cli.config.as_deref())?;

            // CLI overrides
            if let Some(dir) = input_dir {
                config.batch.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output.dir = Some(dir);
            }
            if let Some(n) = responses {
                config.batch.responses_per_prompt = n;
            }
            config.override_model(model, label);

            config.validate().context("Invalid configuration")?;
            let api_key = config
                .resolve_api_key()
                .context("Failed to resolve API key")?;

            let client = Arc::new(ChatClient::from_config(&config, api_key)?);
            let policy = RetryPolicy::new(config.api.max_retries, config.api.retry_delay());

            let driver = BatchDriver::new(config.batch.clone(), client, policy).with_progress(true);
            let batch = driver.run().await?;

            let output = RunOutput {
                llm: config.model.label.clone(),
                results: batch.records,
            };
            let writer = ResultWriter::new(config.output_dir(), config.output.filename.clone());
            let path = writer.write(&output)?;

            let stats = batch.stats;
            println!("\n=== Batch Complete ===");
            println!("Files:       {}", stats.files_processed);
            println!("Skipped:     {}", stats.files_skipped);
            println!("Records:     {}", stats.total_records);
            println!("Queries:     {}", stats.total_queries);
            println!("Failed:      {}", stats.failed_queries);
            println!("Success:     {:.1}%", stats.success_rate() * 100.0);
            println!("Runtime:     {:.1}s", stats.runtime_secs);
            println!("Output:      {path:?}");
        }

        Commands::Report { input, text, pdf } => {
            let config = load_config(cli.config.as_deref())?;
            let output = read_run_output(&input)
                .with_context(|| format!("Failed to read results from {input:?}"))?;

            let text_path = text.unwrap_or_else(|| config.report.text_path.clone());
            let pdf_path = pdf.unwrap_or_else(|| config.report.pdf_path.clone());
            let pages = write_reports(&output, &config.report, &text_path, &pdf_path)?;

            println!("Saved {text_path:?} and {pdf_path:?} ({pages} pages).");
        }
    }

    Ok(())
}
