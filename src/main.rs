use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use comment_sentiment::batch::ProgressFn;
use comment_sentiment::{
    server, AnalyzerConfig, Backend, Dataset, LabelDistribution, SentimentAnalyzer,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "comment-sentiment", version)]
#[command(about = "Label comment sentiment (-1/0/1) with lexicon signals fused with a model")]
struct Cli {
    /// More logging (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Label every unlabeled row of a CSV file
    Label {
        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Score one comment and print the evidence as JSON
    Score {
        comment: String,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Print the label distribution of an already labeled CSV
    Stats {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, env = "SENTIMENT_LABEL_COLUMN", default_value = comment_sentiment::config::DEFAULT_LABEL_COLUMN)]
        label_column: String,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "SENTIMENT_BIND", default_value = "0.0.0.0:3000")]
        bind: String,

        #[command(flatten)]
        backend: BackendArgs,
    },
}

/// Overrides on top of the environment configuration.
#[derive(Args, Debug, Clone)]
struct BackendArgs {
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Model name (classifier id or Gemini model)
    #[arg(long)]
    model: Option<String>,

    /// Gemini API key
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of the sequence-classification endpoint
    #[arg(long)]
    inference_url: Option<String>,

    /// Comments per chunk (8-64)
    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    text_column: Option<String>,

    #[arg(long)]
    label_column: Option<String>,
}

impl BackendArgs {
    fn into_config(self) -> anyhow::Result<AnalyzerConfig> {
        let mut config = AnalyzerConfig::from_env()?;
        if let Some(backend) = self.backend {
            if backend != config.backend {
                // Env model names belong to the env backend.
                config.model_name = None;
            }
            config.backend = backend;
        }
        if let Some(model) = self.model {
            config.model_name = Some(model);
        }
        if let Some(key) = self.api_key {
            config.api_key = Some(key);
        }
        if let Some(url) = self.inference_url {
            config.inference_url = url;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(column) = self.text_column {
            config.text_column = column;
        }
        if let Some(column) = self.label_column {
            config.label_column = column;
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Label { input, output, backend } => label(input, output, backend.into_config()?),
        Command::Score { comment, backend } => {
            let analyzer = SentimentAnalyzer::new(backend.into_config()?)?;
            let explanation = analyzer.explain(Some(&comment));
            println!("{}", serde_json::to_string_pretty(&explanation)?);
            Ok(())
        }
        Command::Stats { input, label_column } => {
            let dataset = Dataset::from_path(&input).with_context(|| format!("failed to read {}", input.display()))?;
            println!("{}", LabelDistribution::from_dataset(&dataset, &label_column));
            Ok(())
        }
        Command::Serve { bind, backend } => {
            let config = backend.into_config()?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(server::serve(config, &bind))
        }
    }
}

fn label(input: PathBuf, output: Option<PathBuf>, config: AnalyzerConfig) -> anyhow::Result<()> {
    let analyzer = SentimentAnalyzer::new(config)?;
    info!("Processing {}", input.display());

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] chunk {pos}/{len} ({elapsed})")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    let mut on_progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };

    let progress: ProgressFn<'_> = &mut on_progress;
    let summary = analyzer
        .process_file(&input, output.as_deref(), Some(progress))
        .with_context(|| format!("failed to label {}", input.display()))?;
    bar.finish_and_clear();

    println!("Scored {} rows ({} already labeled)", summary.scored, summary.skipped);
    println!("{}", summary.distribution);
    Ok(())
}
