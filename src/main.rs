//! thoughtgraph-sort — sort a list of 32 digits with a graph of LM operations
//!
//! Usage:
//!   thoughtgraph-sort                          → graph-of-thoughts, config.json, model "chatgpt"
//!   thoughtgraph-sort --method tot             → tree-of-thoughts instead
//!   thoughtgraph-sort --config ~/keys.json     → another model config file
//!
//! The executed graph is written to output_got.json.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use thoughtgraph::{CONFIG_ENV, DEFAULT_CONFIG_PATH, DEFAULT_MODEL, OUTPUT_PATH};
use thoughtgraph_llm::{CancellationToken, ChatGpt};
use thoughtgraph_sorting::Method;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "thoughtgraph-sort",
    about = "Sort a list of numbers with a graph of language model operations",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Model config file (JSON keyed by model name)
    #[arg(long, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Model entry to use from the config file
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Prompting method: io, cot, tot or got
    #[arg(long, default_value_t = Method::Got)]
    method: Method,

    /// Write logs to a file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    // 3. Language model
    let lm = ChatGpt::from_config_file(&cli.config, &cli.model)?;
    info!(model = %cli.model, config = %cli.config.display(), "model ready");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling run");
            on_signal.cancel();
        }
    });

    let summary = thoughtgraph::sort(Arc::new(lm), cli.method, OUTPUT_PATH, cancel).await?;
    info!(%summary, output = OUTPUT_PATH, "done");
    Ok(())
}

/// Stderr logging, plus a file when requested. The returned guard flushes the
/// file writer on drop.
fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "thoughtgraph=info".into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let Some(path) = log_file else {
        registry.init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("--log-file has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}
