use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{ConfigArgs, LoggingSettings};
use core_types::InstanceName;
use instances::InstanceRegistry;
use persistence::JsonFileStore;
use std::sync::{Arc, OnceLock};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// The main entry point for the tradelab instance server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; settings fall back to the config file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = cli.config.load().context("failed to load settings")?;
    init_tracing(&settings.logging)?;

    match cli.command {
        Commands::Serve => web_server::run_server(&settings).await?,
        Commands::List => {
            let registry = open_registry(&settings.storage.data_dir).await?;
            print_instances(&registry).await;
        }
        Commands::Create { query } => {
            let registry = open_registry(&settings.storage.data_dir).await?;
            let name = registry.create_from_query(&query).await?;
            println!("Created {name}");
        }
        Commands::Delete { name } => {
            let registry = open_registry(&settings.storage.data_dir).await?;
            registry.delete(&name).await?;
            println!("Deleted {name}");
        }
    }
    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Serves backtest, live and training instances to the desktop client.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server until Ctrl+C.
    Serve,
    /// Print every instance with its kind and version counters.
    List,
    /// Create an instance from a `kind:label` query (e.g. "backtest:eth1").
    Create { query: String },
    /// Delete an instance by its full name (e.g. "[backtest]eth1").
    Delete { name: String },
}

// ==============================================================================
// Helpers
// ==============================================================================

async fn open_registry(data_dir: &std::path::Path) -> anyhow::Result<InstanceRegistry> {
    let store = JsonFileStore::open(data_dir)
        .await
        .with_context(|| format!("failed to open the data directory {}", data_dir.display()))?;
    Ok(InstanceRegistry::open(Arc::new(store)).await?)
}

async fn print_instances(registry: &InstanceRegistry) {
    let mut table = Table::new();
    table.set_header(vec!["Instance", "Kind", "State version", "Chart version"]);
    for name in registry.list().await {
        let kind = InstanceName::kind_of(&name)
            .map(|k| k.to_string())
            .unwrap_or_else(|| "?".to_string());
        let (state_version, chart_version) = match registry.store().load_instance(&name).await {
            Ok((state, _)) => (state.state_version.to_string(), state.chart_version.to_string()),
            Err(e) => {
                tracing::warn!(instance = %name, error = %e, "Could not read instance documents.");
                ("-".to_string(), "-".to_string())
            }
        };
        table.add_row(vec![name, kind, state_version, chart_version]);
    }
    println!("{table}");
}

/// Logs to stdout, plus a daily rolling file when `logging.directory` is set.
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingSettings) -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::try_new(&filter)?);

    let file_layer = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(EnvFilter::try_new(&filter)?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}
