use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Entry point when running `cargo run -p web-server`: serves with the default
// configuration file and logs to stdout only.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = configuration::load_settings(None)?;
    web_server::run_server(&settings).await
}
