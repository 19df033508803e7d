//! The HTTP surface of the instance server.
//!
//! Every route resolves instances through the [`InstanceRegistry`] and hands
//! commands to the [`CommandDispatcher`]; nothing here waits for a command to
//! finish. Failures of any kind are answered with a 500 (see [`error::AppError`]).

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use configuration::Settings;
use instances::{CommandDispatcher, InstanceRegistry};
use persistence::JsonFileStore;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod encoding;
pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub registry: InstanceRegistry,
    pub dispatcher: CommandDispatcher,
}

/// Builds the application routes on top of `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/instances", get(handlers::list_instances))
        .route("/instanceState/:instance", get(handlers::get_instance_state))
        .route("/instanceChartData/:instance", get(handlers::get_instance_chart_data))
        .route("/getInstanceVersion/:instance", get(handlers::get_instance_version))
        .route("/updateInput/:instance/:button", post(handlers::update_input))
        .route("/createInstance/:query", put(handlers::create_instance))
        .route("/deleteInstance/:instance", delete(handlers::delete_instance))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Opens the store under `storage.data_dir` and serves until Ctrl+C. Resident
/// instances are flushed to disk on the way out.
pub async fn run_server(settings: &Settings) -> anyhow::Result<()> {
    let addr = settings.listen_addr()?;
    let store = Arc::new(JsonFileStore::open(&settings.storage.data_dir).await?);
    let registry = InstanceRegistry::open(store).await?;
    tracing::info!(data_dir = %settings.storage.data_dir.display(), "Serving instances.");

    let state = Arc::new(AppState {
        registry,
        dispatcher: CommandDispatcher::new(),
    });
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let pending = state.dispatcher.in_flight();
    if pending > 0 {
        tracing::warn!(pending, "Shutting down with commands still running.");
    }
    let flushed = state.registry.flush_all().await?;
    tracing::info!(flushed, "Resident instances flushed. Bye.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal.");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received.");
}
