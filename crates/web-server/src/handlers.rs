use crate::encoding::gzip_base64;
use crate::{AppState, error::AppError};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use core_types::{InputMap, InstanceState};
use std::sync::Arc;

/// # GET /instances
pub async fn list_instances(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.list().await)
}

/// # GET /instanceState/:instance
pub async fn get_instance_state(
    Path(instance): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<InstanceState>, AppError> {
    let controller = state.registry.resolve(&instance).await?;
    Ok(Json(controller.handle().state()))
}

/// # GET /instanceChartData/:instance
/// The chart data as gzip-compressed JSON in base64.
pub async fn get_instance_chart_data(
    Path(instance): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let controller = state.registry.resolve(&instance).await?;
    let chart = controller.handle().chart();
    Ok(gzip_base64(&chart).await?)
}

/// # GET /getInstanceVersion/:instance
/// `"{stateVersion}:{chartVersion}"`.
pub async fn get_instance_version(
    Path(instance): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let controller = state.registry.resolve(&instance).await?;
    let (state_version, chart_version) = controller.handle().versions();
    Ok(format!("{state_version}:{chart_version}"))
}

/// # POST /updateInput/:instance/:button
/// Body: a JSON object of input overrides. Returns as soon as the command is
/// scheduled.
pub async fn update_input(
    Path((instance, button)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(), AppError> {
    let controller = state.registry.resolve(&instance).await?;
    let button: u32 = button
        .parse()
        .map_err(|_| AppError::InvalidButtonIndex(button.clone()))?;
    let input: InputMap = serde_json::from_slice(&body).map_err(AppError::InvalidBody)?;
    tracing::debug!(instance = %instance, button, keys = input.len(), "Input update received.");
    let ticket = state.dispatcher.dispatch(controller, button, input)?;
    tracing::debug!(command_id = %ticket.id, "Command dispatched.");
    Ok(())
}

/// # PUT /createInstance/:query
/// `query` is `kind:label`; answers with the full instance name.
pub async fn create_instance(
    Path(query): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let name = state.registry.create_from_query(&query).await?;
    Ok(name.into_string())
}

/// # DELETE /deleteInstance/:instance
pub async fn delete_instance(
    Path(instance): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<(), AppError> {
    state.registry.delete(&instance).await?;
    Ok(())
}
