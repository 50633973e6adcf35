// handlers.rs

use crate::{
    commands,
    error::AppError,
    events,
    models::{AppState, BatchToggleRequest, BatchToggleResult, Device, ListDevicesQuery, ServerEvent},
    utils,
};
use axum::{
    Json,
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/devices",
    params(ListDevicesQuery),
    responses(
        (status = 200, description = "Devices in registry order", body = [Device])
    )
)]
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDevicesQuery>,
) -> Json<Vec<Device>> {
    let devices = match query.device_type {
        Some(device_type) => state.registry.list_by_type(device_type).await,
        None => state.registry.list_all().await,
    };
    Json(devices)
}

#[utoipa::path(
    get,
    path = "/api/devices/{id}",
    params(("id" = u32, Path, description = "Device identifier")),
    responses(
        (status = 200, description = "Device found", body = Device),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Device>, AppError> {
    let device = state
        .registry
        .get(id)
        .await
        .ok_or(AppError::DeviceNotFound(id))?;
    Ok(Json(device))
}

#[utoipa::path(
    post,
    path = "/api/devices/{id}/toggle",
    params(("id" = u32, Path, description = "Device identifier")),
    responses(
        (status = 200, description = "Post-toggle device record", body = Device),
        (status = 404, description = "Device not found")
    )
)]
pub async fn toggle_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Result<Json<Device>, AppError> {
    let device = commands::toggle_device(&state.registry, id)
        .await
        .ok_or(AppError::DeviceNotFound(id))?;

    metrics::counter!("device_toggles_total").increment(1);
    info!(id, is_on = device.is_on, "device toggled");

    // Broadcast after the mutation is confirmed; the response never waits on
    // subscriber delivery.
    events::announce(&state.broadcaster, std::slice::from_ref(&device)).await;

    Ok(Json(device))
}

#[utoipa::path(
    post,
    path = "/api/devices/batch-toggle",
    request_body = BatchToggleRequest,
    responses(
        (status = 200, description = "Batch accounting, including the zero-candidate case", body = BatchToggleResult)
    )
)]
pub async fn batch_toggle(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchToggleRequest>,
) -> Json<BatchToggleResult> {
    let applied = commands::batch_set(&state.registry, request.device_type, request.state).await;

    metrics::counter!("batch_mutations_total").increment(1);
    info!(
        device_type = %request.device_type,
        state = request.state,
        affected = applied.outcome.devices_affected,
        total = applied.outcome.total_devices,
        "batch toggle applied"
    );

    // One event per device that actually changed; failed items stay silent.
    events::announce(&state.broadcaster, &applied.changed).await;

    Json(applied.outcome)
}

pub async fn handle_viewer_ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("Viewer connection attempt");
    ws.on_upgrade(|socket| handle_viewer(socket, state))
}

async fn handle_viewer(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let viewer_id = Uuid::new_v4();

    // Subscribe before the snapshot so no change between the two is missed.
    let mut rx = state.broadcaster.subscribe();
    utils::register_viewer(viewer_id, &state);

    let snapshot = ServerEvent::device_list(state.registry.list_all().await);
    if sender
        .send(Message::Text(
            serde_json::to_string(&snapshot).unwrap().into(),
        ))
        .await
        .is_err()
    {
        utils::cleanup_viewer(viewer_id, &state);
        return;
    }

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if sender
                        .send(Message::Text(
                            serde_json::to_string(&event).unwrap().into(),
                        ))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%viewer_id, skipped, "viewer lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::pin!(send_task, recv_task);

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    };

    utils::cleanup_viewer(viewer_id, &state);
}
