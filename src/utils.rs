// utils.rs
use super::models::{AppState, ViewerSession};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

pub fn register_viewer(viewer_id: Uuid, state: &AppState) {
    state.viewers.insert(
        viewer_id,
        ViewerSession {
            connected_at: Utc::now(),
        },
    );
    metrics::gauge!("connected_viewers").set(state.viewers.len() as f64);
    info!("Viewer {} connected", viewer_id);
}

pub fn cleanup_viewer(viewer_id: Uuid, state: &AppState) {
    if let Some((_, session)) = state.viewers.remove(&viewer_id) {
        let connected_secs = (Utc::now() - session.connected_at).num_seconds();
        info!("Viewer {} disconnected after {}s", viewer_id, connected_secs);
    }
    metrics::gauge!("connected_viewers").set(state.viewers.len() as f64);
}
