use axum::extract::State;

use super::AppState;

/// Plain-text banner served at `/`.
pub async fn index_handler(State(state): State<AppState>) -> String {
    format!("welcome to {}", state.health.service_name())
}
