use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/riders: the rider pool with current availability.
pub async fn list_riders(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "riders": app.riders.list(),
    }))
}
