use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{AppState, WORKER_VERSION};

pub async fn get_root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "model": state.model.name,
        "worker_version": WORKER_VERSION,
    }))
}
