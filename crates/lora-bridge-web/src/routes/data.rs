//! Payload route.
//!
//! ### `GET /get-lora-data`
//! Returns the last received payload as a JSON object, or `{}` before the
//! first reception.

use axum::{extract::State, response::Json};
use tracing::debug;

use lora_bridge_core::{Payload, PayloadStore};

use crate::AppState;

pub async fn get_lora_data(State(state): State<AppState>) -> Json<Payload> {
    state.statistics.record_data_request();
    let store = state.store.read().await;
    debug!("Serving payload from {} packets", store.packet_count());
    Json(store.latest_payload().clone())
}
