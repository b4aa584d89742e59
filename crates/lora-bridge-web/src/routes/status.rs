//! Status route.
//!
//! ### `GET /status`
//! ```json
//! {
//!   "statistics": { "packetsReceived": 12, "packetRate": 0.0, "crcErrors": 1,
//!                   "dataRequests": 30, "uptime": 600 },
//!   "lastPacket": { "receivedAt": "2026-10-19T08:00:00.000Z", "length": 24,
//!                   "rssi": -92, "snr": 7.25 }
//! }
//! ```

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use lora_bridge_core::{PacketInfo, PayloadStore};

use crate::statistics::BridgeStatistics;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub statistics: BridgeStatistics,
    /// `null` before the first reception.
    pub last_packet: Option<PacketInfo>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let last_packet = state.store.read().await.latest_packet().map(|p| p.info());
    Json(StatusResponse {
        statistics: state.statistics.snapshot(),
        last_packet,
    })
}
