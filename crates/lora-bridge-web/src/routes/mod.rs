//! HTTP route handlers for the LoRa bridge.
//!
//! - `GET /get-lora-data` - the last received payload
//! - `GET /status` - bridge statistics and last packet metadata

pub mod data;
pub mod status;

use crate::AppState;
use axum::{routing::get, Router};

/// Create the main Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/get-lora-data", get(data::get_lora_data))
        .route("/status", get(status::get_status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BridgeState;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use lora_bridge_core::{PayloadStore, ReceivedPacket};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Option<String>, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, content_type, json)
    }

    #[tokio::test]
    async fn test_data_is_empty_object_before_first_packet() {
        let state = Arc::new(BridgeState::new());

        let (status, content_type, json) = get_json(create_router(state), "/get-lora-data").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(json, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_data_echoes_last_payload() {
        let state = Arc::new(BridgeState::new());
        {
            let mut store = state.store.write().await;
            store.apply_packet(ReceivedPacket::from_raw(
                br#"{"sensor":"soil","moisture":0.42}"#.to_vec(),
                Some(-95),
                Some(6.25),
            ));
            store.apply_packet(ReceivedPacket::from_raw(
                br#"{"sensor":"air","temp":18}"#.to_vec(),
                Some(-91),
                Some(7.0),
            ));
        }

        let (status, _, json) = get_json(create_router(state.clone()), "/get-lora-data").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"sensor": "air", "temp": 18}));
        assert_eq!(state.statistics.snapshot().data_requests, 1);
    }

    #[tokio::test]
    async fn test_status_reports_last_packet() {
        let state = Arc::new(BridgeState::new());
        state
            .store
            .write()
            .await
            .apply_packet(ReceivedPacket::from_raw(b"ping".to_vec(), Some(-101), Some(-3.5)));
        state.statistics.record_packet(Some(-101), Some(-3.5));

        let (status, _, json) = get_json(create_router(state), "/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["statistics"]["packetsReceived"], 1);
        assert_eq!(json["statistics"]["lastRssi"], -101);
        assert_eq!(json["lastPacket"]["length"], 4);
        assert_eq!(json["lastPacket"]["rssi"], -101);
        assert_eq!(json["lastPacket"]["snr"], -3.5);
        assert!(json["lastPacket"]["receivedAt"].is_string());
    }

    #[tokio::test]
    async fn test_status_before_first_packet() {
        let state = Arc::new(BridgeState::new());

        let (status, _, json) = get_json(create_router(state), "/status").await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["lastPacket"].is_null());
        assert_eq!(json["statistics"]["packetsReceived"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let state = Arc::new(BridgeState::new());

        let (status, _, _) = get_json(create_router(state), "/nope").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let state = Arc::new(BridgeState::new());
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/get-lora-data")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
