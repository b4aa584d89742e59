//! # lora-bridge-web
//!
//! HTTP API and event processing for the LoRa bridge.
//!
//! This crate provides:
//! - `LoraBridge`, the event processor that applies received packets to the store
//! - `spawn_receiver`, which runs the blocking SX127x receive loop on its own thread
//! - REST endpoints serving the last payload and bridge status
//! - Statistics collection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lora_bridge_web::{create_router, LoraBridge};
//!
//! let bridge = LoraBridge::new();
//! let event_tx = bridge.event_sender();
//! let app = create_router(bridge.state());
//! tokio::spawn(bridge.run());
//!
//! let listener = TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod bridge;
pub mod receiver;
pub mod routes;
pub mod statistics;

// Re-exports
pub use bridge::{BridgeEvent, LoraBridge};
pub use receiver::spawn_receiver;
pub use routes::create_router;

use std::sync::Arc;
use tokio::sync::RwLock;

use lora_bridge_core::MemoryStore;
use statistics::StatisticsCollector;

/// Shared state for the event processor and all route handlers.
pub struct BridgeState {
    /// Last received packet.
    pub store: RwLock<MemoryStore>,

    pub statistics: StatisticsCollector,
}

impl BridgeState {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(MemoryStore::new()),
            statistics: StatisticsCollector::new(),
        }
    }
}

impl Default for BridgeState {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for shared state in Axum handlers.
pub type AppState = Arc<BridgeState>;
