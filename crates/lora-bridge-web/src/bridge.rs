//! Bridge event processing.
//!
//! Producers (the radio thread, the demo generator) never touch the store.
//! They send `BridgeEvent`s over a channel and a single processor task
//! applies them, so the store has exactly one writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use lora_bridge_core::{PayloadStore, ReceivedPacket};

use crate::{AppState, BridgeState};

/// Events produced by packet sources.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// A frame was received and decoded.
    PacketReceived(ReceivedPacket),
    /// A frame was dropped on a payload CRC error.
    CrcError,
}

/// The bridge event processor.
pub struct LoraBridge {
    state: AppState,
    event_tx: mpsc::Sender<BridgeEvent>,
    event_rx: mpsc::Receiver<BridgeEvent>,
}

impl LoraBridge {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel(1024);
        Self {
            state: Arc::new(BridgeState::new()),
            event_tx,
            event_rx,
        }
    }

    /// Get a sender for submitting events to the bridge.
    pub fn event_sender(&self) -> mpsc::Sender<BridgeEvent> {
        self.event_tx.clone()
    }

    /// Shared state, for the HTTP router.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Process events until every sender is dropped.
    pub async fn run(self) {
        let LoraBridge {
            state,
            event_tx,
            mut event_rx,
        } = self;
        // Only external senders keep the loop alive
        drop(event_tx);

        let mut rate_tick = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => apply_event(&state, event).await,
                        None => {
                            info!("All packet sources closed, bridge stopping");
                            break;
                        }
                    }
                }
                _ = rate_tick.tick() => {
                    state.statistics.update_rate();
                }
            }
        }
    }
}

impl Default for LoraBridge {
    fn default() -> Self {
        Self::new()
    }
}

async fn apply_event(state: &BridgeState, event: BridgeEvent) {
    match event {
        BridgeEvent::PacketReceived(packet) => {
            debug!("Storing {} byte packet received at {}", packet.len(), packet.received_at);
            state.statistics.record_packet(packet.rssi, packet.snr);
            state.store.write().await.apply_packet(packet);
        }
        BridgeEvent::CrcError => {
            state.statistics.record_crc_error();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_for_packets(state: &AppState, count: u64) {
        for _ in 0..500 {
            if state.store.read().await.packet_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("bridge never stored {} packets", count);
    }

    #[tokio::test]
    async fn test_packet_event_updates_store() {
        let bridge = LoraBridge::new();
        let tx = bridge.event_sender();
        let state = bridge.state();
        let handle = tokio::spawn(bridge.run());

        let packet = ReceivedPacket::from_raw(br#"{"id":7}"#.to_vec(), Some(-80), Some(5.0));
        tx.send(BridgeEvent::PacketReceived(packet)).await.unwrap();
        wait_for_packets(&state, 1).await;

        assert_eq!(state.store.read().await.latest_payload()["id"], 7);
        let stats = state.statistics.snapshot();
        assert_eq!(stats.packets_received, 1);
        assert_eq!(stats.last_rssi, Some(-80));
        assert_eq!(stats.last_snr, Some(5.0));

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_crc_error_event_is_counted() {
        let bridge = LoraBridge::new();
        let tx = bridge.event_sender();
        let state = bridge.state();
        let handle = tokio::spawn(bridge.run());

        tx.send(BridgeEvent::CrcError).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(state.statistics.snapshot().crc_errors, 1);
        assert!(state.store.read().await.latest_payload().is_empty());
    }

    #[tokio::test]
    async fn test_run_ends_when_senders_drop() {
        let bridge = LoraBridge::new();
        let handle = tokio::spawn(bridge.run());

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("bridge should stop without senders")
            .unwrap();
    }
}
