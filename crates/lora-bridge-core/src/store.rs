//! LoRa payload store.
//!
//! The store keeps the last received packet. Each reception replaces the
//! previous one wholesale; nothing is merged.

use crate::model::{Payload, ReceivedPacket};

/// Trait for payload storage implementations.
pub trait PayloadStore: Send + Sync {
    /// Replace the stored packet with a newly received one.
    fn apply_packet(&mut self, packet: ReceivedPacket);

    /// The last received payload, or an empty object before the first reception.
    fn latest_payload(&self) -> &Payload;

    /// The last received packet, if any.
    fn latest_packet(&self) -> Option<&ReceivedPacket>;

    /// Number of packets applied since creation or the last `clear`.
    fn packet_count(&self) -> u64;

    /// Forget the stored packet.
    fn clear(&mut self);
}

/// In-memory store implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    latest: Option<ReceivedPacket>,
    /// Returned while nothing has been received
    empty: Payload,
    count: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PayloadStore for MemoryStore {
    fn apply_packet(&mut self, packet: ReceivedPacket) {
        self.latest = Some(packet);
        self.count += 1;
    }

    fn latest_payload(&self) -> &Payload {
        self.latest
            .as_ref()
            .map(|p| &p.payload)
            .unwrap_or(&self.empty)
    }

    fn latest_packet(&self) -> Option<&ReceivedPacket> {
        self.latest.as_ref()
    }

    fn packet_count(&self) -> u64 {
        self.count
    }

    fn clear(&mut self) {
        self.latest = None;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn packet(text: &str) -> ReceivedPacket {
        ReceivedPacket::from_raw(text.as_bytes().to_vec(), Some(-90), Some(7.5))
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryStore::new();

        assert!(store.latest_payload().is_empty());
        assert!(store.latest_packet().is_none());
        assert_eq!(store.packet_count(), 0);
        assert_eq!(serde_json::to_string(store.latest_payload()).unwrap(), "{}");
    }

    #[test]
    fn test_apply_packet() {
        let mut store = MemoryStore::new();

        store.apply_packet(packet(r#"{"temp":21.5,"hum":40}"#));

        assert_eq!(store.latest_payload()["temp"], json!(21.5));
        assert_eq!(store.latest_payload()["hum"], json!(40));
        assert_eq!(store.latest_packet().unwrap().rssi, Some(-90));
        assert_eq!(store.packet_count(), 1);
    }

    #[test]
    fn test_latest_packet_replaces_previous() {
        let mut store = MemoryStore::new();

        store.apply_packet(packet(r#"{"a":1,"b":2}"#));
        store.apply_packet(packet(r#"{"c":3}"#));

        // No merge: keys from the first payload are gone
        assert_eq!(
            serde_json::Value::Object(store.latest_payload().clone()),
            json!({"c": 3})
        );
        assert_eq!(store.packet_count(), 2);
    }

    #[test]
    fn test_clear() {
        let mut store = MemoryStore::new();
        store.apply_packet(packet(r#"{"a":1}"#));

        store.clear();

        assert!(store.latest_payload().is_empty());
        assert!(store.latest_packet().is_none());
        assert_eq!(store.packet_count(), 0);
    }
}
