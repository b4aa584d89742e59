//! LoRa bridge data model types.
//!
//! A received radio frame is kept twice: as the raw bytes read from the
//! transceiver FIFO and as the decoded JSON object served over HTTP.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decode::decode_payload;

/// A decoded payload: arbitrary key/value pairs.
pub type Payload = Map<String, Value>;

/// A single frame received by the radio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedPacket {
    /// The decoded payload
    pub payload: Payload,

    /// Bytes as read from the FIFO
    pub raw: Vec<u8>,

    /// Packet RSSI in dBm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,

    /// Packet SNR in dB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snr: Option<f32>,

    /// ISO 8601 timestamp (UTC)
    pub received_at: String,
}

impl ReceivedPacket {
    /// Build a packet from raw FIFO bytes, decoding the payload and
    /// stamping it with the current time.
    pub fn from_raw(raw: Vec<u8>, rssi: Option<i16>, snr: Option<f32>) -> Self {
        Self {
            payload: decode_payload(&raw),
            raw,
            rssi,
            snr,
            received_at: now_timestamp(),
        }
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The payload as compact JSON text.
    pub fn payload_json(&self) -> String {
        serde_json::to_string(&self.payload).unwrap_or_else(|_| "{}".to_string())
    }

    /// Metadata describing this packet, without the payload itself.
    pub fn info(&self) -> PacketInfo {
        PacketInfo {
            received_at: self.received_at.clone(),
            length: self.raw.len(),
            rssi: self.rssi,
            snr: self.snr,
        }
    }
}

/// Metadata of the last received packet, as reported by `/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketInfo {
    pub received_at: String,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snr: Option<f32>,
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_decodes_payload() {
        let packet = ReceivedPacket::from_raw(br#"{"temp":21.5}"#.to_vec(), Some(-87), Some(9.25));

        assert_eq!(packet.payload["temp"], serde_json::json!(21.5));
        assert_eq!(packet.len(), 13);
        assert_eq!(packet.rssi, Some(-87));
        assert!(packet.received_at.ends_with('Z'));
    }

    #[test]
    fn test_info_omits_payload() {
        let packet = ReceivedPacket::from_raw(b"hello".to_vec(), Some(-100), None);
        let info = serde_json::to_value(packet.info()).unwrap();

        assert_eq!(info["length"], 5);
        assert_eq!(info["rssi"], -100);
        assert!(info.get("snr").is_none());
        assert!(info.get("payload").is_none());
        assert!(info["receivedAt"].is_string());
    }
}
