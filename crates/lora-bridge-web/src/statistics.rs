//! Bridge statistics collection.
//!
//! Counters are updated from the event processor and the HTTP handlers and
//! reported by `GET /status`:
//! - Packets received and packet rate (per second)
//! - Frames dropped on CRC errors
//! - RSSI and SNR of the last packet
//! - HTTP data requests served
//! - Uptime

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

/// Bridge performance statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatistics {
    /// Packets accepted since start.
    pub packets_received: u64,

    /// Packets per second over the last measurement window.
    pub packet_rate: f64,

    /// Frames dropped on payload CRC errors.
    pub crc_errors: u64,

    /// RSSI of the last packet in dBm.
    pub last_rssi: Option<i16>,

    /// SNR of the last packet in dB.
    pub last_snr: Option<f32>,

    /// `GET /get-lora-data` requests served.
    pub data_requests: u64,

    /// Uptime in seconds.
    pub uptime: u64,
}

/// Collects and tracks bridge statistics.
pub struct StatisticsCollector {
    start_time: Instant,
    packets_received: AtomicU64,
    /// Packets in the current measurement window.
    window_packets: AtomicU64,
    /// Last calculated packet rate, stored as f64 bits.
    packet_rate: AtomicU64,
    crc_errors: AtomicU64,
    /// `NO_RSSI` until a packet reports one.
    last_rssi: AtomicI32,
    /// f32 bits; NaN until a packet reports one.
    last_snr: AtomicU32,
    data_requests: AtomicU64,
}

const NO_RSSI: i32 = i32::MIN;

impl StatisticsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            packets_received: AtomicU64::new(0),
            window_packets: AtomicU64::new(0),
            packet_rate: AtomicU64::new(0),
            crc_errors: AtomicU64::new(0),
            last_rssi: AtomicI32::new(NO_RSSI),
            last_snr: AtomicU32::new(f32::NAN.to_bits()),
            data_requests: AtomicU64::new(0),
        }
    }

    /// Record an accepted packet and its signal quality.
    pub fn record_packet(&self, rssi: Option<i16>, snr: Option<f32>) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.window_packets.fetch_add(1, Ordering::Relaxed);
        self.last_rssi
            .store(rssi.map_or(NO_RSSI, i32::from), Ordering::Relaxed);
        self.last_snr
            .store(snr.unwrap_or(f32::NAN).to_bits(), Ordering::Relaxed);
    }

    pub fn record_crc_error(&self) {
        self.crc_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_data_request(&self) {
        self.data_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the packet rate calculation (call once per second).
    pub fn update_rate(&self) {
        let window = self.window_packets.swap(0, Ordering::Relaxed);
        self.packet_rate
            .store((window as f64).to_bits(), Ordering::Relaxed);
    }

    /// Get current statistics snapshot.
    pub fn snapshot(&self) -> BridgeStatistics {
        BridgeStatistics {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packet_rate: f64::from_bits(self.packet_rate.load(Ordering::Relaxed)),
            crc_errors: self.crc_errors.load(Ordering::Relaxed),
            last_rssi: match self.last_rssi.load(Ordering::Relaxed) {
                NO_RSSI => None,
                rssi => Some(rssi as i16),
            },
            last_snr: Some(f32::from_bits(self.last_snr.load(Ordering::Relaxed)))
                .filter(|snr| !snr.is_nan()),
            data_requests: self.data_requests.load(Ordering::Relaxed),
            uptime: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for StatisticsCollector {
    fn default() -> Self {
        Self::new()
    }
}
