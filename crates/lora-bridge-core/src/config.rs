//! Bridge configuration and its storage abstraction.
//!
//! The configuration is a small JSON document:
//!
//! ```json
//! {
//!   "http":  { "bindAddr": "0.0.0.0:5000", "cors": false },
//!   "radio": { "frequencyHz": 434000000, "bandwidth": "bw125", "codingRate": "4/5",
//!              "spreadingFactor": 7, "syncWord": 18, "preambleLength": 8,
//!              "crc": true, "lnaBoost": true, "pollIntervalMs": 50 },
//!   "board": { "spiBus": 0, "spiChipSelect": 0, "spiClockHz": 5000000,
//!              "dio0Pin": 22, "resetPin": null },
//!   "simulate": false
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults. Storage is
//! behind the `ConfigStorage` trait so the binary reads a file while tests
//! keep everything in memory.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration was not found.
    #[error("Configuration not found: {0}")]
    NotFound(String),
    /// Failed to read configuration.
    #[error("Read error: {0}")]
    ReadError(String),
    /// Failed to write configuration.
    #[error("Write error: {0}")]
    WriteError(String),
    /// Configuration data is invalid.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Abstract configuration storage.
pub trait ConfigStorage: Send + Sync {
    /// Load the bridge configuration.
    fn load_config(&self) -> Result<BridgeConfig, ConfigError>;

    /// Save the bridge configuration.
    fn save_config(&self, config: &BridgeConfig) -> Result<(), ConfigError>;

    /// Load the configuration, writing and returning the defaults when none
    /// has been stored yet. The result is validated either way.
    fn load_or_init(&self) -> Result<BridgeConfig, ConfigError> {
        let config = match self.load_config() {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => {
                let config = BridgeConfig::default();
                self.save_config(&config)?;
                config
            }
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    pub http: HttpSettings,
    pub radio: RadioSettings,
    pub board: BoardSettings,
    /// Generate synthetic packets instead of driving the radio.
    pub simulate: bool,
}

impl BridgeConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let radio = &self.radio;
        if !(7..=12).contains(&radio.spreading_factor) {
            return Err(ConfigError::InvalidData(format!(
                "spreadingFactor must be within 7..=12, got {}",
                radio.spreading_factor
            )));
        }
        if !(137_000_000..=1_020_000_000).contains(&radio.frequency_hz) {
            return Err(ConfigError::InvalidData(format!(
                "frequencyHz must be within 137..=1020 MHz, got {}",
                radio.frequency_hz
            )));
        }
        if radio.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidData(
                "pollIntervalMs must be non-zero".to_string(),
            ));
        }
        if self.board.spi_clock_hz == 0 || self.board.spi_clock_hz > 10_000_000 {
            return Err(ConfigError::InvalidData(format!(
                "spiClockHz must be within 1..=10000000, got {}",
                self.board.spi_clock_hz
            )));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpSettings {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Send permissive CORS headers.
    pub cors: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            cors: false,
        }
    }
}

/// LoRa modem settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadioSettings {
    /// Carrier frequency in Hz.
    pub frequency_hz: u32,
    pub bandwidth: Bandwidth,
    pub coding_rate: CodingRate,
    /// Spreading factor, 7..=12.
    pub spreading_factor: u8,
    pub sync_word: u8,
    pub preamble_length: u16,
    /// Require a valid payload CRC.
    pub crc: bool,
    /// LNA boost on the HF port.
    pub lna_boost: bool,
    /// Upper bound on how long the receive loop waits between IRQ checks.
    pub poll_interval_ms: u64,
}

impl RadioSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            frequency_hz: 434_000_000,
            bandwidth: Bandwidth::Bw125,
            coding_rate: CodingRate::Cr4_5,
            spreading_factor: 7,
            sync_word: 0x12,
            preamble_length: 8,
            crc: true,
            lna_boost: true,
            poll_interval_ms: 50,
        }
    }
}

/// Signal bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bandwidth {
    #[serde(rename = "bw7_8")]
    Bw7_8,
    #[serde(rename = "bw10_4")]
    Bw10_4,
    #[serde(rename = "bw15_6")]
    Bw15_6,
    #[serde(rename = "bw20_8")]
    Bw20_8,
    #[serde(rename = "bw31_25")]
    Bw31_25,
    #[serde(rename = "bw41_7")]
    Bw41_7,
    #[serde(rename = "bw62_5")]
    Bw62_5,
    Bw125,
    Bw250,
    Bw500,
}

impl Bandwidth {
    /// Bandwidth in Hz.
    pub fn hz(self) -> u32 {
        match self {
            Bandwidth::Bw7_8 => 7_800,
            Bandwidth::Bw10_4 => 10_400,
            Bandwidth::Bw15_6 => 15_600,
            Bandwidth::Bw20_8 => 20_800,
            Bandwidth::Bw31_25 => 31_250,
            Bandwidth::Bw41_7 => 41_700,
            Bandwidth::Bw62_5 => 62_500,
            Bandwidth::Bw125 => 125_000,
            Bandwidth::Bw250 => 250_000,
            Bandwidth::Bw500 => 500_000,
        }
    }
}

/// Forward error correction coding rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodingRate {
    #[serde(rename = "4/5")]
    Cr4_5,
    #[serde(rename = "4/6")]
    Cr4_6,
    #[serde(rename = "4/7")]
    Cr4_7,
    #[serde(rename = "4/8")]
    Cr4_8,
}

/// Raspberry Pi wiring of the transceiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardSettings {
    /// SPI bus number (`/dev/spidev<bus>.<cs>`).
    pub spi_bus: u8,
    pub spi_chip_select: u8,
    pub spi_clock_hz: u32,
    /// BCM pin wired to DIO0. Without it the receive loop polls.
    pub dio0_pin: Option<u8>,
    /// BCM pin wired to the reset line.
    pub reset_pin: Option<u8>,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_chip_select: 0,
            spi_clock_hz: 5_000_000,
            dio0_pin: Some(22),
            reset_pin: None,
        }
    }
}

// ============================================================================
// File storage (Linux)
// ============================================================================

/// Configuration stored as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct FileConfigStorage {
    path: PathBuf,
}

impl FileConfigStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStorage for FileConfigStorage {
    fn load_config(&self) -> Result<BridgeConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.display().to_string()))
            }
            Err(e) => {
                return Err(ConfigError::ReadError(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&text).map_err(|e| {
            ConfigError::InvalidData(format!("{}: {}", self.path.display(), e))
        })
    }

    fn save_config(&self, config: &BridgeConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| ConfigError::WriteError(format!("{}: {}", self.path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::RwLock;

    /// In-memory storage for testing.
    struct MemoryConfigStorage {
        data: RwLock<Option<String>>,
    }

    impl MemoryConfigStorage {
        fn new() -> Self {
            Self {
                data: RwLock::new(None),
            }
        }

        fn with_json(json: &str) -> Self {
            Self {
                data: RwLock::new(Some(json.to_string())),
            }
        }
    }

    impl ConfigStorage for MemoryConfigStorage {
        fn load_config(&self) -> Result<BridgeConfig, ConfigError> {
            let data = self.data.read().unwrap();
            let json = data
                .as_ref()
                .ok_or_else(|| ConfigError::NotFound("memory".to_string()))?;
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidData(e.to_string()))
        }

        fn save_config(&self, config: &BridgeConfig) -> Result<(), ConfigError> {
            let json =
                serde_json::to_string(config).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            *self.data.write().unwrap() = Some(json);
            Ok(())
        }
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();

        assert_eq!(config.http.bind_addr.to_string(), "0.0.0.0:5000");
        assert_eq!(config.radio.frequency_hz, 434_000_000);
        assert_eq!(config.radio.bandwidth, Bandwidth::Bw125);
        assert_eq!(config.radio.coding_rate, CodingRate::Cr4_5);
        assert_eq!(config.radio.spreading_factor, 7);
        assert_eq!(config.radio.sync_word, 0x12);
        assert_eq!(config.board.dio0_pin, Some(22));
        assert!(!config.simulate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_init_writes_defaults() {
        let storage = MemoryConfigStorage::new();

        let config = storage.load_or_init().unwrap();
        assert_eq!(config, BridgeConfig::default());

        // Defaults are now stored
        assert_eq!(storage.load_config().unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let storage = MemoryConfigStorage::with_json(
            r#"{ "http": { "bindAddr": "127.0.0.1:8080" },
                 "radio": { "spreadingFactor": 10, "bandwidth": "bw62_5", "codingRate": "4/8" },
                 "simulate": true }"#,
        );

        let config = storage.load_or_init().unwrap();

        assert_eq!(config.http.bind_addr.to_string(), "127.0.0.1:8080");
        assert!(!config.http.cors);
        assert_eq!(config.radio.spreading_factor, 10);
        assert_eq!(config.radio.bandwidth, Bandwidth::Bw62_5);
        assert_eq!(config.radio.coding_rate, CodingRate::Cr4_8);
        assert_eq!(config.radio.preamble_length, 8);
        assert_eq!(config.board, BoardSettings::default());
        assert!(config.simulate);
    }

    #[test]
    fn test_invalid_spreading_factor_rejected() {
        let storage = MemoryConfigStorage::with_json(r#"{ "radio": { "spreadingFactor": 13 } }"#);

        match storage.load_or_init() {
            Err(ConfigError::InvalidData(msg)) => assert!(msg.contains("spreadingFactor")),
            other => panic!("expected InvalidData, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = BridgeConfig::default();
        config.radio.frequency_hz = 2_400_000_000;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.radio.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.board.spi_clock_hz = 20_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let storage = MemoryConfigStorage::with_json("{ not json");
        assert!(matches!(
            storage.load_config(),
            Err(ConfigError::InvalidData(_))
        ));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "lora-bridge-config-test-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let storage = FileConfigStorage::new(&path);

        assert!(matches!(
            storage.load_config(),
            Err(ConfigError::NotFound(_))
        ));

        let config = storage.load_or_init().unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(path.exists());
        assert_eq!(storage.load_config().unwrap(), config);

        std::fs::remove_file(&path).unwrap();
    }
}
