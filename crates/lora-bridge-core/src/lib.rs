//! # lora-bridge-core
//!
//! Core data model and store for the LoRa to HTTP bridge.
//!
//! This crate provides:
//! - Data model types (`Payload`, `ReceivedPacket`)
//! - Decoding of raw radio frames into JSON payloads
//! - In-memory store holding the last received packet
//! - Bridge configuration and its storage abstraction
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! so the radio thread and the HTTP layer can both depend on it.

pub mod config;
pub mod decode;
pub mod model;
pub mod store;

pub use config::{
    Bandwidth, BoardSettings, BridgeConfig, CodingRate, ConfigError, ConfigStorage,
    FileConfigStorage, HttpSettings, RadioSettings,
};
pub use decode::decode_payload;
pub use model::*;
pub use store::{MemoryStore, PayloadStore};
