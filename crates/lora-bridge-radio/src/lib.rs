//! # lora-bridge-radio
//!
//! Register-level driver for SX127x LoRa transceivers (SX1276/77/78/79,
//! RFM95/96/98) and the continuous receive loop built on it.
//!
//! The driver is generic over `embedded_hal::spi::SpiDevice` for register
//! access and `embedded_hal::digital::OutputPin` for the reset line:
//! - `rpi` - Raspberry Pi SPI and GPIO via `rppal` (feature `rppal`, default)
//! - `MemoryBus` - in-memory register file, for tests and off-device runs
//!
//! The receive loop is blocking and meant to own a dedicated thread.

pub mod bus;
pub mod receiver;
pub mod registers;
#[cfg(feature = "rppal")]
pub mod rpi;
pub mod sx127x;

pub use bus::{MemoryBus, MemoryResetPin};
pub use receiver::{Polling, Receiver, RxWait};
#[cfg(feature = "rppal")]
pub use rpi::{open_reset_pin, open_spi, Dio0Interrupt, RpiSpi};
pub use sx127x::{Mode, Sx127x};

/// Errors raised by the radio driver.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// The transceiver did not report the SX127x silicon version.
    #[error("Unexpected chip version 0x{0:02x} (expected 0x12), check wiring")]
    UnexpectedVersion(u8),

    /// Explicit-header reception needs SF7..SF12.
    #[error("Unsupported spreading factor {0} (expected 7..=12)")]
    UnsupportedSpreadingFactor(u8),

    /// SPI transaction failure.
    #[error("SPI error: {0}")]
    Spi(String),

    /// Reset or interrupt pin failure.
    #[error("Pin error: {0}")]
    Pin(String),

    /// Unsupported bus wiring.
    #[error("Bus error: {0}")]
    Bus(String),

    #[cfg(feature = "rppal")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

pub(crate) fn spi_error<E: embedded_hal::spi::Error>(err: E) -> RadioError {
    RadioError::Spi(format!("{:?} ({:?})", err, err.kind()))
}

pub(crate) fn pin_error<E: embedded_hal::digital::Error>(err: E) -> RadioError {
    RadioError::Pin(format!("{:?} ({:?})", err, err.kind()))
}
