//! Raspberry Pi backends built on `rppal`.
//!
//! Wiring follows the common SX127x HATs: SPI0 with CE0, DIO0 on BCM 22.

use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::spi::{Bus, Mode as SpiMode, SimpleHalSpiDevice, SlaveSelect, Spi};
use tracing::debug;

use lora_bridge_core::BoardSettings;

use crate::receiver::RxWait;
use crate::{spi_error, RadioError};

/// `/dev/spidevB.C` as an `embedded-hal` SPI device. The kernel driver owns
/// chip select.
pub type RpiSpi = SimpleHalSpiDevice<Spi>;

/// Open the SPI device the board settings name.
pub fn open_spi(board: &BoardSettings) -> Result<RpiSpi, RadioError> {
    let spi = Spi::new(
        spi_bus(board.spi_bus)?,
        slave_select(board.spi_chip_select)?,
        board.spi_clock_hz,
        SpiMode::Mode0,
    )
    .map_err(spi_error)?;
    debug!(
        "Opened /dev/spidev{}.{} at {} Hz",
        board.spi_bus, board.spi_chip_select, board.spi_clock_hz
    );
    Ok(SimpleHalSpiDevice::new(spi))
}

/// The reset line, held high, when the board has one wired.
pub fn open_reset_pin(board: &BoardSettings) -> Result<Option<OutputPin>, RadioError> {
    match board.reset_pin {
        Some(pin) => Ok(Some(Gpio::new()?.get(pin)?.into_output_high())),
        None => Ok(None),
    }
}

/// Wake the receive loop on the rising edge of DIO0.
pub struct Dio0Interrupt {
    pin: InputPin,
}

impl Dio0Interrupt {
    pub fn new(pin: u8) -> Result<Self, RadioError> {
        let mut pin = Gpio::new()?.get(pin)?.into_input_pulldown();
        pin.set_interrupt(Trigger::RisingEdge, None)?;
        Ok(Self { pin })
    }
}

impl RxWait for Dio0Interrupt {
    fn wait(&mut self, timeout: Duration) -> Result<bool, RadioError> {
        Ok(self.pin.poll_interrupt(true, Some(timeout))?.is_some())
    }
}

fn spi_bus(bus: u8) -> Result<Bus, RadioError> {
    Ok(match bus {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        other => return Err(RadioError::Bus(format!("unsupported SPI bus {}", other))),
    })
}

fn slave_select(cs: u8) -> Result<SlaveSelect, RadioError> {
    Ok(match cs {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        other => {
            return Err(RadioError::Bus(format!(
                "unsupported SPI chip select {}",
                other
            )))
        }
    })
}
