//! SX127x LoRa driver.
//!
//! Covers what a receiver needs: modem setup, mode changes, DIO mapping,
//! IRQ handling and reading received frames with their signal quality.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};
use tracing::{debug, info};

use lora_bridge_core::{Bandwidth, CodingRate, RadioSettings};

use crate::registers::*;
use crate::{pin_error, spi_error, RadioError};

/// Explicit-header reception range. SF6 needs implicit headers.
const SPREADING_FACTORS: std::ops::RangeInclusive<u8> = 7..=12;

/// Transceiver operating modes (RegOpMode bits 2..0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Sleep = 0,
    Stdby = 1,
    Fstx = 2,
    Tx = 3,
    Fsrx = 4,
    RxCont = 5,
    RxSingle = 6,
    Cad = 7,
}

impl Mode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & MODE_MASK {
            0 => Mode::Sleep,
            1 => Mode::Stdby,
            2 => Mode::Fstx,
            3 => Mode::Tx,
            4 => Mode::Fsrx,
            5 => Mode::RxCont,
            6 => Mode::RxSingle,
            _ => Mode::Cad,
        }
    }
}

/// An SX127x in LoRa mode.
///
/// Every register access is a single SPI operation: rppal's
/// `SimpleHalSpiDevice` releases chip select between operations.
pub struct Sx127x<SPI, RST> {
    spi: SPI,
    reset: Option<RST>,
    frequency_hz: u32,
}

impl<SPI, RST> Sx127x<SPI, RST>
where
    SPI: SpiDevice,
    RST: OutputPin,
{
    /// Wrap an SPI device and optional reset line. No registers are touched
    /// until `setup`.
    pub fn new(spi: SPI, reset: Option<RST>) -> Self {
        Self {
            spi,
            reset,
            frequency_hz: RadioSettings::default().frequency_hz,
        }
    }

    /// Reset, verify and configure the modem. Leaves it in LoRa SLEEP.
    pub fn setup(&mut self, settings: &RadioSettings) -> Result<(), RadioError> {
        if !SPREADING_FACTORS.contains(&settings.spreading_factor) {
            return Err(RadioError::UnsupportedSpreadingFactor(settings.spreading_factor));
        }

        self.reset()?;

        let version = self.read_register(REG_VERSION)?;
        if version != CHIP_VERSION {
            return Err(RadioError::UnexpectedVersion(version));
        }

        // LongRangeMode can only change while sleeping
        self.write_register(REG_OP_MODE, Mode::Sleep as u8)?;
        self.write_register(REG_OP_MODE, LONG_RANGE_MODE | Mode::Sleep as u8)?;

        self.set_frequency(settings.frequency_hz)?;

        self.write_register(
            REG_MODEM_CONFIG_1,
            bandwidth_bits(settings.bandwidth) << 4 | coding_rate_bits(settings.coding_rate) << 1,
        )?;

        let mut config2 = (settings.spreading_factor & 0x0f) << 4;
        if settings.crc {
            config2 |= RX_PAYLOAD_CRC_ON;
        }
        self.write_register(REG_MODEM_CONFIG_2, config2)?;

        let mut config3 = AGC_AUTO_ON;
        if needs_low_data_rate_optimize(settings.spreading_factor, settings.bandwidth) {
            config3 |= LOW_DATA_RATE_OPTIMIZE;
        }
        self.write_register(REG_MODEM_CONFIG_3, config3)?;

        let [preamble_msb, preamble_lsb] = settings.preamble_length.to_be_bytes();
        self.write_register(REG_PREAMBLE_MSB, preamble_msb)?;
        self.write_register(REG_PREAMBLE_LSB, preamble_lsb)?;
        self.write_register(REG_SYNC_WORD, settings.sync_word)?;

        let mut lna = LNA_MAX_GAIN;
        if settings.lna_boost {
            lna |= LNA_BOOST_HF;
        }
        self.write_register(REG_LNA, lna)?;

        self.write_register(REG_MAX_PAYLOAD_LENGTH, 0xff)?;
        self.write_register(REG_FIFO_TX_BASE_ADDR, 0x00)?;
        self.write_register(REG_FIFO_RX_BASE_ADDR, 0x00)?;
        self.write_register(REG_IRQ_FLAGS_MASK, 0x00)?;

        info!(
            "SX127x configured: {} Hz, BW {} Hz, SF{}, CR {:?}, sync word 0x{:02x}",
            settings.frequency_hz,
            settings.bandwidth.hz(),
            settings.spreading_factor,
            settings.coding_rate,
            settings.sync_word
        );
        Ok(())
    }

    /// Pulse the reset line, if one is wired: >100 us low, then 5 ms
    /// until the chip is ready.
    pub fn reset(&mut self) -> Result<(), RadioError> {
        if let Some(pin) = self.reset.as_mut() {
            pin.set_low().map_err(pin_error)?;
            std::thread::sleep(Duration::from_millis(1));
            pin.set_high().map_err(pin_error)?;
            std::thread::sleep(Duration::from_millis(10));
            debug!("SX127x reset pulsed");
        }
        Ok(())
    }

    /// Program the carrier frequency.
    pub fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), RadioError> {
        let frf = ((frequency_hz as u64) << 19) / FXOSC_HZ;
        self.write_register(REG_FRF_MSB, (frf >> 16) as u8)?;
        self.write_register(REG_FRF_MID, (frf >> 8) as u8)?;
        self.write_register(REG_FRF_LSB, frf as u8)?;
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    pub fn mode(&mut self) -> Result<Mode, RadioError> {
        Ok(Mode::from_bits(self.read_register(REG_OP_MODE)?))
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), RadioError> {
        debug!("SX127x mode -> {:?}", mode);
        self.write_register(REG_OP_MODE, LONG_RANGE_MODE | mode as u8)
    }

    /// Map DIO0..DIO5. In LoRa mode mapping 0 puts RxDone on DIO0.
    pub fn set_dio_mapping(&mut self, mapping: [u8; 6]) -> Result<(), RadioError> {
        let m = mapping.map(|v| v & 0x03);
        self.write_register(REG_DIO_MAPPING_1, m[0] << 6 | m[1] << 4 | m[2] << 2 | m[3])?;
        self.write_register(REG_DIO_MAPPING_2, m[4] << 6 | m[5] << 4)
    }

    pub fn irq_flags(&mut self) -> Result<u8, RadioError> {
        self.read_register(REG_IRQ_FLAGS)
    }

    /// Clear every pending IRQ flag.
    pub fn clear_irq_flags(&mut self) -> Result<(), RadioError> {
        self.write_register(REG_IRQ_FLAGS, 0xff)
    }

    /// Read the last received frame out of the FIFO.
    pub fn read_payload(&mut self) -> Result<Vec<u8>, RadioError> {
        let current = self.read_register(REG_FIFO_RX_CURRENT_ADDR)?;
        let len = self.read_register(REG_RX_NB_BYTES)? as usize;
        self.write_register(REG_FIFO_ADDR_PTR, current)?;

        let mut payload = vec![0u8; len];
        if len > 0 {
            self.read_fifo(&mut payload)?;
        }
        Ok(payload)
    }

    /// RSSI of the last packet in dBm.
    pub fn packet_rssi(&mut self) -> Result<i16, RadioError> {
        let raw = self.read_register(REG_PKT_RSSI_VALUE)? as i16;
        let offset = if self.frequency_hz >= RF_MID_BAND_THRESHOLD_HZ {
            RSSI_OFFSET_HF
        } else {
            RSSI_OFFSET_LF
        };
        Ok(offset + raw)
    }

    /// SNR of the last packet in dB (two's complement, quarter-dB steps).
    pub fn packet_snr(&mut self) -> Result<f32, RadioError> {
        let raw = self.read_register(REG_PKT_SNR_VALUE)? as i8;
        Ok(raw as f32 / 4.0)
    }

    pub fn spi(&self) -> &SPI {
        &self.spi
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, RadioError> {
        let mut frame = [reg & 0x7f, 0];
        self.spi
            .transaction(&mut [Operation::TransferInPlace(&mut frame)])
            .map_err(spi_error)?;
        Ok(frame[1])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), RadioError> {
        self.spi
            .transaction(&mut [Operation::Write(&[reg | 0x80, value])])
            .map_err(spi_error)
    }

    /// Drain `buf.len()` bytes from the FIFO at the current address pointer.
    fn read_fifo(&mut self, buf: &mut [u8]) -> Result<(), RadioError> {
        let mut frame = vec![0u8; buf.len() + 1];
        frame[0] = REG_FIFO;
        self.spi
            .transaction(&mut [Operation::TransferInPlace(&mut frame)])
            .map_err(spi_error)?;
        buf.copy_from_slice(&frame[1..]);
        Ok(())
    }
}

fn bandwidth_bits(bandwidth: Bandwidth) -> u8 {
    match bandwidth {
        Bandwidth::Bw7_8 => 0,
        Bandwidth::Bw10_4 => 1,
        Bandwidth::Bw15_6 => 2,
        Bandwidth::Bw20_8 => 3,
        Bandwidth::Bw31_25 => 4,
        Bandwidth::Bw41_7 => 5,
        Bandwidth::Bw62_5 => 6,
        Bandwidth::Bw125 => 7,
        Bandwidth::Bw250 => 8,
        Bandwidth::Bw500 => 9,
    }
}

fn coding_rate_bits(rate: CodingRate) -> u8 {
    match rate {
        CodingRate::Cr4_5 => 1,
        CodingRate::Cr4_6 => 2,
        CodingRate::Cr4_7 => 3,
        CodingRate::Cr4_8 => 4,
    }
}

/// Required when a symbol lasts longer than 16 ms.
fn needs_low_data_rate_optimize(spreading_factor: u8, bandwidth: Bandwidth) -> bool {
    let symbol_us = (1u64 << spreading_factor) * 1_000_000 / bandwidth.hz() as u64;
    symbol_us > 16_000
}
