//! SX127x LoRa-mode register map and bit fields.

pub const REG_FIFO: u8 = 0x00;
pub const REG_OP_MODE: u8 = 0x01;
pub const REG_FRF_MSB: u8 = 0x06;
pub const REG_FRF_MID: u8 = 0x07;
pub const REG_FRF_LSB: u8 = 0x08;
pub const REG_LNA: u8 = 0x0C;
pub const REG_FIFO_ADDR_PTR: u8 = 0x0D;
pub const REG_FIFO_TX_BASE_ADDR: u8 = 0x0E;
pub const REG_FIFO_RX_BASE_ADDR: u8 = 0x0F;
pub const REG_FIFO_RX_CURRENT_ADDR: u8 = 0x10;
pub const REG_IRQ_FLAGS_MASK: u8 = 0x11;
pub const REG_IRQ_FLAGS: u8 = 0x12;
pub const REG_RX_NB_BYTES: u8 = 0x13;
pub const REG_PKT_SNR_VALUE: u8 = 0x19;
pub const REG_PKT_RSSI_VALUE: u8 = 0x1A;
pub const REG_MODEM_CONFIG_1: u8 = 0x1D;
pub const REG_MODEM_CONFIG_2: u8 = 0x1E;
pub const REG_PREAMBLE_MSB: u8 = 0x20;
pub const REG_PREAMBLE_LSB: u8 = 0x21;
pub const REG_MAX_PAYLOAD_LENGTH: u8 = 0x23;
pub const REG_MODEM_CONFIG_3: u8 = 0x26;
pub const REG_SYNC_WORD: u8 = 0x39;
pub const REG_DIO_MAPPING_1: u8 = 0x40;
pub const REG_DIO_MAPPING_2: u8 = 0x41;
pub const REG_VERSION: u8 = 0x42;

/// Silicon revision reported by every SX127x part.
pub const CHIP_VERSION: u8 = 0x12;

/// RegOpMode bit selecting LoRa instead of FSK/OOK. Writable only in SLEEP.
pub const LONG_RANGE_MODE: u8 = 0x80;
pub const MODE_MASK: u8 = 0x07;

pub const IRQ_RX_TIMEOUT: u8 = 0x80;
pub const IRQ_RX_DONE: u8 = 0x40;
pub const IRQ_PAYLOAD_CRC_ERROR: u8 = 0x20;
pub const IRQ_VALID_HEADER: u8 = 0x10;
pub const IRQ_TX_DONE: u8 = 0x08;
pub const IRQ_CAD_DONE: u8 = 0x04;
pub const IRQ_FHSS_CHANGE_CHANNEL: u8 = 0x02;
pub const IRQ_CAD_DETECTED: u8 = 0x01;

/// G1 (maximum) LNA gain.
pub const LNA_MAX_GAIN: u8 = 0x20;
pub const LNA_BOOST_HF: u8 = 0x03;

/// ModemConfig3 AgcAutoOn.
pub const AGC_AUTO_ON: u8 = 0x04;
/// ModemConfig3 LowDataRateOptimize.
pub const LOW_DATA_RATE_OPTIMIZE: u8 = 0x08;
/// ModemConfig2 RxPayloadCrcOn.
pub const RX_PAYLOAD_CRC_ON: u8 = 0x04;

/// Crystal frequency; one FRF step is `FXOSC / 2^19`.
pub const FXOSC_HZ: u64 = 32_000_000;

/// Frequencies above this use the HF port and its RSSI offset.
pub const RF_MID_BAND_THRESHOLD_HZ: u32 = 525_000_000;
pub const RSSI_OFFSET_HF: i16 = -157;
pub const RSSI_OFFSET_LF: i16 = -164;
