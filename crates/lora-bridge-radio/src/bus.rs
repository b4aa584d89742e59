//! In-memory SX127x register file behind the `embedded-hal` SPI traits.
//!
//! SX127x registers are accessed over SPI with a one-byte address whose top
//! bit selects write (1) or read (0); the following bytes are data. Each
//! `SpiDevice::transaction` is one chip-select frame.

use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::digital;
use embedded_hal::spi::{self, ErrorKind, ErrorType, Operation, SpiDevice};

use crate::registers::*;

#[derive(Debug)]
struct MemoryBusState {
    regs: [u8; 0x80],
    fifo: [u8; 256],
    writes: Vec<(u8, u8)>,
    resets: usize,
    fail_next: usize,
}

impl MemoryBusState {
    /// Clock one byte through the frame. The first byte is the header.
    fn exchange(&mut self, header: &mut Option<u8>, out: u8) -> u8 {
        let Some(current) = *header else {
            *header = Some(out);
            return 0;
        };

        let reg = current & 0x7f;
        let value = if current & 0x80 != 0 {
            self.write_register(reg, out);
            0
        } else {
            self.read_register(reg)
        };

        // Bursts advance the address, except on the FIFO
        if reg != REG_FIFO {
            *header = Some((current & 0x80) | (reg.wrapping_add(1) & 0x7f));
        }
        value
    }

    fn read_register(&mut self, reg: u8) -> u8 {
        if reg == REG_FIFO {
            let ptr = self.regs[REG_FIFO_ADDR_PTR as usize];
            self.regs[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
            self.fifo[ptr as usize]
        } else {
            self.regs[reg as usize]
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        self.writes.push((reg, value));
        match reg {
            REG_FIFO => {
                let ptr = self.regs[REG_FIFO_ADDR_PTR as usize];
                self.fifo[ptr as usize] = value;
                self.regs[REG_FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
            }
            REG_IRQ_FLAGS => self.regs[REG_IRQ_FLAGS as usize] &= !value,
            REG_VERSION => {}
            _ => self.regs[reg as usize] = value,
        }
    }

    fn power_on_reset(&mut self) {
        self.resets += 1;
        self.regs[REG_OP_MODE as usize] = 0x09;
        self.regs[REG_IRQ_FLAGS as usize] = 0;
    }
}

/// Transaction failure injected with `MemoryBus::fail_next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBusError;

impl spi::Error for MemoryBusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// An in-memory SX127x register file.
///
/// Behaves like the chip where the receive path depends on it: FIFO access
/// goes through `RegFifoAddrPtr` and auto-increments, and `RegIrqFlags` is
/// cleared by writing ones. Clones share the same state, so a test can keep
/// a handle while a `Receiver` owns the bus.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryBusState>>,
}

impl MemoryBus {
    /// A bus with power-on register values and the SX127x version.
    pub fn new() -> Self {
        let mut regs = [0u8; 0x80];
        regs[REG_OP_MODE as usize] = 0x09;
        regs[REG_VERSION as usize] = CHIP_VERSION;
        Self {
            state: Arc::new(Mutex::new(MemoryBusState {
                regs,
                fifo: [0; 256],
                writes: Vec::new(),
                resets: 0,
                fail_next: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryBusState> {
        // Poisoning is ignored; the register file stays usable
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A reset line wired to this register file.
    pub fn reset_pin(&self) -> MemoryResetPin {
        MemoryResetPin {
            state: self.state.clone(),
            low: false,
        }
    }

    /// Current value of a register.
    pub fn register(&self, reg: u8) -> u8 {
        self.lock().regs[(reg & 0x7f) as usize]
    }

    /// Force a register value without recording a write.
    pub fn set_register(&self, reg: u8, value: u8) {
        self.lock().regs[(reg & 0x7f) as usize] = value;
    }

    /// Every register write seen so far, in order.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.lock().writes.clone()
    }

    /// Number of hardware resets seen on the reset pin.
    pub fn resets(&self) -> usize {
        self.lock().resets
    }

    /// Fail the next `count` transactions with `MemoryBusError`.
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_next = count;
    }

    /// Place a frame in the FIFO the way the modem does on reception and
    /// raise RxDone (plus PayloadCrcError when `crc_error` is set).
    pub fn inject_packet(&self, data: &[u8], pkt_rssi: u8, pkt_snr: i8, crc_error: bool) {
        let mut state = self.lock();
        let base = state.regs[REG_FIFO_RX_BASE_ADDR as usize];
        for (i, byte) in data.iter().enumerate() {
            state.fifo[base.wrapping_add(i as u8) as usize] = *byte;
        }
        state.regs[REG_FIFO_RX_CURRENT_ADDR as usize] = base;
        state.regs[REG_RX_NB_BYTES as usize] = data.len() as u8;
        state.regs[REG_PKT_RSSI_VALUE as usize] = pkt_rssi;
        state.regs[REG_PKT_SNR_VALUE as usize] = pkt_snr as u8;

        let mut flags = IRQ_RX_DONE | IRQ_VALID_HEADER;
        if crc_error {
            flags |= IRQ_PAYLOAD_CRC_ERROR;
        }
        state.regs[REG_IRQ_FLAGS as usize] |= flags;
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for MemoryBus {
    type Error = MemoryBusError;
}

impl SpiDevice<u8> for MemoryBus {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(MemoryBusError);
        }

        let mut header = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = state.exchange(&mut header, 0);
                    }
                }
                Operation::Write(bytes) => {
                    for byte in bytes.iter() {
                        state.exchange(&mut header, *byte);
                    }
                }
                Operation::Transfer(read, write) => {
                    for i in 0..read.len().max(write.len()) {
                        let value = state.exchange(&mut header, write.get(i).copied().unwrap_or(0));
                        if let Some(slot) = read.get_mut(i) {
                            *slot = value;
                        }
                    }
                }
                Operation::TransferInPlace(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = state.exchange(&mut header, *byte);
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

/// Reset line of a `MemoryBus`. A low-to-high pulse resets the chip.
#[derive(Debug)]
pub struct MemoryResetPin {
    state: Arc<Mutex<MemoryBusState>>,
    low: bool,
}

impl digital::ErrorType for MemoryResetPin {
    type Error = core::convert::Infallible;
}

impl digital::OutputPin for MemoryResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.low = true;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if std::mem::replace(&mut self.low, false) {
            self.state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .power_on_reset();
        }
        Ok(())
    }
}
