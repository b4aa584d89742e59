//! Continuous receive loop.
//!
//! The receiver keeps the modem in RXCONT and hands every good frame to the
//! registered `on_rx_done` callback. It blocks, so run it on its own thread:
//!
//! ```rust,ignore
//! let mut receiver = Receiver::new(radio, Polling, settings.poll_interval());
//! receiver.on_rx_done(move |packet| {
//!     println!("{:?}", packet.payload);
//!     ControlFlow::Continue(())
//! });
//! std::thread::spawn(move || receiver.run(&stop));
//! ```

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::{debug, info, warn};

use lora_bridge_core::ReceivedPacket;

use crate::registers::{IRQ_PAYLOAD_CRC_ERROR, IRQ_RX_DONE};
use crate::sx127x::{Mode, Sx127x};
use crate::RadioError;

/// How the receive loop waits for the next RxDone.
pub trait RxWait: Send {
    /// Block until DIO0 fires or `timeout` elapses. Returns `true` when the
    /// line fired. The loop reads the IRQ flags either way.
    fn wait(&mut self, timeout: Duration) -> Result<bool, RadioError>;
}

/// Sleep for the whole timeout; the IRQ register is the only signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Polling;

impl RxWait for Polling {
    fn wait(&mut self, timeout: Duration) -> Result<bool, RadioError> {
        std::thread::sleep(timeout);
        Ok(false)
    }
}

type RxDoneCallback = Box<dyn FnMut(ReceivedPacket) -> ControlFlow<()> + Send>;
type CrcErrorCallback = Box<dyn FnMut() -> ControlFlow<()> + Send>;

/// Continuous receiver around a configured `Sx127x`.
pub struct Receiver<SPI, RST, W> {
    radio: Sx127x<SPI, RST>,
    wait: W,
    poll_interval: Duration,
    on_rx_done: Option<RxDoneCallback>,
    on_crc_error: Option<CrcErrorCallback>,
    crc_errors: u64,
}

impl<SPI, RST, W> Receiver<SPI, RST, W>
where
    SPI: SpiDevice,
    RST: OutputPin,
    W: RxWait,
{
    pub fn new(radio: Sx127x<SPI, RST>, wait: W, poll_interval: Duration) -> Self {
        Self {
            radio,
            wait,
            poll_interval,
            on_rx_done: None,
            on_crc_error: None,
            crc_errors: 0,
        }
    }

    /// Register the callback receiving each good frame. Returning
    /// `ControlFlow::Break` stops the loop. Replaces any earlier callback.
    pub fn on_rx_done<F>(&mut self, callback: F)
    where
        F: FnMut(ReceivedPacket) -> ControlFlow<()> + Send + 'static,
    {
        self.on_rx_done = Some(Box::new(callback));
    }

    /// Register the callback invoked for each frame dropped on a CRC error.
    pub fn on_crc_error<F>(&mut self, callback: F)
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        self.on_crc_error = Some(Box::new(callback));
    }

    /// Frames dropped on a payload CRC error so far.
    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }

    pub fn radio(&mut self) -> &mut Sx127x<SPI, RST> {
        &mut self.radio
    }

    /// Enter RXCONT and receive until `stop` is set or a callback breaks.
    ///
    /// Only failures entering receive mode are returned. Errors inside the
    /// loop are logged and retried after the poll interval. A failing wait
    /// degrades to polling: the IRQ flags are still read every interval.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), RadioError> {
        self.start()?;
        info!("LoRa receiver listening (RXCONT)");

        while !stop.load(Ordering::Relaxed) {
            if let Err(e) = self.wait.wait(self.poll_interval) {
                warn!("Waiting for DIO0 failed, polling instead: {}", e);
                std::thread::sleep(self.poll_interval);
            }

            match self.poll_once() {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => {
                    debug!("Receiver callback requested stop");
                    break;
                }
                Err(e) => {
                    warn!("Receive failed: {}", e);
                    std::thread::sleep(self.poll_interval);
                }
            }
        }

        if let Err(e) = self.radio.set_mode(Mode::Sleep) {
            warn!("Failed to put radio to sleep: {}", e);
        }
        info!("LoRa receiver stopped");
        Ok(())
    }

    /// SLEEP, map DIO0 to RxDone, drop stale IRQs, then RXCONT.
    fn start(&mut self) -> Result<(), RadioError> {
        self.radio.set_mode(Mode::Sleep)?;
        self.radio.set_dio_mapping([0; 6])?;
        self.radio.clear_irq_flags()?;
        self.radio.set_mode(Mode::RxCont)
    }

    /// Check the IRQ flags once and dispatch a received frame if there is one.
    pub fn poll_once(&mut self) -> Result<ControlFlow<()>, RadioError> {
        let flags = self.radio.irq_flags()?;
        if flags & IRQ_RX_DONE == 0 {
            return Ok(ControlFlow::Continue(()));
        }

        if flags & IRQ_PAYLOAD_CRC_ERROR != 0 {
            self.radio.clear_irq_flags()?;
            self.crc_errors += 1;
            warn!("Dropped frame with payload CRC error ({} total)", self.crc_errors);
            return Ok(match self.on_crc_error.as_mut() {
                Some(callback) => callback(),
                None => ControlFlow::Continue(()),
            });
        }

        let raw = self.radio.read_payload()?;
        let rssi = self.radio.packet_rssi()?;
        let snr = self.radio.packet_snr()?;
        self.radio.clear_irq_flags()?;

        let packet = ReceivedPacket::from_raw(raw, Some(rssi), Some(snr));
        info!(
            "Received {} bytes (RSSI {} dBm, SNR {} dB): {}",
            packet.len(),
            rssi,
            snr,
            packet.payload_json()
        );

        Ok(match self.on_rx_done.as_mut() {
            Some(callback) => callback(packet),
            None => ControlFlow::Continue(()),
        })
    }
}
