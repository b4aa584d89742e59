//! Radio thread wiring.
//!
//! The SX127x receive loop blocks, so it runs on its own OS thread and hands
//! frames to the bridge with `blocking_send`. When the bridge is gone the
//! callbacks break the loop and the radio goes back to SLEEP.

use std::ops::ControlFlow;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tokio::sync::mpsc;
use tracing::error;

use lora_bridge_radio::{Receiver, RxWait};

use crate::BridgeEvent;

/// Run the receiver on a thread named `lora-rx`, forwarding frames and CRC
/// errors to the bridge until `stop` is set or the channel closes.
pub fn spawn_receiver<SPI, RST, W>(
    mut receiver: Receiver<SPI, RST, W>,
    event_tx: mpsc::Sender<BridgeEvent>,
    stop: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>>
where
    SPI: SpiDevice + Send + 'static,
    RST: OutputPin + Send + 'static,
    W: RxWait + 'static,
{
    let crc_tx = event_tx.clone();
    receiver.on_rx_done(move |packet| forward(&event_tx, BridgeEvent::PacketReceived(packet)));
    receiver.on_crc_error(move || forward(&crc_tx, BridgeEvent::CrcError));

    std::thread::Builder::new()
        .name("lora-rx".to_string())
        .spawn(move || {
            if let Err(e) = receiver.run(&stop) {
                error!("LoRa receiver failed: {}", e);
            }
        })
}

/// Send an event from a non-async thread. Breaks once the bridge is gone.
pub fn forward(event_tx: &mpsc::Sender<BridgeEvent>, event: BridgeEvent) -> ControlFlow<()> {
    match event_tx.blocking_send(event) {
        Ok(()) => ControlFlow::Continue(()),
        Err(_) => {
            error!("Bridge event channel closed, stopping receiver");
            ControlFlow::Break(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::{Duration, Instant};

    use lora_bridge_core::RadioSettings;
    use lora_bridge_radio::registers::{LONG_RANGE_MODE, REG_OP_MODE};
    use lora_bridge_radio::{MemoryBus, Mode, Polling, Sx127x};

    fn memory_receiver(bus: &MemoryBus) -> Receiver<MemoryBus, lora_bridge_radio::MemoryResetPin, Polling> {
        let mut radio = Sx127x::new(bus.clone(), Some(bus.reset_pin()));
        radio.setup(&RadioSettings::default()).unwrap();
        Receiver::new(radio, Polling, Duration::from_millis(1))
    }

    fn wait_for_mode(bus: &MemoryBus, mode: Mode) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while bus.register(REG_OP_MODE) != LONG_RANGE_MODE | mode as u8 {
            assert!(Instant::now() < deadline, "radio never reached {:?}", mode);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_forward_continues_while_bridge_listens() {
        let (tx, mut rx) = mpsc::channel(4);

        assert_eq!(forward(&tx, BridgeEvent::CrcError), ControlFlow::Continue(()));
        assert!(matches!(rx.try_recv(), Ok(BridgeEvent::CrcError)));
    }

    #[test]
    fn test_forward_breaks_on_closed_channel() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        assert_eq!(forward(&tx, BridgeEvent::CrcError), ControlFlow::Break(()));
    }

    #[test]
    fn test_spawned_receiver_forwards_packets() {
        let bus = MemoryBus::new();
        let (tx, mut rx) = mpsc::channel(4);
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_receiver(memory_receiver(&bus), tx, stop.clone()).unwrap();
        assert_eq!(handle.thread().name(), Some("lora-rx"));

        wait_for_mode(&bus, Mode::RxCont);
        bus.inject_packet(br#"{"node":4}"#, 80, 12, false);
        match rx.blocking_recv() {
            Some(BridgeEvent::PacketReceived(packet)) => assert_eq!(packet.payload["node"], 4),
            other => panic!("expected a packet, got {:?}", other),
        }

        bus.inject_packet(b"bad", 0, 0, true);
        assert!(matches!(rx.blocking_recv(), Some(BridgeEvent::CrcError)));

        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();
        assert_eq!(bus.register(REG_OP_MODE), LONG_RANGE_MODE | Mode::Sleep as u8);
    }

    #[test]
    fn test_closed_channel_stops_receiver_thread() {
        let bus = MemoryBus::new();
        let (tx, rx) = mpsc::channel(4);
        // Never set; the closed channel ends the loop
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_receiver(memory_receiver(&bus), tx, stop).unwrap();
        wait_for_mode(&bus, Mode::RxCont);

        drop(rx);
        bus.inject_packet(b"nobody listening", 60, 0, false);

        handle.join().unwrap();
        assert_eq!(bus.register(REG_OP_MODE), LONG_RANGE_MODE | Mode::Sleep as u8);
    }
}
