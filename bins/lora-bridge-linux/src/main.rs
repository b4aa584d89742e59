use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lora_bridge_core::{BridgeConfig, ConfigStorage, FileConfigStorage, HttpSettings, ReceivedPacket};
use lora_bridge_radio::{Polling, Receiver, Sx127x};
use lora_bridge_web::{create_router, spawn_receiver, AppState, BridgeEvent, LoraBridge};

const CONFIG_ENV: &str = "LORA_BRIDGE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "lora-bridge.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,lora_bridge_radio=debug,lora_bridge_web=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("LoRa bridge starting...");

    // Configuration
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let storage = FileConfigStorage::new(&config_path);
    let config = storage
        .load_or_init()
        .with_context(|| format!("loading configuration from {}", config_path))?;
    tracing::info!("Configuration loaded from {}", config_path);

    let bridge = LoraBridge::new();
    let event_tx = bridge.event_sender();
    let state = bridge.state();

    // Packet source: the radio thread, or the demo generator
    let stop = Arc::new(AtomicBool::new(false));
    let radio_thread = if config.simulate {
        tracing::warn!("Simulation mode: generating demo packets, radio not used");
        tokio::spawn(generate_demo_packets(event_tx));
        None
    } else {
        Some(start_radio(&config, event_tx, stop.clone())?)
    };

    let bridge_handle = tokio::spawn(bridge.run());

    let http_settings = config.http.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = start_http_server(http_settings, state).await {
            tracing::error!("HTTP server error: {:#}", e);
        }
    });

    tracing::info!("LoRa bridge ready!");
    tracing::info!("   Payload: http://{}/get-lora-data", config.http.bind_addr);
    tracing::info!("   Status:  http://{}/status", config.http.bind_addr);

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = bridge_handle => {
            tracing::warn!("Bridge event processor stopped");
        }
    }

    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = radio_thread {
        // The receive loop notices `stop` within one poll interval
        let joined = tokio::task::spawn_blocking(move || handle.join()).await?;
        if joined.is_err() {
            tracing::error!("LoRa receiver thread panicked");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Start the HTTP API server
async fn start_http_server(settings: HttpSettings, state: AppState) -> anyhow::Result<()> {
    let mut app = create_router(state).layer(TraceLayer::new_for_http());
    if settings.cors {
        app = app.layer(CorsLayer::permissive());
    }

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    tracing::info!("HTTP server listening on {}", settings.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Configure the SX127x and start the receive thread.
#[cfg(feature = "rpi")]
fn start_radio(
    config: &BridgeConfig,
    event_tx: mpsc::Sender<BridgeEvent>,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<std::thread::JoinHandle<()>> {
    use lora_bridge_radio::{open_reset_pin, open_spi, Dio0Interrupt};

    let spi = open_spi(&config.board).context("opening SPI device")?;
    let reset = open_reset_pin(&config.board).context("configuring reset pin")?;
    let mut radio = Sx127x::new(spi, reset);
    radio
        .setup(&config.radio)
        .context("initializing SX127x")?;

    let poll_interval = config.radio.poll_interval();
    let handle = match config.board.dio0_pin {
        Some(pin) => {
            let dio0 = Dio0Interrupt::new(pin)
                .with_context(|| format!("configuring DIO0 interrupt on GPIO {}", pin))?;
            tracing::info!("Waiting for RxDone on DIO0 (GPIO {})", pin);
            spawn_receiver(Receiver::new(radio, dio0, poll_interval), event_tx, stop)
        }
        None => {
            tracing::info!("No DIO0 pin configured, polling every {:?}", poll_interval);
            spawn_receiver(Receiver::new(radio, Polling, poll_interval), event_tx, stop)
        }
    };
    handle.context("spawning receiver thread")
}

#[cfg(not(feature = "rpi"))]
fn start_radio(
    _config: &BridgeConfig,
    _event_tx: mpsc::Sender<BridgeEvent>,
    _stop: Arc<AtomicBool>,
) -> anyhow::Result<std::thread::JoinHandle<()>> {
    anyhow::bail!("built without the `rpi` feature; set \"simulate\": true to run without a radio")
}

/// Generate demo packets - a simulated sensor node transmitting once a second
async fn generate_demo_packets(event_tx: mpsc::Sender<BridgeEvent>) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(1));
    let started = tokio::time::Instant::now();
    let mut seq: u64 = 0;

    loop {
        interval.tick().await;
        seq += 1;

        let t = started.elapsed().as_secs_f64();
        let frame = serde_json::json!({
            "device": "sim-node-1",
            "seq": seq,
            "temperature": 21.0 + (t / 30.0).sin() * 2.5,
            "humidity": 48.0 + (t / 45.0).cos() * 6.0,
        });
        let packet = ReceivedPacket::from_raw(frame.to_string().into_bytes(), Some(-72), Some(9.5));

        if event_tx.send(BridgeEvent::PacketReceived(packet)).await.is_err() {
            tracing::error!("Failed to send demo packet - bridge may have stopped");
            break;
        }
    }
}
