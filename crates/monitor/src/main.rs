//! # Frame Monitor
//!
//! Escuta o link de rádio e loga cada frame recebido (hex + leitura
//! decodificada), sem publicar nada. Útil para conferir a bridge e o
//! sensor antes de ligar o relay.
//!
//! ## Uso
//! ```bash
//! frame_monitor                      # relay.toml ao lado do executável
//! frame_monitor --config relay.toml
//! ```

use relay_core::config::AppConfig;
use relay_core::protocol::{decode_frame, hex_dump};
use relay_core::radio::{FrameCallback, RadioLink};
use relay_core::UdpRadioLink;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Config ──
    let config_path = AppConfig::path_from_args(std::env::args());
    let config = AppConfig::load(&config_path);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("ERRO: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.link.bind_addr()?;
    let source_filter = config.link.source_filter()?;
    let sensor_name = config.sensor.name.clone();

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    debug!("Inicializando link de rádio em {bind_addr}");
    let mut link = UdpRadioLink::new(bind_addr, source_filter);
    link.subscribe(frame_logger(sensor_name))?;
    info!("Escutando tráfego de entrada...");

    let _ = stop_rx.recv();
    link.halt();
    debug!("Monitor encerrado.");
    Ok(())
}

/// Callback que só loga o frame.
fn frame_logger(sensor_name: String) -> FrameCallback {
    let mut count: u64 = 0;
    Box::new(move |raw: &[u8]| {
        count += 1;
        info!("#{count} [{} bytes] {}", raw.len(), hex_dump(raw));
        match decode_frame(raw, &sensor_name) {
            Ok(reading) => info!("#{count} {reading}"),
            Err(e) => warn!("#{count} {e}"),
        }
    })
}
