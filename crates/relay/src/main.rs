//! # Telemetry Relay
//!
//! Recebe frames do sensor de sótão pelo link de rádio e publica cada
//! série na API de datastreams via HTTP.
//!
//! ## Uso
//! ```bash
//! telemetry_relay                      # relay.toml ao lado do executável
//! telemetry_relay --config relay.toml  # config explícito
//! RUST_LOG=debug telemetry_relay       # log detalhado
//! ```

use relay_core::config::AppConfig;
use relay_core::{HttpTransport, Publisher, Relay, ThreadSleeper, UdpRadioLink};
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Inicializando o relay v{}", env!("CARGO_PKG_VERSION"));

    // ── Carregar config ──
    let config_path = AppConfig::path_from_args(std::env::args());
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("ERRO: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = config.endpoint();
    let policy = config.retry_policy()?;
    let bind_addr = config.link.bind_addr()?;
    let source_filter = config.link.source_filter()?;

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   📡 TELEMETRY RELAY – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Servidor:  {endpoint}");
    println!("  Séries:    /datastream/{}_<série>", config.sensor.name);
    println!("  Link:      udp://{bind_addr}");
    println!(
        "  Retry:     {} tentativas, backoff {}s +1s",
        policy.max_attempts(),
        policy.initial_backoff().as_secs()
    );
    println!("══════════════════════════════════════════════");
    println!();

    // ── Sinal de parada ──
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    // ── Relay ──
    let publisher = Publisher::new(
        endpoint,
        policy,
        HttpTransport::new(config.request_timeout()),
        ThreadSleeper,
    );
    let mut relay = Relay::new(config.sensor.name.clone(), publisher)
        .with_datastream_registration(config.sensor.register_datastreams);
    relay.start(Box::new(UdpRadioLink::new(bind_addr, source_filter)))?;

    // Todo o trabalho acontece na thread do link; aqui só esperamos o sinal
    if stop_rx.recv().is_ok() {
        info!("Sinal de interrupção recebido");
    }
    relay.terminate();
    Ok(())
}
