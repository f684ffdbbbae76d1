//! Orquestrador do relay: link de rádio → decoder → publisher.
//!
//! Ciclo de vida `Idle → Running → Terminated`, sem retorno. Todo o
//! trabalho acontece no callback de frame, na thread do link. O handler
//! fica atrás de um `Mutex`, então no máximo uma sequência de publicação
//! está em andamento mesmo que o link entregue frames de várias threads.

use crate::error::{DecodeError, PublishError, RelayError};
use crate::http::Transport;
use crate::protocol::{decode_frame, hex_dump};
use crate::publisher::{Publisher, Sleeper};
use crate::radio::RadioLink;
use crate::types::{HttpMethod, PublishRequest, Reading, Series};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Estado do relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Running,
    Terminated,
}

/// Contadores acumulados desde o `start()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub frames: u64,
    pub malformed: u64,
    pub published: u64,
    pub failed: u64,
}

/// O que aconteceu com um frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Todas as séries publicadas.
    Published(Reading),
    /// Frame descartado na decodificação.
    Malformed(DecodeError),
    /// Uma série falhou; as seguintes não foram tentadas.
    Failed {
        reading: Reading,
        series: Series,
        error: PublishError,
    },
    /// Relay fora de `Running`.
    Ignored,
}

/// Decodifica e publica frames de um sensor.
pub struct FrameHandler<T: Transport, S: Sleeper> {
    sensor_name: String,
    publisher: Publisher<T, S>,
    stats: RelayStats,
}

impl<T: Transport, S: Sleeper> FrameHandler<T, S> {
    pub fn new(sensor_name: impl Into<String>, publisher: Publisher<T, S>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            publisher,
            stats: RelayStats::default(),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    /// Processa um frame. Nunca propaga erro: falhas são logadas e
    /// devolvidas no [`FrameOutcome`].
    pub fn on_frame(&mut self, raw: &[u8]) -> FrameOutcome {
        self.stats.frames += 1;
        info!("Frame recebido do sensor ({} bytes)", raw.len());

        let reading = match decode_frame(raw, &self.sensor_name) {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.malformed += 1;
                warn!("Descartando frame [{}]: {e}", hex_dump(raw));
                return FrameOutcome::Malformed(e);
            }
        };
        info!("{reading}");

        let values: Vec<_> = reading.series_values().collect();
        for (series, value) in values {
            let request = PublishRequest::datastream_value(&self.sensor_name, series, value);
            match self.publisher.publish(&request) {
                Ok(body) => {
                    self.stats.published += 1;
                    debug!("{} {} → {:?}", request.method, request.path, body);
                }
                Err(error) => {
                    self.stats.failed += 1;
                    error!("Publicação de {series} abortada para este frame: {error}");
                    return FrameOutcome::Failed {
                        reading,
                        series,
                        error,
                    };
                }
            }
        }

        FrameOutcome::Published(reading)
    }

    /// Cria/atualiza os datastreams das séries com `PUT`.
    pub fn register_datastreams(&self) {
        info!("Criando/atualizando datastreams de '{}'", self.sensor_name);
        for series in Series::ALL {
            let request = PublishRequest::new(
                HttpMethod::Put,
                series.datastream_path(&self.sensor_name),
            );
            if let Err(e) = self.publisher.publish(&request) {
                error!("Falha ao criar/atualizar datastream: {e}");
            }
        }
    }
}

/// Relay entre o link de rádio e o servidor de telemetria.
///
/// `Drop` chama [`Relay::terminate`], cobrindo retorno normal, erro e
/// unwinding.
pub struct Relay<T: Transport + 'static, S: Sleeper + 'static> {
    handler: Arc<Mutex<FrameHandler<T, S>>>,
    active: Arc<AtomicBool>,
    state: RelayState,
    link: Option<Box<dyn RadioLink>>,
    register_datastreams: bool,
}

impl<T: Transport + 'static, S: Sleeper + 'static> Relay<T, S> {
    pub fn new(sensor_name: impl Into<String>, publisher: Publisher<T, S>) -> Self {
        Self {
            handler: Arc::new(Mutex::new(FrameHandler::new(sensor_name, publisher))),
            active: Arc::new(AtomicBool::new(false)),
            state: RelayState::Idle,
            link: None,
            register_datastreams: false,
        }
    }

    /// Emite `PUT` de cada datastream no `start()`.
    pub fn with_datastream_registration(mut self, enabled: bool) -> Self {
        self.register_datastreams = enabled;
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn stats(&self) -> RelayStats {
        lock(&self.handler).stats()
    }

    /// `Idle → Running`: registra o callback no link e passa a ser dono dele.
    pub fn start(&mut self, mut link: Box<dyn RadioLink>) -> Result<(), RelayError> {
        if self.state != RelayState::Idle {
            return Err(RelayError::InvalidState(self.state));
        }
        info!("Inicializando o relay");

        if self.register_datastreams {
            lock(&self.handler).register_datastreams();
        }

        self.active.store(true, Ordering::SeqCst);
        let handler = Arc::clone(&self.handler);
        let active = Arc::clone(&self.active);
        let subscribed = link.subscribe(Box::new(move |raw: &[u8]| {
            dispatch(&handler, &active, raw);
        }));

        if let Err(e) = subscribed {
            self.active.store(false, Ordering::SeqCst);
            self.state = RelayState::Terminated;
            error!("Falha ao inicializar o link de rádio: {e}");
            return Err(e.into());
        }

        self.link = Some(link);
        self.state = RelayState::Running;
        info!("Relay ativo");
        Ok(())
    }

    /// Entrega um frame ao handler, como o link faria.
    pub fn on_frame(&self, raw: &[u8]) -> FrameOutcome {
        dispatch(&self.handler, &self.active, raw)
    }

    /// `→ Terminated`. Idempotente; libera o link e espera o frame em curso.
    pub fn terminate(&mut self) {
        if self.state == RelayState::Terminated {
            return;
        }
        info!("Encerrando o relay");
        self.active.store(false, Ordering::SeqCst);
        if let Some(mut link) = self.link.take() {
            link.halt();
        }
        self.state = RelayState::Terminated;

        let stats = self.stats();
        info!(
            "Relay encerrado: {} frames, {} malformados, {} séries publicadas, {} falhas",
            stats.frames, stats.malformed, stats.published, stats.failed
        );
    }
}

impl<T: Transport + 'static, S: Sleeper + 'static> Drop for Relay<T, S> {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn dispatch<T: Transport, S: Sleeper>(
    handler: &Mutex<FrameHandler<T, S>>,
    active: &AtomicBool,
    raw: &[u8],
) -> FrameOutcome {
    if !active.load(Ordering::SeqCst) {
        debug!("Relay inativo, ignorando frame de {} bytes", raw.len());
        return FrameOutcome::Ignored;
    }
    lock(handler).on_frame(raw)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
