//! Link de rádio: entrega frames brutos, um por vez, numa thread dedicada.
//!
//! - [`UdpRadioLink`] – um frame por datagrama (bridge serial → rede)
//! - [`ChannelRadioLink`] – frames injetados via `crossbeam-channel`

use crate::error::LinkError;
use crate::protocol::hex_dump;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Intervalo máximo até a thread do link notar um `halt()`.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Maior payload aceito num datagrama.
const MAX_FRAME_LEN: usize = 512;

/// Callback de frame. Chamado serialmente, nunca de forma reentrante.
pub type FrameCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Interface do link de rádio.
pub trait RadioLink: Send {
    /// Registra o callback e começa a entregar frames.
    fn subscribe(&mut self, on_frame: FrameCallback) -> Result<(), LinkError>;

    /// Para a entrega e libera o transporte. Espera o callback em andamento.
    fn halt(&mut self);
}

/// Thread de entrega compartilhada pelos links.
struct Worker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<F>(name: &str, body: F) -> Result<Self, LinkError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || body(flag))?;
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Thread do link de rádio terminou com panic");
            }
        }
    }
}

// ──────────────────────────────────────────────
// UDP
// ──────────────────────────────────────────────

/// Link que recebe cada frame como um datagrama UDP.
pub struct UdpRadioLink {
    bind_addr: SocketAddr,
    source_filter: Option<IpAddr>,
    local_addr: Option<SocketAddr>,
    worker: Option<Worker>,
}

impl UdpRadioLink {
    pub fn new(bind_addr: SocketAddr, source_filter: Option<IpAddr>) -> Self {
        Self {
            bind_addr,
            source_filter,
            local_addr: None,
            worker: None,
        }
    }

    /// Endereço efetivo após o bind (útil com porta 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl RadioLink for UdpRadioLink {
    fn subscribe(&mut self, mut on_frame: FrameCallback) -> Result<(), LinkError> {
        if self.worker.is_some() {
            return Err(LinkError::AlreadySubscribed);
        }

        let sock = UdpSocket::bind(self.bind_addr).map_err(|source| LinkError::Bind {
            addr: self.bind_addr,
            source,
        })?;
        sock.set_read_timeout(Some(POLL_INTERVAL))?;
        let local = sock.local_addr()?;
        self.local_addr = Some(local);

        let filter = self.source_filter;
        let mode = filter.map_or_else(|| "qualquer origem".to_string(), |ip| ip.to_string());
        info!("Link de rádio escutando em {local} – Origem: {mode}");

        self.worker = Some(Worker::spawn("radio-link", move |running| {
            let mut buf = [0u8; MAX_FRAME_LEN];
            while running.load(Ordering::SeqCst) {
                match sock.recv_from(&mut buf) {
                    Ok((size, addr)) => {
                        if filter.is_some_and(|ip| ip != addr.ip()) {
                            debug!("Ignorando frame de {} (esperado: {mode})", addr.ip());
                            continue;
                        }
                        debug!("Frame de {addr}: {}", hex_dump(&buf[..size]));
                        on_frame(&buf[..size]);
                    }
                    Err(ref e)
                        if e.kind() == std::io::ErrorKind::TimedOut
                            || e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(e) => {
                        warn!("Erro ao receber frame: {e}");
                    }
                }
            }
            debug!("Link de rádio UDP encerrado");
        })?);
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            info!("Encerrando link de rádio UDP");
            worker.stop();
        }
    }
}

impl Drop for UdpRadioLink {
    fn drop(&mut self) {
        self.halt();
    }
}

// ──────────────────────────────────────────────
// Channel
// ──────────────────────────────────────────────

/// Link alimentado por um channel em memória.
pub struct ChannelRadioLink {
    frames: Option<Receiver<Vec<u8>>>,
    worker: Option<Worker>,
}

impl ChannelRadioLink {
    /// Cria o link e o lado emissor. O emissor falha após o `halt()`.
    pub fn channel(capacity: usize) -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = bounded(capacity);
        let link = Self {
            frames: Some(rx),
            worker: None,
        };
        (tx, link)
    }
}

impl RadioLink for ChannelRadioLink {
    fn subscribe(&mut self, mut on_frame: FrameCallback) -> Result<(), LinkError> {
        let frames = self.frames.take().ok_or(LinkError::AlreadySubscribed)?;

        self.worker = Some(Worker::spawn("radio-link", move |running| {
            while running.load(Ordering::SeqCst) {
                match frames.recv_timeout(POLL_INTERVAL) {
                    Ok(frame) => on_frame(&frame),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Link de rádio em memória encerrado");
        })?);
        Ok(())
    }

    fn halt(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        self.frames = None;
    }
}

impl Drop for ChannelRadioLink {
    fn drop(&mut self) {
        self.halt();
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
