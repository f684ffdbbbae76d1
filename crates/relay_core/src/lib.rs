//! # Relay Core
//!
//! Repassa leituras de um sensor remoto (rádio) para a API de
//! datastreams via HTTP, tolerando falhas transitórias de rede.
//!
//! ## Módulos
//! - [`types`] – Leitura, endpoint, política de retry, requisições
//! - [`protocol`] – Decodificação dos frames do sensor
//! - [`multipart`] – Codificação `multipart/form-data`
//! - [`http`] – Transporte HTTP (`ureq`)
//! - [`publisher`] – Publicação com retry e backoff linear
//! - [`radio`] – Interface do link de rádio (UDP, channel)
//! - [`orchestrator`] – Ciclo de vida do relay
//! - [`config`] – Configuração unificada via TOML
//! - [`error`] – Taxonomia de erros

pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod orchestrator;
pub mod protocol;
pub mod publisher;
pub mod radio;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports convenientes
pub use config::AppConfig;
pub use error::{DecodeError, PublishError, RelayError, TransportError};
pub use http::{HttpTransport, Transport};
pub use orchestrator::{FrameOutcome, Relay, RelayState, RelayStats};
pub use protocol::decode_frame;
pub use publisher::{Publisher, Sleeper, ThreadSleeper, publish};
pub use radio::{ChannelRadioLink, RadioLink, UdpRadioLink};
pub use types::{HttpMethod, PublishRequest, Reading, RetryPolicy, Series, ServerEndpoint};
