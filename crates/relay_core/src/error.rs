//! Taxonomia de erros do relay.
//!
//! - [`DecodeError`] – frame curto demais, recuperável (frame descartado)
//! - [`TransportError`] – falha de conexão/IO numa tentativa, reenviável
//! - [`PublishError`] – falha terminal de uma publicação, sobe ao chamador
//! - [`LinkError`] / [`RelayError`] – ciclo de vida do link de rádio

use crate::types::HttpMethod;
use std::net::SocketAddr;

/// Erros de decodificação de frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Frame malformado ({len} bytes, mínimo {min})")]
    MalformedFrame { len: usize, min: usize },
}

/// Falha de transporte numa única tentativa (conexão, timeout, IO).
///
/// Nunca representa um status HTTP recebido.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// Falhas terminais de uma publicação.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("{method} '{path}' falhou após {attempts} tentativas: {source}")]
    Exhausted {
        method: HttpMethod,
        path: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("{method} '{path}' rejeitado pelo servidor ({status} {reason})")]
    Server {
        method: HttpMethod,
        path: String,
        status: u16,
        reason: String,
    },

    #[error("{method} '{path}' retornou corpo inválido: {source}")]
    InvalidBody {
        method: HttpMethod,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PublishError {
    /// Status HTTP, quando a falha veio do servidor.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Erros de configuração.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Política de retry inválida: max_attempts deve ser >= 1 (recebido {0})")]
    InvalidRetry(u32),

    #[error("Erro ao salvar {path}: {reason}")]
    Save { path: String, reason: String },
}

/// Erros do link de rádio.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Falha ao bind em {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Link já possui um callback registrado")]
    AlreadySubscribed,

    #[error("Erro de IO do link: {0}")]
    Io(#[from] std::io::Error),
}

/// Erros do ciclo de vida do relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Transição inválida: relay está em {0:?}")]
    InvalidState(crate::orchestrator::RelayState),

    #[error("Falha ao abrir link de rádio: {0}")]
    Link(#[from] LinkError),
}
