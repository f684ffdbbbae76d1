//! Transporte HTTP da API de datastreams.
//!
//! [`Transport`] separa "recebi uma resposta" (qualquer status) de
//! "não consegui completar a ida e volta" ([`TransportError`]). Só o
//! segundo caso é reenviado pelo publisher.

use crate::error::TransportError;
use crate::types::{HttpMethod, ServerEndpoint};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Limite do corpo de resposta lido do servidor.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// Resposta HTTP crua, qualquer status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

/// Requisição já codificada.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingRequest<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub headers: &'a [(&'a str, String)],
    pub body: Option<&'a [u8]>,
}

/// Uma ida e volta HTTP.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        endpoint: &ServerEndpoint,
        request: &OutgoingRequest<'_>,
    ) -> Result<RawResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(
        &self,
        endpoint: &ServerEndpoint,
        request: &OutgoingRequest<'_>,
    ) -> Result<RawResponse, TransportError> {
        (**self).send(endpoint, request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(
        &self,
        endpoint: &ServerEndpoint,
        request: &OutgoingRequest<'_>,
    ) -> Result<RawResponse, TransportError> {
        (**self).send(endpoint, request)
    }
}

/// Transporte real via `ureq`, HTTP/1.1 sem TLS.
///
/// Redirects não são seguidos: um 3xx volta como resposta e o publisher
/// o trata como erro do servidor.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(0)
            .build();
        Self { agent }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        endpoint: &ServerEndpoint,
        request: &OutgoingRequest<'_>,
    ) -> Result<RawResponse, TransportError> {
        let url = endpoint.url(request.path);
        debug!("HTTP {} {}", request.method, url);

        let mut req = self.agent.request(request.method.as_str(), &url);
        for (name, value) in request.headers {
            req = req.set(name, value);
        }

        let result = match request.body {
            Some(body) => req.send_bytes(body),
            None => req.call(),
        };

        // 4xx/5xx chegam como `Status`: é uma resposta, não falha de transporte
        let response = match result {
            Ok(resp) => resp,
            Err(ureq::Error::Status(_, resp)) => resp,
            Err(ureq::Error::Transport(t)) => return Err(TransportError(t.to_string())),
        };

        let status = response.status();
        let reason = response.status_text().to_string();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)?;

        debug!("HTTP {} {}", status, reason);
        Ok(RawResponse {
            status,
            reason,
            body,
        })
    }
}
