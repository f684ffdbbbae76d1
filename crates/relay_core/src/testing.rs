//! Dublês de teste para transporte e backoff.

use crate::error::TransportError;
use crate::http::{OutgoingRequest, RawResponse, Transport};
use crate::publisher::Sleeper;
use crate::types::{HttpMethod, ServerEndpoint};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

pub type Scripted = Result<RawResponse, TransportError>;

pub fn ok_json(body: &str) -> Scripted {
    Ok(RawResponse {
        status: 200,
        reason: "OK".into(),
        body: body.as_bytes().to_vec(),
    })
}

pub fn status(code: u16, reason: &str) -> Scripted {
    Ok(RawResponse {
        status: code,
        reason: reason.into(),
        body: Vec::new(),
    })
}

/// Requisição registrada pelo [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Responde na ordem do roteiro; roteiro esgotado vira falha de transporte.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_paths(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.path).collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        _endpoint: &ServerEndpoint,
        request: &OutgoingRequest<'_>,
    ) -> Result<RawResponse, TransportError> {
        self.sent.lock().unwrap().push(SentRequest {
            method: request.method,
            path: request.path.to_string(),
            headers: request
                .headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            body: request.body.map(<[u8]>::to_vec),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("roteiro esgotado".into())))
    }
}

/// Registra os backoffs sem dormir.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
