//! Publisher resiliente: multipart + POST + retry com backoff linear.
//!
//! Regras:
//! - Falha de transporte consome uma tentativa, dorme o backoff atual e
//!   tenta de novo (1s, 2s, 3s…). Sem tentativas → [`PublishError::Exhausted`].
//! - Status != 200 encerra na hora com [`PublishError::Server`], sem retry.
//! - 200 em GET/POST/PUT → corpo JSON genérico; DELETE → sem corpo.

use crate::error::{PublishError, TransportError};
use crate::http::{OutgoingRequest, RawResponse, Transport};
use crate::multipart::MultipartBody;
use crate::types::{PublishRequest, RetryPolicy, ServerEndpoint};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Resultado de uma publicação bem-sucedida: corpo JSON, ou `None` em DELETE.
pub type PublishOutcome = Option<Value>;

/// Espera entre tentativas.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Dorme a thread atual.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Publica `request` em `endpoint` seguindo `policy`.
///
/// O contador de tentativas é local a cada chamada.
pub fn publish(
    transport: &dyn Transport,
    sleeper: &dyn Sleeper,
    endpoint: &ServerEndpoint,
    request: &PublishRequest,
    policy: &RetryPolicy,
) -> Result<PublishOutcome, PublishError> {
    let method = request.method;
    let path = request.path.as_str();
    debug!("HTTP {method} {path}");

    let multipart = method
        .sends_body()
        .then(|| MultipartBody::encode(&request.fields, &request.files));
    let headers = match &multipart {
        Some(mp) => vec![
            ("Content-Type", mp.content_type()),
            ("Content-Length", mp.content_length().to_string()),
        ],
        None => Vec::new(),
    };
    let outgoing = OutgoingRequest {
        method,
        path,
        headers: &headers,
        body: multipart.as_ref().map(|mp| mp.body.as_slice()),
    };

    info!("Conectando a '{endpoint}'");
    let response = send_with_retry(transport, sleeper, endpoint, &outgoing, policy)?;
    debug!("HTTP {} {}", response.status, response.reason);

    if response.status != 200 {
        error!(
            "Não foi possível {method} {path} ({} {})",
            response.status, response.reason
        );
        return Err(PublishError::Server {
            method,
            path: path.to_string(),
            status: response.status,
            reason: response.reason,
        });
    }

    if !method.expects_body() {
        return Ok(None);
    }
    parse_body(&response.body)
        .map(Some)
        .map_err(|source| PublishError::InvalidBody {
            method,
            path: path.to_string(),
            source,
        })
}

fn send_with_retry(
    transport: &dyn Transport,
    sleeper: &dyn Sleeper,
    endpoint: &ServerEndpoint,
    request: &OutgoingRequest<'_>,
    policy: &RetryPolicy,
) -> Result<RawResponse, PublishError> {
    let max = policy.max_attempts();
    let mut last_error = TransportError(String::from("nenhuma tentativa realizada"));

    for attempt in 1..=max {
        match transport.send(endpoint, request) {
            Ok(response) => return Ok(response),
            Err(e) => {
                let backoff = policy.backoff_after(attempt);
                warn!(
                    "{} '{}' falhou (tentativa {attempt}/{max}): {e}. Nova tentativa em {}s.",
                    request.method,
                    request.path,
                    backoff.as_secs_f64()
                );
                last_error = e;
                sleeper.sleep(backoff);
            }
        }
    }

    error!(
        "{} '{}' falhou após {max} tentativas.",
        request.method, request.path
    );
    Err(PublishError::Exhausted {
        method: request.method,
        path: request.path.to_string(),
        attempts: max,
        source: last_error,
    })
}

fn parse_body(body: &[u8]) -> Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}

/// Publisher ligado a um endpoint e uma política fixos.
pub struct Publisher<T: Transport, S: Sleeper> {
    endpoint: ServerEndpoint,
    policy: RetryPolicy,
    transport: T,
    sleeper: S,
}

impl<T: Transport, S: Sleeper> Publisher<T, S> {
    pub fn new(endpoint: ServerEndpoint, policy: RetryPolicy, transport: T, sleeper: S) -> Self {
        Self {
            endpoint,
            policy,
            transport,
            sleeper,
        }
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, PublishError> {
        publish(
            &self.transport,
            &self.sleeper,
            &self.endpoint,
            request,
            &self.policy,
        )
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::decode_form_fields;
    use crate::testing::{RecordingSleeper, ScriptedTransport, ok_json, status};
    use crate::types::{HttpMethod, Series};
    use serde_json::json;

    fn publisher(
        transport: &Arc<ScriptedTransport>,
        sleeper: &Arc<RecordingSleeper>,
        max_attempts: u32,
    ) -> Publisher<Arc<ScriptedTransport>, Arc<RecordingSleeper>> {
        Publisher::new(
            ServerEndpoint::new("localhost", 8080),
            RetryPolicy::new(max_attempts, Duration::from_secs(1)).unwrap(),
            Arc::clone(transport),
            Arc::clone(sleeper),
        )
    }

    fn value_request() -> PublishRequest {
        PublishRequest::datastream_value("attic1", Series::Temperature, "42".into())
    }

    #[test]
    fn success_on_first_attempt() {
        let transport = Arc::new(ScriptedTransport::new([ok_json(r#"{"ok":true}"#)]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let out = publisher(&transport, &sleeper, 3).publish(&value_request()).unwrap();

        assert_eq!(out, Some(json!({"ok": true})));
        assert_eq!(transport.attempts(), 1);
        assert_eq!(sleeper.total(), Duration::ZERO);
    }

    #[test]
    fn recovers_after_two_transport_failures() {
        let transport = Arc::new(ScriptedTransport::new([
            Err(TransportError("connection refused".into())),
            Err(TransportError("connection reset".into())),
            ok_json(r#"{"id":7}"#),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let out = publisher(&transport, &sleeper, 3).publish(&value_request()).unwrap();

        assert_eq!(out, Some(json!({"id": 7})));
        assert_eq!(transport.attempts(), 3);
        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(sleeper.total(), Duration::from_secs(3));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let transport = Arc::new(ScriptedTransport::new(
            (0..4).map(|i| Err(TransportError(format!("falha {i}")))),
        ));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = publisher(&transport, &sleeper, 3)
            .publish(&value_request())
            .unwrap_err();

        match err {
            PublishError::Exhausted {
                method,
                path,
                attempts,
                source,
            } => {
                assert_eq!(method, HttpMethod::Post);
                assert_eq!(path, "/datastream/attic1_temperature");
                assert_eq!(attempts, 3);
                assert_eq!(source, TransportError("falha 2".into()));
            }
            other => panic!("esperado Exhausted, obtido {other:?}"),
        }
        assert_eq!(transport.attempts(), 3);
        assert_eq!(sleeper.total(), Duration::from_secs(6));
    }

    #[test]
    fn server_error_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new([
            status(500, "Internal Server Error"),
            ok_json("{}"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = publisher(&transport, &sleeper, 3)
            .publish(&value_request())
            .unwrap_err();

        assert!(matches!(
            &err,
            PublishError::Server { status: 500, reason, .. } if reason == "Internal Server Error"
        ));
        assert_eq!(err.status(), Some(500));
        assert_eq!(transport.attempts(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[test]
    fn server_error_after_transport_failure_stops_immediately() {
        let transport = Arc::new(ScriptedTransport::new([
            Err(TransportError("timeout".into())),
            status(404, "Not Found"),
            ok_json("{}"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = publisher(&transport, &sleeper, 3)
            .publish(&value_request())
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(transport.attempts(), 2);
        assert_eq!(sleeper.total(), Duration::from_secs(1));
    }

    #[test]
    fn post_sends_multipart_with_headers() {
        let transport = Arc::new(ScriptedTransport::new([ok_json("{}")]));
        let sleeper = Arc::new(RecordingSleeper::default());

        publisher(&transport, &sleeper, 3).publish(&value_request()).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let req = &sent[0];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/datastream/attic1_temperature");

        let content_type = req.header("Content-Type").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let body = req.body.as_deref().unwrap();
        assert_eq!(
            req.header("Content-Length").unwrap(),
            body.len().to_string()
        );
        assert_eq!(
            decode_form_fields(boundary, body).unwrap(),
            value_request().fields
        );
    }

    #[test]
    fn get_sends_no_body() {
        let transport = Arc::new(ScriptedTransport::new([ok_json("[1,2,3]")]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let out = publisher(&transport, &sleeper, 3)
            .publish(&PublishRequest::new(HttpMethod::Get, "/datastream/attic1_fan"))
            .unwrap();

        assert_eq!(out, Some(json!([1, 2, 3])));
        let sent = transport.sent();
        assert!(sent[0].body.is_none());
        assert!(sent[0].headers.is_empty());
    }

    #[test]
    fn delete_returns_no_body() {
        let transport = Arc::new(ScriptedTransport::new([ok_json("ignored")]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let out = publisher(&transport, &sleeper, 3)
            .publish(&PublishRequest::new(HttpMethod::Delete, "/datastream/x"))
            .unwrap();

        assert_eq!(out, None);
    }

    #[test]
    fn empty_body_is_null() {
        let transport = Arc::new(ScriptedTransport::new([ok_json("")]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let out = publisher(&transport, &sleeper, 3)
            .publish(&PublishRequest::new(HttpMethod::Put, "/datastream/x"))
            .unwrap();

        assert_eq!(out, Some(Value::Null));
    }

    #[test]
    fn invalid_json_reported() {
        let transport = Arc::new(ScriptedTransport::new([ok_json("<html>")]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = publisher(&transport, &sleeper, 3)
            .publish(&value_request())
            .unwrap_err();

        assert!(matches!(err, PublishError::InvalidBody { .. }));
        assert_eq!(transport.attempts(), 1);
    }

    #[test]
    fn attempt_budget_is_per_call() {
        let transport = Arc::new(ScriptedTransport::new([
            Err(TransportError("a".into())),
            Err(TransportError("b".into())),
            ok_json("{}"),
            Err(TransportError("c".into())),
            Err(TransportError("d".into())),
            ok_json("{}"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let publisher = publisher(&transport, &sleeper, 3);

        assert!(publisher.publish(&value_request()).is_ok());
        assert!(publisher.publish(&value_request()).is_ok());
        assert_eq!(transport.attempts(), 6);
        // Backoff reinicia em 1s a cada chamada
        assert_eq!(
            sleeper.sleeps(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ]
        );
    }
}
