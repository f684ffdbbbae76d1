//! Tipos do relay: leituras, endpoint, política de retry e requisições.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ──────────────────────────────────────────────
// Leitura
// ──────────────────────────────────────────────

/// Série (canal de medição) publicada no servidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Series {
    Temperature,
    Humidity,
    Fan,
}

impl Series {
    /// Ordem fixa de publicação.
    pub const ALL: [Series; 3] = [Series::Temperature, Series::Humidity, Series::Fan];

    pub fn as_str(self) -> &'static str {
        match self {
            Series::Temperature => "temperature",
            Series::Humidity => "humidity",
            Series::Fan => "fan",
        }
    }

    /// Caminho do datastream: `/datastream/<sensor>_<série>`.
    pub fn datastream_path(self, sensor_name: &str) -> String {
        format!("/datastream/{}_{}", sensor_name, self.as_str())
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leitura decodificada de um frame do sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Identificador do sensor (ex: "attic1")
    pub sensor_name: String,
    /// Temperatura (°C), um byte sem sinal
    pub temperature_c: u8,
    /// Umidade relativa (%RH), um byte sem sinal
    pub humidity_percent: u8,
    /// Estado do ventilador (sem sensor ainda, sempre `false`)
    pub fan_on: bool,
}

impl Reading {
    /// Valor textual de uma série, no formato aceito pelo servidor.
    pub fn value_of(&self, series: Series) -> String {
        match series {
            Series::Temperature => self.temperature_c.to_string(),
            Series::Humidity => self.humidity_percent.to_string(),
            Series::Fan => String::from(if self.fan_on { "True" } else { "False" }),
        }
    }

    /// Pares (série, valor) na ordem de publicação.
    pub fn series_values(&self) -> impl Iterator<Item = (Series, String)> + '_ {
        Series::ALL.into_iter().map(|s| (s, self.value_of(s)))
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} T:{}°C, RH:{}%RH, Fan:{}",
            self.sensor_name, self.temperature_c, self.humidity_percent, self.fan_on
        )
    }
}

// ──────────────────────────────────────────────
// Servidor
// ──────────────────────────────────────────────

/// Endereço do servidor de telemetria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URL completa para um caminho absoluto.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Política de retry imutável.
///
/// Backoff linear: começa em `initial_backoff` e cresce 1s por falha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// Incremento do backoff a cada tentativa falha.
    pub const BACKOFF_STEP: Duration = Duration::from_secs(1);

    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(max_attempts));
        }
        Ok(Self {
            max_attempts,
            initial_backoff,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Espera após a falha número `failed` (1-based).
    pub fn backoff_after(&self, failed: u32) -> Duration {
        self.initial_backoff + Self::BACKOFF_STEP * failed.saturating_sub(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

// ──────────────────────────────────────────────
// Requisição
// ──────────────────────────────────────────────

/// Métodos aceitos pela API de datastreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// POST e PUT enviam corpo multipart.
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }

    /// DELETE não retorna corpo.
    pub fn expects_body(self) -> bool {
        !matches!(self, HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arquivo anexado a um campo multipart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Uma chamada à API. Construída e descartada a cada publicação.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub method: HttpMethod,
    pub path: String,
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, FileAttachment>,
}

impl PublishRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            fields: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: FileAttachment) -> Self {
        self.files.insert(name.into(), file);
        self
    }

    /// `POST /datastream/<sensor>_<série>` com o campo `value`.
    pub fn datastream_value(sensor_name: &str, series: Series, value: String) -> Self {
        Self::new(HttpMethod::Post, series.datastream_path(sensor_name)).with_field("value", value)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
