//! Configuração unificada via TOML.
//!
//! Um único `relay.toml` com servidor, retry, sensor e link de rádio.

use crate::error::ConfigError;
use crate::types::{RetryPolicy, ServerEndpoint};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Servidor de telemetria (API de datastreams).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host do servidor
    pub host: String,
    /// Porta HTTP
    pub port: u16,
    /// Timeout de cada tentativa (segundos)
    pub timeout_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "bot.sud.to".into(),
            port: 80,
            timeout_secs: 10.0,
        }
    }
}

/// Retry de falhas de transporte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total de tentativas por publicação
    pub max_attempts: u32,
    /// Primeiro backoff (segundos); cresce 1s por falha
    pub initial_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_secs: 1,
        }
    }
}

/// Sensor remoto e suas séries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Prefixo das séries: `/datastream/<name>_<série>`
    pub name: String,
    /// Emite `PUT` de cada datastream ao iniciar
    pub register_datastreams: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            name: "attic1fan".into(),
            register_datastreams: false,
        }
    }
}

/// Link de rádio (bridge serial → UDP).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// IP local para bind
    pub bind_ip: String,
    /// Porta UDP
    pub port: u16,
    /// IP da bridge (vazio = qualquer origem)
    pub source_ip: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".into(),
            port: 9750,
            source_ip: String::new(),
        }
    }
}

impl LinkConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.bind_ip.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn source_filter(&self) -> Result<Option<IpAddr>, std::net::AddrParseError> {
        if self.source_ip.is_empty() {
            return Ok(None);
        }
        self.source_ip.parse().map(Some)
    }
}

/// Configuração raiz.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub retry: RetryConfig,
    pub sensor: SensorConfig,
    pub link: LinkConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_err = |reason: String| ConfigError::Save {
            path: path.display().to_string(),
            reason,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_err(e.to_string()))?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do relay.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("relay.toml")
    }

    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.server.host.clone(), self.server.port)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.initial_backoff_secs),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.server.timeout_secs)
    }

    /// Caminho do config a partir dos argumentos do processo.
    ///
    /// Aceita `--config <path>`, `-c <path>` ou o primeiro argumento
    /// posicional; sem nenhum deles usa [`AppConfig::default_path`].
    pub fn path_from_args<I>(args: I) -> PathBuf
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().skip(1).collect();

        if let Some(i) = args.iter().position(|a| a == "--config" || a == "-c") {
            if let Some(path) = args.get(i + 1) {
                return PathBuf::from(path);
            }
        }
        match args.first() {
            Some(first) if !first.starts_with('-') => PathBuf::from(first),
            _ => Self::default_path(),
        }
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server.host.trim().is_empty() {
            errors.push("Host do servidor não pode ser vazio".into());
        }
        if self.server.port == 0 {
            errors.push("Porta do servidor não pode ser 0".into());
        }
        if !(0.5..=300.0).contains(&self.server.timeout_secs) {
            errors.push(format!(
                "Timeout do servidor inválido: {} (0.5–300.0)",
                self.server.timeout_secs
            ));
        }
        if let Err(e) = self.retry_policy() {
            errors.push(e.to_string());
        }
        if self.sensor.name.is_empty() || self.sensor.name.contains(['/', ' ']) {
            errors.push(format!("Nome do sensor inválido: '{}'", self.sensor.name));
        }
        if let Err(e) = self.link.bind_addr() {
            errors.push(format!("IP de bind inválido '{}': {e}", self.link.bind_ip));
        }
        if let Err(e) = self.link.source_filter() {
            errors.push(format!("IP de origem inválido '{}': {e}", self.link.source_ip));
        }

        errors
    }
}
