//! Server configuration
//!
//! Layered as built-in defaults, then an optional config file (`config.toml`,
//! `config.yaml`, ... or the path in `CONFIG_FILE`), then environment
//! variables prefixed with `AYUSH` using `__` as the section separator, e.g.
//! `AYUSH__SERVER__PORT=8081`. A `.env` file is read first when present.

use crate::models::Icd11Module;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub terminology: TerminologyConfig,
    pub icd11: Icd11Config,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL; canonical URLs of generated resources derive from it
    pub base_url: String,
    pub cors_origins: Vec<String>,
    pub max_request_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: "http://localhost:8080/fhir".to_string(),
            cors_origins: vec!["*".to_string()],
            max_request_body_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
    pub opentelemetry_enabled: bool,
    pub otlp_endpoint: String,
    pub otlp_timeout_seconds: u64,
    pub trace_sample_ratio: f64,
    pub service_name: String,
    pub service_version: Option<String>,
    pub deployment_environment: String,
    /// Emit audit events on the `audit` target
    pub audit_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "terminology-server".to_string(),
            file_rotation: "daily".to_string(),
            opentelemetry_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            otlp_timeout_seconds: 10,
            trace_sample_ratio: 1.0,
            service_name: "ayush-terminology".to_string(),
            service_version: None,
            deployment_environment: "development".to_string(),
            audit_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminologyConfig {
    pub namaste_system: String,
    pub namaste_version: String,
    /// ICD-11 Biomedicine (MMS)
    pub icd11_system: String,
    pub tm2_system: String,
    pub namaste_csv_path: String,
    /// Optional ICD-11 seed catalog loaded after the NAMASTE CSV
    pub icd11_csv_path: Option<String>,
    pub load_on_startup: bool,
}

impl Default for TerminologyConfig {
    fn default() -> Self {
        Self {
            namaste_system: "http://terminology.ayush.gov.in/CodeSystem/namaste".to_string(),
            namaste_version: "1.0".to_string(),
            icd11_system: "http://id.who.int/icd11/mms".to_string(),
            tm2_system: "http://id.who.int/icd11/tm2".to_string(),
            namaste_csv_path: "data/namaste_codes.csv".to_string(),
            icd11_csv_path: None,
            load_on_startup: true,
        }
    }
}

/// The code system URIs shared by every service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSystems {
    pub namaste: String,
    pub namaste_version: String,
    pub tm2: String,
    pub biomedicine: String,
}

impl CodeSystems {
    pub fn module_system(&self, module: Icd11Module) -> &str {
        match module {
            Icd11Module::Tm2 => &self.tm2,
            Icd11Module::Biomedicine => &self.biomedicine,
        }
    }

    /// `"TM2"` selects the TM2 system; anything else selects Biomedicine
    pub fn resolve_hint(&self, hint: &str) -> &str {
        if hint == "TM2" {
            &self.tm2
        } else {
            &self.biomedicine
        }
    }
}

impl From<&TerminologyConfig> for CodeSystems {
    fn from(t: &TerminologyConfig) -> Self {
        Self {
            namaste: t.namaste_system.clone(),
            namaste_version: t.namaste_version.clone(),
            tm2: t.tm2_system.clone(),
            biomedicine: t.icd11_system.clone(),
        }
    }
}

impl Default for CodeSystems {
    fn default() -> Self {
        Self::from(&TerminologyConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Icd11Config {
    pub enabled: bool,
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub tm2_endpoint: String,
    pub biomedicine_endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for Icd11Config {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://id.who.int/icd/release/11".to_string(),
            token_url: "https://icdaccessmanagement.who.int/connect/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            tm2_endpoint: "https://id.who.int/icd/release/11/2019-04/mms/tm2".to_string(),
            biomedicine_endpoint: "https://id.who.int/icd/release/11/2019-04/mms".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub token_refresh_interval_seconds: u64,
    pub icd11_sync_interval_seconds: u64,
    /// Periodic automatic mapping generation; disabled when unset
    pub mapping_generation_interval_seconds: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            token_refresh_interval_seconds: 3600,
            icd11_sync_interval_seconds: 86400,
            mapping_generation_interval_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, optional file and environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let file = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config".to_string());

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("AYUSH")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if self.server.base_url.trim().is_empty() {
            anyhow::bail!("server.base_url must not be empty");
        }

        let t = &self.terminology;
        for (name, uri) in [
            ("terminology.namaste_system", &t.namaste_system),
            ("terminology.icd11_system", &t.icd11_system),
            ("terminology.tm2_system", &t.tm2_system),
        ] {
            if uri.trim().is_empty() {
                anyhow::bail!("{name} must not be empty");
            }
        }
        if t.namaste_system == t.icd11_system
            || t.namaste_system == t.tm2_system
            || t.icd11_system == t.tm2_system
        {
            anyhow::bail!("code system URIs must be distinct");
        }

        if self.icd11.enabled
            && (self.icd11.client_id.is_empty() || self.icd11.client_secret.is_empty())
        {
            anyhow::bail!("icd11.client_id and icd11.client_secret are required when icd11.enabled");
        }
        if self.scheduler.token_refresh_interval_seconds == 0
            || self.scheduler.icd11_sync_interval_seconds == 0
            || self.scheduler.mapping_generation_interval_seconds == Some(0)
        {
            anyhow::bail!("scheduler intervals must be non-zero");
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }

    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {addr}: {e}"))
    }

    pub fn code_systems(&self) -> CodeSystems {
        CodeSystems::from(&self.terminology)
    }
}
