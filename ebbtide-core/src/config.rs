//! Server configuration.
//!
//! The configuration file is TOML. Its logical structure follows the
//! service/resource split of the protocol: `discovery_server` and
//! `api_root_server` list the HTTP services to mount, and the
//! `*_resources` maps hold the resource records those services serve,
//! keyed by `resource_id`.
//!
//! [`ServerConfig::verify`] checks the whole file before any route is
//! registered, logging every problem it finds and failing with the
//! aggregate count. Startup must not proceed past a broken configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::error;

use crate::entities::{ApiRoot, Collection, Discovery};

/// Configuration loading or verification error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] Box<toml::de::Error>),

    #[error("The configuration has {0} error(s)")]
    Invalid(usize),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub global: GlobalConfig,
    pub logging: LoggingConfig,
    pub html: HtmlConfig,
    pub authentication: AuthConfig,
    pub discovery_server: DiscoveryServer,
    pub api_root_server: ApiRootServer,

    /// Discovery resources, keyed by resource id.
    pub discovery_resources: HashMap<String, Discovery>,

    /// APIRoot resources, keyed by resource id.
    pub api_root_resources: HashMap<String, ApiRoot>,

    /// Collection resources, keyed by resource id.
    pub collection_resources: HashMap<String, Collection>,
}

/// Global section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Listen address, e.g. "127.0.0.1:8000".
    pub listen: String,

    /// "http" or "https".
    pub protocol: String,

    /// Installation prefix all relative paths hang off of. Must end in '/'.
    pub prefix: String,

    /// TLS material directory relative to the prefix. Must end in '/'.
    pub tls_dir: String,
    pub tls_key: String,
    pub tls_crt: String,

    /// Database backend selector. Only "sqlite3" is supported.
    pub db_type: String,

    /// Database file relative to the prefix.
    pub db_file: String,

    /// Maximum number of records the server will return per page.
    pub server_record_limit: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_string(),
            protocol: "http".to_string(),
            prefix: "./".to_string(),
            tls_dir: "etc/tls/".to_string(),
            tls_key: String::new(),
            tls_crt: String::new(),
            db_type: "sqlite3".to_string(),
            db_file: "ebbtide.db".to_string(),
            server_record_limit: 100,
        }
    }
}

impl GlobalConfig {
    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.prefix, self.db_file))
    }

    /// Full path of the TLS certificate file.
    pub fn tls_crt_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.prefix, self.tls_dir, self.tls_crt))
    }

    /// Full path of the TLS key file.
    pub fn tls_key_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}{}", self.prefix, self.tls_dir, self.tls_key))
    }
}

/// Logging section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log to `log_file` instead of stderr.
    pub enabled: bool,

    /// Verbosity: 1 info, 5 debug, 10 trace.
    pub level: u8,

    pub log_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: 3,
            log_file: String::new(),
        }
    }
}

/// HTML output section. Services inherit this unless they override it.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HtmlConfig {
    pub enabled: bool,

    /// Template directory relative to the prefix. Must end in '/'.
    pub template_dir: String,
}

/// Authentication section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,

    /// Whether HTTP Basic is accepted. No other scheme is implemented.
    pub basic: bool,

    /// Principal allow list: username -> password.
    pub accounts: HashMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert("taxii".to_string(), "password".to_string());
        Self {
            enabled: false,
            basic: true,
            accounts,
        }
    }
}

/// Discovery server section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DiscoveryServer {
    pub enabled: bool,
    pub services: Vec<DiscoveryService>,
}

/// One discovery service instance.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DiscoveryService {
    pub enabled: bool,

    /// URL path. Must start and end with '/'.
    pub path: String,

    /// Key into `discovery_resources`.
    pub resource_id: String,

    /// HTML override for this service.
    pub html: Option<HtmlConfig>,
}

/// API root server section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiRootServer {
    pub enabled: bool,
    pub services: Vec<ApiRootService>,
}

/// One api-root service instance.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiRootService {
    pub enabled: bool,

    /// URL path. Must start and end with '/'.
    pub path: String,

    /// Key into `api_root_resources`.
    pub resource_id: String,

    /// HTML override for this service.
    pub html: Option<HtmlConfig>,

    pub collections: CollectionsService,
}

/// Collections block of an api-root service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CollectionsService {
    pub enabled: bool,

    /// Collection resource ids with GET access under this root.
    pub read_access: Vec<String>,

    /// Collection resource ids with POST access under this root.
    pub write_access: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(Box::new)?;
        Ok(config)
    }

    /// Verify the configuration.
    ///
    /// Every problem is logged individually; the error carries the total.
    pub fn verify(&self) -> Result<(), ConfigError> {
        let mut problems = self.verify_global();

        if self.discovery_server.enabled {
            problems += self.verify_discovery();
        }

        if self.api_root_server.enabled {
            problems += self.verify_api_roots();
        }

        if problems > 0 {
            error!(problems, "configuration verification failed");
            return Err(ConfigError::Invalid(problems));
        }
        Ok(())
    }

    fn verify_global(&self) -> usize {
        let mut problems = 0;
        let g = &self.global;

        if g.protocol != "http" && g.protocol != "https" {
            error!("the global.protocol directive must be either https or http");
            problems += 1;
        }

        if g.protocol == "https" {
            problems += self.verify_tls();
        }

        if g.listen.is_empty() {
            error!("the global.listen directive is missing");
            problems += 1;
        }

        if g.prefix.is_empty() {
            error!("the global.prefix directive is missing");
            problems += 1;
        } else if !g.prefix.ends_with('/') {
            error!("the global.prefix directive is missing the ending slash '/'");
            problems += 1;
        }

        if g.db_type.is_empty() {
            error!("the global.db_type directive is missing");
            problems += 1;
        }

        if g.db_file.is_empty() {
            error!("the global.db_file directive is missing");
            problems += 1;
        }

        if self.logging.enabled && self.logging.log_file.is_empty() {
            error!("the logging.log_file directive is missing");
            problems += 1;
        }

        if self.html.enabled && self.html.template_dir.is_empty() {
            error!("the html.template_dir directive is missing");
            problems += 1;
        }

        problems
    }

    fn verify_tls(&self) -> usize {
        let mut problems = 0;
        let g = &self.global;

        if g.tls_dir.is_empty() {
            error!("the global.tls_dir directive is missing");
            problems += 1;
        } else if !g.tls_dir.ends_with('/') {
            error!("the global.tls_dir directive is missing the ending slash '/'");
            problems += 1;
        }

        if g.tls_crt.is_empty() {
            error!("the global.tls_crt directive is missing");
            problems += 1;
        } else if !g.tls_crt_path().exists() {
            error!(path = %g.tls_crt_path().display(), "the TLS cert file can not be opened");
            problems += 1;
        }

        if g.tls_key.is_empty() {
            error!("the global.tls_key directive is missing");
            problems += 1;
        } else if !g.tls_key_path().exists() {
            error!(path = %g.tls_key_path().display(), "the TLS key file can not be opened");
            problems += 1;
        }

        problems
    }

    fn verify_discovery(&self) -> usize {
        let mut problems = 0;
        let mut service_enabled = false;

        for service in &self.discovery_server.services {
            if service.enabled {
                service_enabled = true;
            }

            problems += verify_service_path("discovery", &service.path);

            if !self.discovery_resources.contains_key(&service.resource_id) {
                error!(
                    resource_id = %service.resource_id,
                    "a discovery service references a discovery resource that is missing"
                );
                problems += 1;
            }
        }

        if !service_enabled {
            error!("the discovery server is enabled but no discovery service is enabled");
            problems += 1;
        }

        problems
    }

    fn verify_api_roots(&self) -> usize {
        let mut problems = 0;
        let mut service_enabled = false;

        for service in &self.api_root_server.services {
            if service.enabled {
                service_enabled = true;
            }

            problems += verify_service_path("api-root", &service.path);

            if !self.api_root_resources.contains_key(&service.resource_id) {
                error!(
                    resource_id = %service.resource_id,
                    "an api-root service references an api-root resource that is missing"
                );
                problems += 1;
            }

            if service.collections.enabled {
                for access in [
                    &service.collections.read_access,
                    &service.collections.write_access,
                ] {
                    for resource_id in access {
                        if !self.collection_resources.contains_key(resource_id) {
                            error!(
                                resource_id = %resource_id,
                                "an api-root references a collection resource that is missing"
                            );
                            problems += 1;
                        }
                    }
                }
            }
        }

        if !service_enabled {
            error!("the api-root server is enabled but no api-root service is enabled");
            problems += 1;
        }

        problems
    }

    /// Effective HTML configuration for a service: the service override if
    /// set, otherwise the global section.
    pub fn effective_html<'a>(&'a self, service_html: Option<&'a HtmlConfig>) -> &'a HtmlConfig {
        service_html.unwrap_or(&self.html)
    }
}

fn verify_service_path(kind: &str, path: &str) -> usize {
    let mut problems = 0;
    if path.is_empty() {
        error!(kind, "a service is missing the 'path' directive");
        problems += 1;
    } else {
        if !path.starts_with('/') {
            error!(kind, path, "service path is missing the starting slash '/'");
            problems += 1;
        }
        if !path.ends_with('/') {
            error!(kind, path, "service path is missing the ending slash '/'");
            problems += 1;
        }
    }
    problems
}
