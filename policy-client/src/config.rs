use crate::attributes::AttributeBag;
use crate::status::{Code, ErrorCause, Status};
use crate::status_util::{transport_result, TransportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVICE_CONFIG_CACHE_SIZE: u64 = 1000;
pub const DEFAULT_SERVICE_CONTROL_TIMEOUT_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to do with a request when the policy service can't be reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkFailPolicy {
    #[default]
    FailOpen,
    FailClose,
}

impl NetworkFailPolicy {
    /// Decides whether a request with the given check outcome is let through.
    ///
    /// Only network-level failures of the policy service are subject to the
    /// policy; any verdict the service (or this client) reached is final.
    pub fn admits(&self, status: &Status) -> bool {
        if status.is_ok() {
            return true;
        }

        let network_failure = status.cause() == ErrorCause::ServiceControl
            && (matches!(
                transport_result(status),
                TransportResult::SendError | TransportResult::ResponseTimeout
            ) || matches!(status.code(), Code::Unavailable | Code::DeadlineExceeded));

        network_failure && *self == NetworkFailPolicy::FailOpen
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub network_fail_policy: NetworkFailPolicy,
    pub service_control_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            network_fail_policy: NetworkFailPolicy::default(),
            service_control_url: None,
            timeout_ms: DEFAULT_SERVICE_CONTROL_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRule {
    pub quota: String,
    #[serde(default = "default_charge")]
    pub charge: i64,
}

fn default_charge() -> i64 {
    1
}

/// Per-service policy settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub disable_check_calls: bool,
    pub mixer_attributes: AttributeBag,
    pub forward_attributes: AttributeBag,
    pub quota_spec: Vec<QuotaRule>,
    pub network_fail_policy: Option<NetworkFailPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub default_destination_service: String,
    pub service_configs: HashMap<String, ServiceConfig>,
    pub mixer_attributes: AttributeBag,
    pub forward_attributes: AttributeBag,
    pub transport: TransportConfig,
    pub service_config_cache_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_destination_service: String::new(),
            service_configs: HashMap::new(),
            mixer_attributes: AttributeBag::default(),
            forward_attributes: AttributeBag::default(),
            transport: TransportConfig::default(),
            service_config_cache_size: DEFAULT_SERVICE_CONFIG_CACHE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let f = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ClientConfig = serde_yaml::from_reader(f)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.service_configs.is_empty()
            && !self.default_destination_service.is_empty()
            && !self
                .service_configs
                .contains_key(&self.default_destination_service)
        {
            return Err(ConfigError::Invalid(format!(
                "default destination service '{}' has no service config",
                self.default_destination_service
            )));
        }

        if self.service_config_cache_size == 0 {
            return Err(ConfigError::Invalid(
                "service_config_cache_size must be greater than 0".to_string(),
            ));
        }

        if let Some(url) = &self.transport.service_control_url {
            if let Err(e) = url::Url::parse(url) {
                return Err(ConfigError::Invalid(format!(
                    "service control url '{url}': {e}"
                )));
            }
        }

        Ok(())
    }
}
