// POLICY_CONFIG_FILE: Path
//
// SERVICE_CONTROL_URL: String, overrides transport.service_control_url
// SERVICE_CONTROL_TIMEOUT_MS: u64, overrides transport.timeout_ms
//
// NODE_UID: String
// NODE_NAMESPACE: String
// NODE_IP: String

use policy_client::LocalNode;
use std::env;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EnvConfigError {
    #[error("no policy config file provided, please set POLICY_CONFIG_FILE")]
    MissingConfigFile,
    #[error("expected a number of milliseconds in SERVICE_CONTROL_TIMEOUT_MS, got '{0}'")]
    InvalidTimeout(String),
}

#[derive(Debug)]
pub struct Configuration {
    pub config_file: String,
    pub service_control_url: Option<String>,
    pub service_control_timeout_ms: Option<u64>,
    pub node: LocalNode,
}

impl Configuration {
    pub fn from_env() -> Result<Self, EnvConfigError> {
        let config_file =
            env::var("POLICY_CONFIG_FILE").map_err(|_| EnvConfigError::MissingConfigFile)?;

        let service_control_timeout_ms = match env::var("SERVICE_CONTROL_TIMEOUT_MS") {
            Ok(value) => Some(
                value
                    .parse()
                    .map_err(|_| EnvConfigError::InvalidTimeout(value))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            config_file,
            service_control_url: env::var("SERVICE_CONTROL_URL").ok(),
            service_control_timeout_ms,
            node: LocalNode {
                uid: env::var("NODE_UID").unwrap_or_default(),
                namespace: env::var("NODE_NAMESPACE").unwrap_or_default(),
                ip: env::var("NODE_IP").unwrap_or_default(),
            },
        })
    }

    pub fn with(
        config_file: String,
        service_control_url: Option<String>,
        service_control_timeout_ms: Option<u64>,
        node: LocalNode,
    ) -> Self {
        Self {
            config_file,
            service_control_url,
            service_control_timeout_ms,
            node,
        }
    }
}
