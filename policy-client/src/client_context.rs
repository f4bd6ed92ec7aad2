use crate::attributes::{AttributeBag, LocalAttributes, LocalNode, CONTEXT_REPORTER_KIND};
use crate::config::{ClientConfig, NetworkFailPolicy, ServiceConfig};
use crate::service_context::ServiceContext;
use crate::service_control::ServiceControlClient;
use moka::sync::Cache;
use std::sync::Arc;

/// Value of `context.reporter.kind` marking a proxy that handles outbound
/// traffic.
pub const OUTBOUND_REPORTER_KIND: &str = "outbound";

/// Per-proxy policy state, built once from the client configuration.
///
/// Everything but the service context cache is immutable after
/// construction, so a single instance can be shared by every worker.
pub struct ClientContext {
    config: ClientConfig,
    service_config_cache_size: u64,
    local_attributes: LocalAttributes,
    outbound: bool,
    service_control: Option<Arc<dyn ServiceControlClient>>,
    service_contexts: Cache<String, Arc<ServiceContext>>,
}

impl ClientContext {
    pub fn new(config: ClientConfig, local_node: &LocalNode) -> Self {
        let outbound = is_outbound(&config.mixer_attributes);
        let service_config_cache_size = config.service_config_cache_size;
        Self::with(
            config,
            service_config_cache_size,
            LocalAttributes::from_node(local_node),
            outbound,
        )
    }

    pub fn with(
        config: ClientConfig,
        service_config_cache_size: u64,
        local_attributes: LocalAttributes,
        outbound: bool,
    ) -> Self {
        // A zero-capacity cache would hand out a fresh context on every lookup.
        let service_config_cache_size = service_config_cache_size.max(1);
        Self {
            config,
            service_config_cache_size,
            local_attributes,
            outbound,
            service_control: None,
            service_contexts: Cache::new(service_config_cache_size),
        }
    }

    /// Wires the client used for the services that enforce policy.
    pub fn with_service_control(mut self, client: Arc<dyn ServiceControlClient>) -> Self {
        self.service_control = Some(client);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_outbound(&self) -> bool {
        self.outbound
    }

    pub fn service_config_cache_size(&self) -> u64 {
        self.service_config_cache_size
    }

    pub fn network_fail_policy(&self) -> NetworkFailPolicy {
        self.config.transport.network_fail_policy
    }

    /// Resolves the name of the service a request targets. Empty or unknown
    /// names resolve to the default destination service.
    pub fn service_name<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() || !self.config.service_configs.contains_key(requested) {
            return &self.config.default_destination_service;
        }
        requested
    }

    pub fn service_config(&self, service_name: &str) -> Option<&ServiceConfig> {
        self.config.service_configs.get(service_name)
    }

    pub fn add_local_node_attributes(&self, attributes: &mut AttributeBag) {
        if self.outbound {
            attributes.merge_from(&self.local_attributes.outbound);
        } else {
            attributes.merge_from(&self.local_attributes.inbound);
        }
    }

    pub fn add_local_node_forward_attributes(&self, attributes: &mut AttributeBag) {
        if self.outbound {
            attributes.merge_from(&self.local_attributes.forward);
        }
    }

    /// Returns the shared context of the service `requested` resolves to,
    /// creating it on first use.
    pub fn service_context(&self, requested: &str) -> Arc<ServiceContext> {
        let service_name = self.service_name(requested).to_string();

        self.service_contexts.get_with(service_name.clone(), || {
            debug!("Creating service context for '{}'", service_name);
            Arc::new(ServiceContext::new(
                service_name.as_str(),
                self.service_config(&service_name),
                &self.config,
                self.service_control.clone(),
            ))
        })
    }
}

fn is_outbound(mixer_attributes: &AttributeBag) -> bool {
    mixer_attributes.get_str(CONTEXT_REPORTER_KIND) == Some(OUTBOUND_REPORTER_KIND)
}
