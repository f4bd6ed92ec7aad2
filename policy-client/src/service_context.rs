use crate::attributes::AttributeBag;
use crate::config::{ClientConfig, NetworkFailPolicy, ServiceConfig};
use crate::service_control::ServiceControlClient;
use crate::status::Status;
use std::sync::Arc;

/// Policy state shared by every request targeting one service.
pub struct ServiceContext {
    service_name: String,
    config: ServiceConfig,
    static_attributes: AttributeBag,
    forward_attributes: AttributeBag,
    network_fail_policy: NetworkFailPolicy,
    service_control: Option<Arc<dyn ServiceControlClient>>,
}

impl ServiceContext {
    /// Builds the context for `service_name`. The client is dropped when the
    /// service config disables check calls.
    pub fn new(
        service_name: impl Into<String>,
        config: Option<&ServiceConfig>,
        client_config: &ClientConfig,
        service_control: Option<Arc<dyn ServiceControlClient>>,
    ) -> Self {
        let config = config.cloned().unwrap_or_default();

        let mut static_attributes = client_config.mixer_attributes.clone();
        static_attributes.merge_from(&config.mixer_attributes);

        let mut forward_attributes = client_config.forward_attributes.clone();
        forward_attributes.merge_from(&config.forward_attributes);

        let network_fail_policy = config
            .network_fail_policy
            .unwrap_or(client_config.transport.network_fail_policy);

        let service_control = if config.disable_check_calls {
            None
        } else {
            service_control
        };

        Self {
            service_name: service_name.into(),
            config,
            static_attributes,
            forward_attributes,
            network_fail_policy,
            service_control,
        }
    }

    /// A context with policy enforcement switched off.
    pub fn disabled(service_name: impl Into<String>) -> Self {
        Self::new(service_name, None, &ClientConfig::default(), None)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn service_control(&self) -> Option<&Arc<dyn ServiceControlClient>> {
        self.service_control.as_ref()
    }

    pub fn is_enforcing(&self) -> bool {
        self.service_control.is_some()
    }

    pub fn network_fail_policy(&self) -> NetworkFailPolicy {
        self.network_fail_policy
    }

    pub fn admits(&self, status: &Status) -> bool {
        self.network_fail_policy.admits(status)
    }

    // Client-level attributes first, the service ones override them.
    pub fn add_static_attributes(&self, attributes: &mut AttributeBag) {
        attributes.merge_from(&self.static_attributes);
    }

    pub fn add_forward_attributes(&self, attributes: &mut AttributeBag) {
        attributes.merge_from(&self.forward_attributes);
    }

    pub fn quota_costs(&self) -> impl Iterator<Item = (&str, i64)> {
        self.config
            .quota_spec
            .iter()
            .map(|rule| (rule.quota.as_str(), rule.charge))
    }
}
