use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

pub struct PrometheusMetrics {
    prometheus_handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, BuildError> {
        Ok(Self::new_with_handle(Arc::new(Self::init_handle()?)))
    }

    pub(crate) fn new_with_handle(prometheus_handle: Arc<PrometheusHandle>) -> Self {
        policy_client::metrics::describe_metrics();
        describe_gauge!("policy_probe_up", "Policy probe is running");
        gauge!("policy_probe_up").set(1);
        Self { prometheus_handle }
    }

    // Creates and installs the prometheus exporter as global recorder
    // Only one recorder can be registered for the lifetime of the application
    fn init_handle() -> Result<PrometheusHandle, BuildError> {
        PrometheusBuilder::new().install_recorder()
    }

    pub fn gather_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}
