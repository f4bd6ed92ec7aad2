use crate::attributes::{AttributeBag, REQUEST_API_KEY};
use crate::quota::{QuotaRequestInfo, QuotaResponseInfo};
use crate::service_context::ServiceContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The API method a request resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodInfo {
    selector: String,
    allow_unregistered_calls: bool,
    metric_costs: Vec<(String, i64)>,
}

impl MethodInfo {
    pub fn new(selector: impl Into<String>, allow_unregistered_calls: bool) -> Self {
        Self {
            selector: selector.into(),
            allow_unregistered_calls,
            metric_costs: Vec::new(),
        }
    }

    pub fn with_metric_cost(mut self, metric: impl Into<String>, cost: i64) -> Self {
        self.metric_costs.push((metric.into(), cost));
        self
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn allow_unregistered_calls(&self) -> bool {
        self.allow_unregistered_calls
    }

    pub fn metric_costs(&self) -> &[(String, i64)] {
        &self.metric_costs
    }
}

/// State of one in-flight request.
///
/// Shared as `Arc<RequestContext>` so that a pending quota call keeps it
/// alive. The only mutable part is the quota response slot.
pub struct RequestContext {
    operation_id: String,
    api_key: String,
    method: Arc<MethodInfo>,
    service_context: Arc<ServiceContext>,
    attributes: AttributeBag,
    client_ip: String,
    referer: String,
    quota_response_info: Mutex<Option<QuotaResponseInfo>>,
    finalized: AtomicBool,
}

impl RequestContext {
    pub fn new(service_context: Arc<ServiceContext>, method: Arc<MethodInfo>) -> Self {
        let mut attributes = AttributeBag::new();
        service_context.add_static_attributes(&mut attributes);

        Self {
            operation_id: format!("{:032x}", rand::random::<u128>()),
            api_key: String::new(),
            method,
            service_context,
            attributes,
            client_ip: String::new(),
            referer: String::new(),
            quota_response_info: Mutex::new(None),
            finalized: AtomicBool::new(false),
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = operation_id.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.client_ip = client_ip.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_attributes(mut self, attributes: &AttributeBag) -> Self {
        self.attributes.merge_from(attributes);
        self
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn method(&self) -> &MethodInfo {
        &self.method
    }

    pub fn service_context(&self) -> &Arc<ServiceContext> {
        &self.service_context
    }

    pub fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    pub fn quota_request_info(&self) -> QuotaRequestInfo {
        let mut metric_costs = self.method.metric_costs().to_vec();
        metric_costs.extend(
            self.service_context
                .quota_costs()
                .map(|(quota, charge)| (quota.to_string(), charge)),
        );

        let mut attributes = self.attributes.clone();
        if !self.api_key.is_empty() {
            attributes.insert(REQUEST_API_KEY, self.api_key.as_str());
        }

        QuotaRequestInfo {
            service_name: self.service_context.service_name().to_string(),
            operation_id: self.operation_id.clone(),
            operation_name: self.method.selector().to_string(),
            api_key: self.api_key.clone(),
            client_ip: self.client_ip.clone(),
            referer: self.referer.clone(),
            metric_costs,
            attributes,
        }
    }

    /// Stores the reply of the quota call. Returns `false`, leaving the slot
    /// untouched, once the request has been finalized.
    pub fn set_quota_response_info(&self, info: QuotaResponseInfo) -> bool {
        let mut slot = self
            .quota_response_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Checked under the lock so it can't race with finalize().
        if self.finalized.load(Ordering::Acquire) {
            return false;
        }
        *slot = Some(info);
        true
    }

    pub fn quota_response_info(&self) -> Option<QuotaResponseInfo> {
        self.quota_response_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Marks the request as done; late quota replies are discarded from now on.
    pub fn finalize(&self) {
        let _slot = self
            .quota_response_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.finalized.store(true, Ordering::Release);
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, QuotaRule, ServiceConfig};

    fn service_context() -> Arc<ServiceContext> {
        let mut client_config = ClientConfig::default();
        client_config.mixer_attributes.insert("mesh.id", "m1");
        let service_config = ServiceConfig {
            quota_spec: vec![QuotaRule {
                quota: "requests".to_string(),
                charge: 2,
            }],
            ..Default::default()
        };
        Arc::new(ServiceContext::new(
            "svc.ns",
            Some(&service_config),
            &client_config,
            None,
        ))
    }

    #[test]
    fn operation_ids_are_unique() {
        let method = Arc::new(MethodInfo::new("svc.Get", false));
        let a = RequestContext::new(service_context(), method.clone());
        let b = RequestContext::new(service_context(), method);
        assert_eq!(a.operation_id().len(), 32);
        assert_ne!(a.operation_id(), b.operation_id());
    }

    #[test]
    fn quota_request_info_snapshots_the_request() {
        let method = Arc::new(MethodInfo::new("svc.Get", false).with_metric_cost("reads", 1));
        let mut extra = AttributeBag::new();
        extra.insert("request.path", "/get");

        let request = RequestContext::new(service_context(), method)
            .with_operation_id("op-1")
            .with_api_key("key-1")
            .with_client_ip("10.1.1.1")
            .with_referer("https://example.com")
            .with_attributes(&extra);

        let info = request.quota_request_info();
        assert_eq!(info.service_name, "svc.ns");
        assert_eq!(info.operation_id, "op-1");
        assert_eq!(info.operation_name, "svc.Get");
        assert_eq!(info.api_key, "key-1");
        assert_eq!(info.client_ip, "10.1.1.1");
        assert_eq!(info.referer, "https://example.com");
        assert_eq!(
            info.metric_costs,
            vec![("reads".to_string(), 1), ("requests".to_string(), 2)]
        );
        assert_eq!(info.attributes.get_str("mesh.id"), Some("m1"));
        assert_eq!(info.attributes.get_str("request.path"), Some("/get"));
        assert_eq!(info.attributes.get_str(REQUEST_API_KEY), Some("key-1"));
    }

    #[test]
    fn quota_response_is_discarded_after_finalize() {
        let request = RequestContext::new(
            service_context(),
            Arc::new(MethodInfo::new("svc.Get", true)),
        );
        let first = QuotaResponseInfo {
            operation_id: "first".to_string(),
            ..Default::default()
        };
        assert!(request.set_quota_response_info(first.clone()));
        assert_eq!(request.quota_response_info(), Some(first.clone()));

        request.finalize();
        assert!(request.is_finalized());

        let late = QuotaResponseInfo {
            operation_id: "late".to_string(),
            ..Default::default()
        };
        assert!(!request.set_quota_response_info(late));
        assert_eq!(request.quota_response_info(), Some(first));
    }
}
