use crate::attributes::AttributeBag;

/// Snapshot of a request sent along with a quota allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaRequestInfo {
    pub service_name: String,
    pub operation_id: String,
    pub operation_name: String,
    pub api_key: String,
    pub client_ip: String,
    pub referer: String,
    // (metric name, cost)
    pub metric_costs: Vec<(String, i64)>,
    pub attributes: AttributeBag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaErrorCode {
    Unspecified,
    ResourceExhausted,
    BillingNotActive,
    ProjectDeleted,
    ApiKeyInvalid,
    ApiKeyExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaError {
    pub code: QuotaErrorCode,
    pub subject: String,
    pub description: String,
}

/// What the policy service replied to a quota allocation.
///
/// Meaningful whatever the status of the call was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaResponseInfo {
    pub operation_id: String,
    pub service_config_id: String,
    pub quota_errors: Vec<QuotaError>,
    // (metric name, granted amount)
    pub quota_metrics: Vec<(String, i64)>,
}

impl QuotaResponseInfo {
    pub fn is_exhausted(&self) -> bool {
        self.quota_errors
            .iter()
            .any(|e| e.code == QuotaErrorCode::ResourceExhausted)
    }

    pub fn granted(&self, metric: &str) -> Option<i64> {
        self.quota_metrics
            .iter()
            .find(|(name, _)| name == metric)
            .map(|(_, amount)| *amount)
    }
}
