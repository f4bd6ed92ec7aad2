use crate::quota::{QuotaError, QuotaErrorCode, QuotaRequestInfo, QuotaResponseInfo};
use crate::service_control::ServiceControlClient;
use crate::status::{Code, ErrorCause, Status};
use crate::status_util::TransportResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::Instrument;

use self::v1::quota_controller_client::QuotaControllerClient;

// clippy will barf on protobuf generated code
#[allow(clippy::derive_partial_eq_without_eq, clippy::enum_variant_names)]
pub mod v1 {
    include!("protobufs/google.api.servicecontrol.v1.rs");
}

const CALLER_IP_LABEL: &str = "servicecontrol.googleapis.com/caller_ip";
const REFERER_LABEL: &str = "servicecontrol.googleapis.com/referer";

// What tonic reports when the endpoint timeout fires on our side.
const TIMEOUT_EXPIRED: &str = "Timeout expired";

/// Service-control client talking to a remote `QuotaController` over gRPC.
pub struct GrpcServiceControlClient {
    client: QuotaControllerClient<Channel>,
    timeout: Duration,
}

impl GrpcServiceControlClient {
    /// Connects lazily to `url`; must be called from within a tokio runtime.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, tonic::transport::Error> {
        let endpoint = Endpoint::from_shared(url.to_string())?
            .connect_timeout(timeout)
            .timeout(timeout);

        Ok(Self {
            client: QuotaControllerClient::new(endpoint.connect_lazy()),
            timeout,
        })
    }
}

#[async_trait]
impl ServiceControlClient for GrpcServiceControlClient {
    async fn quota(
        &self,
        request: QuotaRequestInfo,
        span: tracing::Span,
    ) -> (Status, QuotaResponseInfo) {
        let mut grpc_request = tonic::Request::new(allocate_quota_request(&request));
        grpc_request.set_timeout(self.timeout);

        let mut client = self.client.clone();
        match client.allocate_quota(grpc_request).instrument(span).await {
            Ok(response) => convert_response(response.into_inner()),
            Err(status) => {
                debug!(
                    "AllocateQuota for operation {} failed: {:?}",
                    request.operation_id, status
                );
                (
                    convert_status(&status),
                    QuotaResponseInfo {
                        operation_id: request.operation_id,
                        ..Default::default()
                    },
                )
            }
        }
    }
}

fn allocate_quota_request(info: &QuotaRequestInfo) -> v1::AllocateQuotaRequest {
    let mut labels = HashMap::new();
    if !info.client_ip.is_empty() {
        labels.insert(CALLER_IP_LABEL.to_string(), info.client_ip.clone());
    }
    if !info.referer.is_empty() {
        labels.insert(REFERER_LABEL.to_string(), info.referer.clone());
    }

    let quota_metrics = info
        .metric_costs
        .iter()
        .map(|(name, cost)| v1::MetricValueSet {
            metric_name: name.clone(),
            metric_values: vec![v1::MetricValue {
                value: Some(v1::metric_value::Value::Int64Value(*cost)),
                ..Default::default()
            }],
        })
        .collect();

    v1::AllocateQuotaRequest {
        service_name: info.service_name.clone(),
        allocate_operation: Some(v1::QuotaOperation {
            operation_id: info.operation_id.clone(),
            method_name: info.operation_name.clone(),
            consumer_id: format!("api_key:{}", info.api_key),
            labels,
            quota_metrics,
            quota_mode: v1::quota_operation::QuotaMode::Normal as i32,
        }),
        service_config_id: String::new(),
    }
}

fn convert_response(response: v1::AllocateQuotaResponse) -> (Status, QuotaResponseInfo) {
    let info = QuotaResponseInfo {
        operation_id: response.operation_id,
        service_config_id: response.service_config_id,
        quota_errors: response
            .allocate_errors
            .iter()
            .map(convert_quota_error)
            .collect(),
        quota_metrics: response
            .quota_metrics
            .iter()
            .map(|set| {
                let granted = set
                    .metric_values
                    .iter()
                    .filter_map(|value| match value.value {
                        Some(v1::metric_value::Value::Int64Value(amount)) => Some(amount),
                        _ => None,
                    })
                    .sum();
                (set.metric_name.clone(), granted)
            })
            .collect(),
    };

    let status = match info.quota_errors.first() {
        None => Status::ok(),
        Some(error) => quota_error_status(error),
    };

    (status, info)
}

fn convert_quota_error(error: &v1::QuotaError) -> QuotaError {
    use v1::quota_error::Code as ErrorCode;

    let code = match ErrorCode::try_from(error.code) {
        Ok(ErrorCode::ResourceExhausted) => QuotaErrorCode::ResourceExhausted,
        Ok(ErrorCode::BillingNotActive) => QuotaErrorCode::BillingNotActive,
        Ok(ErrorCode::ProjectDeleted) => QuotaErrorCode::ProjectDeleted,
        Ok(ErrorCode::ApiKeyInvalid) => QuotaErrorCode::ApiKeyInvalid,
        Ok(ErrorCode::ApiKeyExpired) => QuotaErrorCode::ApiKeyExpired,
        Ok(ErrorCode::Unspecified) | Err(_) => QuotaErrorCode::Unspecified,
    };

    QuotaError {
        code,
        subject: error.subject.clone(),
        description: error.description.clone(),
    }
}

fn quota_error_status(error: &QuotaError) -> Status {
    let (code, headline) = match error.code {
        QuotaErrorCode::ResourceExhausted => (Code::ResourceExhausted, "Quota allocation failed."),
        QuotaErrorCode::ApiKeyInvalid => (
            Code::InvalidArgument,
            "API key not valid. Please pass a valid API key.",
        ),
        QuotaErrorCode::ApiKeyExpired => (
            Code::InvalidArgument,
            "API key expired. Please renew the API key.",
        ),
        QuotaErrorCode::BillingNotActive => (
            Code::PermissionDenied,
            "Billing is not enabled for the consumer project.",
        ),
        QuotaErrorCode::ProjectDeleted => (
            Code::PermissionDenied,
            "The consumer project has been deleted.",
        ),
        QuotaErrorCode::Unspecified => (Code::PermissionDenied, "Quota allocation rejected."),
    };

    let message = if error.description.is_empty() {
        headline.to_string()
    } else {
        format!("{} {}", headline, error.description)
    };

    Status::new(code, message, ErrorCause::ServiceControl)
}

fn convert_status(status: &tonic::Status) -> Status {
    let converted = Status::new(status.code(), status.message(), ErrorCause::ServiceControl);
    match transport_failure(status) {
        Some(hint) => converted.with_transport_hint(hint),
        None => converted,
    }
}

// Failures tonic raised locally, before or instead of getting an answer.
fn transport_failure(status: &tonic::Status) -> Option<TransportResult> {
    match status.code() {
        Code::DeadlineExceeded => Some(TransportResult::ResponseTimeout),
        Code::Cancelled if status.message() == TIMEOUT_EXPIRED => {
            Some(TransportResult::ResponseTimeout)
        }
        Code::Unavailable | Code::Unknown if status.source().is_some() => {
            Some(TransportResult::SendError)
        }
        _ => None,
    }
}
