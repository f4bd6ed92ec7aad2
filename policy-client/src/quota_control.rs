use crate::metrics::incr_quota_checks;
use crate::request_context::RequestContext;
use crate::service_control::ServiceControlClient;
use crate::status::{Code, ErrorCause, Status};
use crate::status_util::{transport_result, TransportResult};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::Instrument;

pub const UNREGISTERED_CALLER_MESSAGE: &str =
    "Method doesn't allow unregistered callers (callers without established identity). \
     Please use API Key or other form of API consumer identity to call this API.";

pub const NO_RUNTIME_MESSAGE: &str = "no tokio runtime to run the quota call";

/// Decides, per request, whether quota must be allocated against the remote
/// service and performs the allocation.
#[derive(Debug, Clone, Default)]
pub struct QuotaController {
    handle: Option<Handle>,
}

impl QuotaController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the remote calls of [`check_with`](Self::check_with) on `handle`
    /// instead of the runtime of the caller.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub async fn check(&self, request: &Arc<RequestContext>) -> Status {
        match Self::service_control_for(request) {
            Ok(client) => Self::allocate_quota(client, Arc::clone(request)).await,
            Err(status) => status,
        }
    }

    /// Continuation-passing flavour of [`check`](Self::check).
    ///
    /// When no remote call is needed `on_done` runs before this returns, and
    /// so does it with an `INTERNAL` status when there is no runtime to spawn
    /// the call on. Otherwise the call is spawned and the task keeps `request`
    /// and `on_done` alive until the reply comes in.
    pub fn check_with<F>(&self, request: Arc<RequestContext>, on_done: F)
    where
        F: FnOnce(Status) + Send + 'static,
    {
        let client = match Self::service_control_for(&request) {
            Ok(client) => client,
            Err(status) => return on_done(status),
        };

        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => match Handle::try_current() {
                Ok(handle) => handle,
                Err(e) => {
                    error!("Can't run the quota call without a tokio runtime: {}", e);
                    incr_quota_checks(TransportResult::Other.as_str());
                    return on_done(Status::new(
                        Code::Internal,
                        NO_RUNTIME_MESSAGE,
                        ErrorCause::Internal,
                    ));
                }
            },
        };
        handle.spawn(async move {
            let status = Self::allocate_quota(client, request).await;
            on_done(status);
        });
    }

    // Err carries the final status when no remote call is needed.
    fn service_control_for(
        request: &RequestContext,
    ) -> Result<Arc<dyn ServiceControlClient>, Status> {
        let client = match request.service_context().service_control() {
            Some(client) => Arc::clone(client),
            None => {
                incr_quota_checks("disabled");
                return Err(Status::ok());
            }
        };

        if request.api_key().is_empty() {
            if request.method().allow_unregistered_calls() {
                incr_quota_checks("anonymous");
                return Err(Status::ok());
            }

            debug!(
                "Rejecting operation {} to {}: no API key",
                request.operation_id(),
                request.method().selector()
            );
            incr_quota_checks("unauthenticated");
            return Err(Status::new(
                Code::Unauthenticated,
                UNREGISTERED_CALLER_MESSAGE,
                ErrorCause::ServiceControl,
            ));
        }

        Ok(client)
    }

    async fn allocate_quota(
        client: Arc<dyn ServiceControlClient>,
        request: Arc<RequestContext>,
    ) -> Status {
        let info = request.quota_request_info();
        let span = tracing::info_span!(
            "quota_check",
            service = %info.service_name,
            operation_id = %info.operation_id,
        );

        let (status, response) = client.quota(info, span.clone()).instrument(span).await;

        if !request.set_quota_response_info(response) {
            debug!(
                "Dropping quota response for finalized operation {}",
                request.operation_id()
            );
        }

        let result = transport_result(&status);
        incr_quota_checks(result.as_str());
        if !status.is_ok() {
            warn!(
                "Quota check for operation {} failed ({}): {}",
                request.operation_id(),
                result.as_str(),
                status
            );
        }

        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, ServiceConfig};
    use crate::quota::{QuotaError, QuotaErrorCode, QuotaResponseInfo};
    use crate::request_context::MethodInfo;
    use crate::service_context::ServiceContext;
    use crate::service_control::in_memory::InMemoryServiceControlClient;
    use crate::status_util::UPSTREAM_CONNECT_ERROR;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn request_with(
        client: Option<Arc<InMemoryServiceControlClient>>,
        allow_unregistered: bool,
        api_key: &str,
    ) -> Arc<RequestContext> {
        let service_control = client.map(|c| c as Arc<dyn ServiceControlClient>);
        let service_context = Arc::new(ServiceContext::new(
            "svc.ns",
            None,
            &ClientConfig::default(),
            service_control,
        ));
        Arc::new(
            RequestContext::new(
                service_context,
                Arc::new(MethodInfo::new("svc.Get", allow_unregistered)),
            )
            .with_api_key(api_key),
        )
    }

    #[tokio::test]
    async fn disabled_service_short_circuits() {
        let request = request_with(None, false, "");
        let status = QuotaController::new().check(&request).await;
        assert!(status.is_ok());
        assert_eq!(request.quota_response_info(), None);
    }

    #[tokio::test]
    async fn disabled_check_calls_short_circuit() {
        let client = Arc::new(InMemoryServiceControlClient::new());
        let service_config = ServiceConfig {
            disable_check_calls: true,
            ..Default::default()
        };
        let service_context = Arc::new(ServiceContext::new(
            "svc.ns",
            Some(&service_config),
            &ClientConfig::default(),
            Some(client.clone() as Arc<dyn ServiceControlClient>),
        ));
        let request = Arc::new(
            RequestContext::new(service_context, Arc::new(MethodInfo::new("svc.Get", false)))
                .with_api_key("key"),
        );

        assert!(QuotaController::new().check(&request).await.is_ok());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn anonymous_calls_allowed_without_rpc() {
        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client.clone()), true, "");

        assert!(QuotaController::new().check(&request).await.is_ok());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn missing_api_key_is_unauthenticated() {
        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client.clone()), false, "");

        let status = QuotaController::new().check(&request).await;

        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.cause(), ErrorCause::ServiceControl);
        assert_eq!(status.message(), UNREGISTERED_CALLER_MESSAGE);
        assert_eq!(client.calls(), 0);
        assert_eq!(request.quota_response_info(), None);
    }

    #[tokio::test]
    async fn remote_call_sends_request_snapshot() {
        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client.clone()), false, "key-1");

        let status = QuotaController::new().check(&request).await;

        assert!(status.is_ok());
        let sent = client.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].api_key, "key-1");
        assert_eq!(sent[0].service_name, "svc.ns");
        assert_eq!(sent[0].operation_id, request.operation_id());
        assert_eq!(request.quota_response_info(), Some(QuotaResponseInfo::default()));
    }

    #[tokio::test]
    async fn response_info_is_stored_on_failure() {
        let failure = Status::new(
            Code::ResourceExhausted,
            "Quota allocation failed.",
            ErrorCause::ServiceControl,
        );
        let response = QuotaResponseInfo {
            operation_id: "op".to_string(),
            quota_errors: vec![QuotaError {
                code: QuotaErrorCode::ResourceExhausted,
                subject: "project:p".to_string(),
                description: String::new(),
            }],
            ..Default::default()
        };
        let client = Arc::new(InMemoryServiceControlClient::replying(
            failure.clone(),
            response.clone(),
        ));
        let request = request_with(Some(client), false, "key-1");

        let status = QuotaController::new().check(&request).await;

        assert_eq!(status, failure);
        assert_eq!(request.quota_response_info(), Some(response));
    }

    #[tokio::test]
    async fn transport_failures_surface_verbatim() {
        let failure = Status::new(
            Code::Unavailable,
            UPSTREAM_CONNECT_ERROR,
            ErrorCause::ServiceControl,
        );
        let client = Arc::new(InMemoryServiceControlClient::replying(
            failure.clone(),
            QuotaResponseInfo::default(),
        ));
        let request = request_with(Some(client), false, "key-1");

        assert_eq!(QuotaController::new().check(&request).await, failure);
    }

    #[test]
    fn check_with_short_circuits_synchronously() {
        // No runtime here: spawning would panic, so the continuation must run
        // inline.
        let request = request_with(None, false, "");
        let (tx, mut rx) = oneshot::channel();
        QuotaController::new().check_with(request, move |status| {
            let _ = tx.send(status);
        });
        assert_eq!(rx.try_recv().expect("continuation already ran"), Status::ok());

        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client), false, "");
        let (tx, mut rx) = oneshot::channel();
        QuotaController::new().check_with(request, move |status| {
            let _ = tx.send(status);
        });
        let status = rx.try_recv().expect("continuation already ran");
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn check_with_fails_without_a_runtime() {
        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client.clone()), false, "key");
        let (tx, mut rx) = oneshot::channel();

        QuotaController::new().check_with(Arc::clone(&request), move |status| {
            let _ = tx.send(status);
        });

        let status = rx.try_recv().expect("continuation already ran");
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.cause(), ErrorCause::Internal);
        assert_eq!(status.message(), NO_RUNTIME_MESSAGE);
        assert_eq!(client.calls(), 0);
        assert_eq!(request.quota_response_info(), None);
    }

    #[tokio::test]
    async fn check_with_delivers_remote_outcome() {
        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client.clone()), false, "key-1");

        let (tx, rx) = oneshot::channel();
        QuotaController::new().check_with(Arc::clone(&request), move |status| {
            let _ = tx.send(status);
        });

        let status = rx.await.expect("continuation ran");
        assert!(status.is_ok());
        assert_eq!(client.calls(), 1);
        assert!(request.quota_response_info().is_some());
    }

    #[tokio::test]
    async fn check_with_outlives_the_caller() {
        let client = Arc::new(
            InMemoryServiceControlClient::new().with_delay(Duration::from_millis(20)),
        );
        let request = request_with(Some(client), false, "key-1");
        let weak = Arc::downgrade(&request);

        let (tx, rx) = oneshot::channel();
        QuotaController::new().check_with(request, move |status| {
            let _ = tx.send(status);
        });

        // The pending call holds the only strong reference now.
        assert!(weak.upgrade().is_some());
        assert!(rx.await.expect("continuation ran").is_ok());
    }

    #[tokio::test]
    async fn late_reply_after_finalize_is_dropped() {
        let client = Arc::new(
            InMemoryServiceControlClient::new().with_delay(Duration::from_millis(20)),
        );
        let request = request_with(Some(client), false, "key-1");

        let (tx, rx) = oneshot::channel();
        QuotaController::new().check_with(Arc::clone(&request), move |status| {
            let _ = tx.send(status);
        });
        request.finalize();

        assert!(rx.await.expect("continuation ran").is_ok());
        assert_eq!(request.quota_response_info(), None);
    }

    #[test]
    fn check_with_runs_on_the_given_handle() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let client = Arc::new(InMemoryServiceControlClient::new());
        let request = request_with(Some(client.clone()), false, "key-1");

        let (tx, rx) = std::sync::mpsc::channel();
        QuotaController::with_handle(runtime.handle().clone()).check_with(
            request,
            move |status| {
                let _ = tx.send(status);
            },
        );

        let status = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("continuation ran");
        assert!(status.is_ok());
        assert_eq!(client.calls(), 1);
    }
}
