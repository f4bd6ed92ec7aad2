use crate::quota::{QuotaRequestInfo, QuotaResponseInfo};
use crate::status::Status;
use async_trait::async_trait;

pub mod grpc;
pub mod in_memory;

pub use grpc::GrpcServiceControlClient;
pub use in_memory::InMemoryServiceControlClient;

/// Remote policy/quota service as seen by the proxy.
///
/// Implementations must always produce a `(Status, QuotaResponseInfo)` pair;
/// the response info is kept by callers even when the status is an error.
/// `span` is the trace span of the calling check, which may be disabled.
#[async_trait]
pub trait ServiceControlClient: Sync + Send {
    async fn quota(
        &self,
        request: QuotaRequestInfo,
        span: tracing::Span,
    ) -> (Status, QuotaResponseInfo);
}
