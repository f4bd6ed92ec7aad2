use crate::quota::{QuotaRequestInfo, QuotaResponseInfo};
use crate::service_control::ServiceControlClient;
use crate::status::Status;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Scripted service-control client. Replies with a fixed outcome and keeps
/// every request it received.
pub struct InMemoryServiceControlClient {
    reply: RwLock<(Status, QuotaResponseInfo)>,
    delay: Option<Duration>,
    requests: Mutex<Vec<QuotaRequestInfo>>,
}

impl Default for InMemoryServiceControlClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryServiceControlClient {
    pub fn new() -> Self {
        Self::replying(Status::ok(), QuotaResponseInfo::default())
    }

    pub fn replying(status: Status, response: QuotaResponseInfo) -> Self {
        Self {
            reply: RwLock::new((status, response)),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_reply(&self, status: Status, response: QuotaResponseInfo) {
        *self.reply.write().unwrap_or_else(PoisonError::into_inner) = (status, response);
    }

    pub fn requests(&self) -> Vec<QuotaRequestInfo> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ServiceControlClient for InMemoryServiceControlClient {
    async fn quota(
        &self,
        request: QuotaRequestInfo,
        _span: tracing::Span,
    ) -> (Status, QuotaResponseInfo) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
