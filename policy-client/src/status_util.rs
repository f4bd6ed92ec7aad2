use crate::status::{Code, Status};

/// Message Envoy sets on a local reply when the upstream did not answer in time.
pub const UPSTREAM_REQUEST_TIMEOUT: &str = "upstream request timeout";

/// Message Envoy sets on a local reply when the request never reached the upstream.
pub const UPSTREAM_CONNECT_ERROR: &str =
    "upstream connect error or disconnect/reset before headers";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportResult {
    Success,
    SendError,
    ResponseTimeout,
    Other,
}

impl TransportResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportResult::Success => "success",
            TransportResult::SendError => "send_error",
            TransportResult::ResponseTimeout => "response_timeout",
            TransportResult::Other => "other",
        }
    }
}

/// Classifies the outcome of a call to the policy service.
///
/// A structured hint left by the transport wins. Without one, only
/// `UNAVAILABLE` statuses carrying one of the two Envoy sentinel messages
/// (exact match) are told apart, everything else is [`TransportResult::Other`].
pub fn transport_result(status: &Status) -> TransportResult {
    if status.is_ok() {
        return TransportResult::Success;
    }

    if let Some(hint) = status.transport_hint() {
        return hint;
    }

    if status.code() == Code::Unavailable {
        match status.message() {
            UPSTREAM_REQUEST_TIMEOUT => return TransportResult::ResponseTimeout,
            UPSTREAM_CONNECT_ERROR => return TransportResult::SendError,
            _ => {}
        }
    }

    TransportResult::Other
}
