use crate::status_util::TransportResult;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use tonic::Code;

/// The subsystem a non-OK [`Status`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCause {
    Internal,
    Application,
    Auth,
    ServiceControl,
}

impl ErrorCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCause::Internal => "INTERNAL",
            ErrorCause::Application => "APPLICATION",
            ErrorCause::Auth => "AUTH",
            ErrorCause::ServiceControl => "SERVICE_CONTROL",
        }
    }
}

impl Display for ErrorCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a policy or quota call as seen by the proxy.
///
/// A transport may attach a structured hint about how the call failed. When
/// present, it takes precedence over message matching in
/// [`transport_result`](crate::status_util::transport_result).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: String,
    cause: ErrorCause,
    transport_hint: Option<TransportResult>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: Code::Ok,
            message: String::new(),
            cause: ErrorCause::Internal,
            transport_hint: None,
        }
    }

    pub fn new(code: Code, message: impl Into<String>, cause: ErrorCause) -> Self {
        Self {
            code,
            message: message.into(),
            cause,
            transport_hint: None,
        }
    }

    pub fn with_transport_hint(mut self, hint: TransportResult) -> Self {
        self.transport_hint = Some(hint);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> ErrorCause {
        self.cause
    }

    pub fn transport_hint(&self) -> Option<TransportResult> {
        self.transport_hint
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }
        write!(f, "[{}] {:?}: {}", self.cause, self.code, self.message)
    }
}

impl Error for Status {}

impl From<tonic::Status> for Status {
    fn from(status: tonic::Status) -> Self {
        Self::new(
            status.code(),
            status.message(),
            ErrorCause::ServiceControl,
        )
    }
}
