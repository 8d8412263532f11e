use thiserror::Error;

/// Failures surfaced at the transport boundary. The `message` is for operators and logs;
/// callers only ever see `user_message()`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("method not allowed: {message}")]
    MethodNotAllowed { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn method_not_allowed(
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self::MethodNotAllowed { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn service_unavailable(
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self::ServiceUnavailable { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "message is required",
            Self::MethodNotAllowed { .. } => "POST only",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::MethodNotAllowed { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }

    /// Stable label used for the `error_class` log field.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::ServiceUnavailable { .. } => "service_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::InterfaceError;

    #[test]
    fn method_not_allowed_uses_wire_message() {
        let error = InterfaceError::method_not_allowed("GET on chat endpoint", "req-1");

        assert_eq!(error.user_message(), "POST only");
        assert_eq!(error.correlation_id(), "req-1");
        assert_eq!(error.error_class(), "method_not_allowed");
    }

    #[test]
    fn bad_request_does_not_expose_internal_detail() {
        let error = InterfaceError::bad_request("expected value at line 1 column 1", "req-2");

        assert_eq!(error.user_message(), "message is required");
        assert!(error.to_string().contains("line 1 column 1"));
    }

    #[test]
    fn service_unavailable_has_user_safe_message() {
        let error = InterfaceError::service_unavailable("semaphore closed", "req-3");

        assert!(matches!(error, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            error.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }
}
