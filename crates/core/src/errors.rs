use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn service_unavailable(
        message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self::ServiceUnavailable { message: message.into(), correlation_id: correlation_id.into() }
    }

    pub fn internal(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), correlation_id: correlation_id.into() }
    }

    /// Safe wording for the widget. The internal `message` stays in logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "Mensagem obrigatória.",
            Self::ServiceUnavailable { .. } => {
                "O atendimento está temporariamente indisponível. Tente novamente em instantes."
            }
            Self::Internal { .. } => "Ocorreu um erro inesperado. Tente novamente.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InterfaceError;

    #[test]
    fn bad_request_has_user_safe_message() {
        let error = InterfaceError::bad_request("message field empty", "req-1");
        assert_eq!(error.user_message(), "Mensagem obrigatória.");
        assert_eq!(error.correlation_id(), "req-1");
    }

    #[test]
    fn internal_wording_never_leaks_the_detail() {
        let error = InterfaceError::internal("session lock poisoned", "req-2");
        assert!(!error.user_message().contains("poisoned"));
    }
}
