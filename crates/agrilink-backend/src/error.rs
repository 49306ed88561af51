use thiserror::Error;

/// Everything the backend can answer besides success.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Authentication refused. The message is the backend's own and is shown verbatim.
    #[error("{0}")]
    Auth(String),

    /// A uniqueness constraint rejected the write (e.g. a second application to the same job).
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request carried no valid session or row-level rules refused it.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend could not be reached (connection refused, DNS, timeout).
    #[error("backend unreachable: {0}")]
    Network(String),

    /// Any other refusal, with the HTTP-ish status it came with.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BackendError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::Network(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
