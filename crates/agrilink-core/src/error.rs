use thiserror::Error;

use agrilink_backend::BackendError;
use agrilink_types::models::{ApplicationStatus, Role};

/// Failures a caller of the repositories has to handle.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication refused; carries the backend's message verbatim.
    #[error("{0}")]
    Auth(String),

    /// The (job, worker) pair already has an application.
    #[error("already applied to this job")]
    AlreadyApplied,

    /// Input rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    #[error("requires the {required} role")]
    WrongRole { required: Role },

    #[error("cannot move application from {from} to {to}")]
    InvalidTransition { from: ApplicationStatus, to: ApplicationStatus },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The view that asked for the result is gone.
    #[error("cancelled")]
    Cancelled,

    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error(transparent)]
    Backend(BackendError),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    /// Short message for the user.
    pub fn notice(&self) -> String {
        match self {
            Self::Auth(msg) | Self::Validation(msg) => msg.clone(),
            Self::AlreadyApplied => "You have already applied for this job.".into(),
            Self::WrongRole { required: Role::Farmer } => "Only farmers can do this.".into(),
            Self::WrongRole { required: Role::Worker } => "Only workers can do this.".into(),
            Self::InvalidTransition { from, .. } => {
                format!("This application has already been {}.", from)
            }
            Self::NotFound { entity, .. } => format!("That {} no longer exists.", entity),
            Self::Cancelled => "Cancelled.".into(),
            Self::Unreachable(_) => "Cannot reach the server. Check your connection and try again.".into(),
            Self::Backend(BackendError::Unauthorized(_)) => "You are not allowed to do that.".into(),
            Self::Backend(_) => "Something went wrong. Please try again.".into(),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Auth(msg) => Self::Auth(msg),
            BackendError::Network(msg) => Self::Unreachable(msg),
            BackendError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Backend(other),
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_fold_into_the_user_taxonomy() {
        assert!(matches!(
            AppError::from(BackendError::Network("connection refused".into())),
            AppError::Unreachable(_)
        ));
        assert!(matches!(
            AppError::from(BackendError::Auth("Invalid login credentials".into())),
            AppError::Auth(m) if m == "Invalid login credentials"
        ));
        assert!(matches!(
            AppError::from(BackendError::Rejected { status: 500, message: "x".into() }),
            AppError::Backend(_)
        ));
    }

    #[test]
    fn notices() {
        assert_eq!(AppError::AlreadyApplied.notice(), "You have already applied for this job.");
        assert_eq!(AppError::Auth("Invalid login credentials".into()).notice(), "Invalid login credentials");
        let e = AppError::InvalidTransition {
            from: ApplicationStatus::Accepted,
            to: ApplicationStatus::Rejected,
        };
        assert_eq!(e.notice(), "This application has already been accepted.");
        let e = AppError::Backend(BackendError::Unauthorized("row-level rules".into()));
        assert_eq!(e.notice(), "You are not allowed to do that.");
    }
}
