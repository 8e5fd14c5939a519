use thiserror::Error;

use crate::{
    application::{markup::MarkupError, repos::RepoError},
    config::LoadError,
    infra::error::InfraError,
};

/// Failure of a derivation operation. Collaborator errors pass through unchanged.
#[derive(Debug, Error)]
pub enum PlainTextError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Markup(#[from] MarkupError),
}

/// Errors surfaced to an embedding host while wiring and running the service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    PlainText(#[from] PlainTextError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Whether retrying the operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Infra(InfraError::Database { .. })
                | AppError::PlainText(PlainTextError::Repo(
                    RepoError::Timeout | RepoError::Persistence(_)
                ))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_pass_through_transparently() {
        let err = PlainTextError::from(RepoError::Timeout);
        assert_eq!(err.to_string(), "database timeout");
        assert!(matches!(err, PlainTextError::Repo(RepoError::Timeout)));
    }

    #[test]
    fn transient_classification() {
        assert!(AppError::from(PlainTextError::from(RepoError::Timeout)).is_transient());
        assert!(AppError::from(InfraError::database("pool closed")).is_transient());
        assert!(
            !AppError::from(PlainTextError::from(MarkupError::strip("bad markup"))).is_transient()
        );
        assert!(!AppError::unexpected("boom").is_transient());
    }
}
