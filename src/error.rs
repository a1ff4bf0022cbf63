use thiserror::Error;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Failure reported by a backend collaborator (auth service or database).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION)
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => Self {
                code: db.code().map(|c| c.into_owned()),
                message: db.message().to_owned(),
            },
            _ => Self::new(e.to_string()),
        }
    }
}

/// User-facing errors of the authoring operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("A subject named \"{name}\" already exists.")]
    Conflict { name: String },

    #[error("{0}")]
    Backend(String),
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_recognised_by_code() {
        let e = BackendError::with_code("23505", "duplicate key value");
        assert!(e.is_unique_violation());
        assert!(!BackendError::new("connection reset").is_unique_violation());
    }

    #[test]
    fn conflict_message_names_the_subject() {
        let e = AppError::Conflict {
            name: "History".into(),
        };
        assert_eq!(e.to_string(), "A subject named \"History\" already exists.");
    }
}
