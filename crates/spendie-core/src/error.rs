//! Error types for Spendie

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// A storage operation kept failing after the internal retry
    #[error("could not {operation}, please try again")]
    Unavailable {
        operation: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Coarse classification used by adapters to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Storage,
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. }
            | Self::UnknownCommand(_)
            | Self::Csv(_)
            | Self::Json(_)
            | Self::Config(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unavailable { .. }
            | Self::Database(_)
            | Self::Pool(_)
            | Self::Io(_)
            | Self::InvalidData(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying the same store operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Pool(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        assert_eq!(
            Error::validation("amount", "not a number: abc").to_string(),
            "invalid amount: not a number: abc"
        );
        assert_eq!(
            Error::not_found("expense", 42).to_string(),
            "expense not found: 42"
        );
        assert_eq!(
            Error::UnknownCommand("foo".into()).to_string(),
            "unknown command: foo"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            Error::UnknownCommand("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(Error::Conflict("dup".into()).kind(), ErrorKind::Conflict);

        let storage = Error::Database(rusqlite::Error::InvalidQuery);
        assert_eq!(storage.kind(), ErrorKind::Storage);
        assert!(storage.is_transient());
        assert!(!Error::validation("date", "bad").is_transient());
    }
}
