use std::fmt::Display;

use crate::hash::HashingError;
use crate::protocol::validation::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("{entity} [{id}] not found.")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} [{id}] already exists.")]
    AlreadyExists { entity: &'static str, id: String },
    #[error("{message} {detail}")]
    Database { message: String, detail: String },
    #[error("Hashing error: {0}")]
    Hashing(#[from] HashingError),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Keeps only the first line of the underlying error, which is the part
    /// worth showing to a caller.
    pub fn database(message: impl Into<String>, error: impl Display) -> Self {
        let detail = error.to_string();
        let detail = detail.lines().next().unwrap_or_default().trim().to_string();
        Error::Database {
            message: message.into(),
            detail,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => Error::not_found("Record", "?"),
            e => Error::database("Database query failed!", e),
        }
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::database("Could not acquire a database connection!", e)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::database("Database task failed!", e)
    }
}

impl From<agora_persistence::executor::Error> for Error {
    fn from(e: agora_persistence::executor::Error) -> Self {
        match e {
            agora_persistence::executor::Error::Diesel(e) => Error::from(e),
            agora_persistence::executor::Error::Pool(e) => Error::from(e),
            agora_persistence::executor::Error::RuntimeError(e) => Error::from(e),
        }
    }
}

/// Attaches a domain message to repository failures.
pub(crate) trait DbContext<T> {
    fn context(self, message: &str) -> Result<T>;
}

impl<T> DbContext<T> for std::result::Result<T, diesel::result::Error> {
    fn context(self, message: &str) -> Result<T> {
        self.map_err(|e| Error::database(message, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_keeps_first_line() {
        let error = Error::database(
            "Could not create the Escrow!",
            "FOREIGN KEY constraint failed\n  at insert into escrows",
        );
        assert_eq!(
            error.to_string(),
            "Could not create the Escrow! FOREIGN KEY constraint failed"
        );
    }

    #[test]
    fn test_diesel_not_found_is_not_found() {
        assert!(Error::from(diesel::result::Error::NotFound).is_not_found());
    }
}
