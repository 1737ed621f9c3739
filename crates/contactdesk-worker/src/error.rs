use sea_orm::DbErr;

use crate::caching::CacheKeyError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of an action, read, or route handler.
///
/// Client-facing variants carry a message safe to return as-is; the remaining
/// variants are logged and reported as a generic internal error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    PreCondition(String),

    #[error("Input validation error: [{0}]")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    CacheKey(#[from] CacheKeyError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("random source failure: {0}")]
    Random(#[from] getrandom::Error),
}

impl Error {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreCondition(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Forbidden(_) => 403,
            Error::PreCondition(_) => 412,
            Error::Validation(_) | Error::InvalidInput(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Mail(_) => 502,
            Error::CacheKey(_)
            | Error::Database(_)
            | Error::Storage(_)
            | Error::Csv(_)
            | Error::Xlsx(_)
            | Error::Json(_)
            | Error::Random(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Forbidden(_) => "forbidden",
            Error::PreCondition(_) => "precondition_failed",
            Error::Validation(_) | Error::InvalidInput(_) => "validation_error",
            Error::Unauthorized(_) => "unauthorized",
            Error::Mail(_) => "mail_delivery_failed",
            _ => "internal_error",
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status() >= 500
    }

    /// Message returned to clients. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string().replace('\n', ", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let err = Error::precondition("Email address is already taken");
        assert_eq!(err.status(), 412);
        assert_eq!(err.code(), "precondition_failed");
        assert_eq!(err.public_message(), "Email address is already taken");
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = Error::Database(DbErr::Custom("near \"FROM\": syntax error".to_string()));
        assert!(err.is_internal());
        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(Error::NotFound("Contact").to_string(), "Contact not found");
    }
}
