use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// Error types for the social core
#[derive(Error, Debug)]
pub enum SocialError {
    /// Malformed input, reported per field
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A unique key (username, email) is already taken
    #[error("Already taken: {0}")]
    Uniqueness(String),

    /// Bad credentials. Deliberately carries no detail about which part failed.
    #[error("Invalid credentials")]
    AuthFailure,

    /// The acting user has no rights over the target resource
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// The referenced user or message does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The password hasher failed for reasons other than a mismatch
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl SocialError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SocialError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Maps store-level unique violations to `Uniqueness`, keeping every other
    /// database error as is.
    pub fn from_insert(err: DbErr, what: &str) -> Self {
        if is_unique_violation(&err) {
            SocialError::Uniqueness(what.to_string())
        } else {
            error!(?err, "Database error while writing {}", what);
            SocialError::Database(err)
        }
    }
}

/// True when the store rejected a write because of a unique or primary key.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// Reports the alphabetically-first failing field so the outcome is stable.
impl From<ValidationErrors> for SocialError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .unwrap_or_else(|| "invalid".to_string());
                (field.to_string(), reason)
            })
            .collect();
        fields.sort();

        match fields.into_iter().next() {
            Some((field, reason)) => SocialError::Validation { field, reason },
            None => SocialError::validation("input", "invalid"),
        }
    }
}

/// Type alias for Result with SocialError
pub type Result<T> = std::result::Result<T, SocialError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_validation_errors_pick_first_field() {
        let sample = Sample {
            name: String::new(),
            email: "nope".to_string(),
        };
        let err: SocialError = sample.validate().unwrap_err().into();

        match err {
            SocialError::Validation { field, reason } => {
                assert_eq!(field, "email");
                assert_eq!(reason, "email");
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_unique_db_error_is_kept() {
        let err = SocialError::from_insert(DbErr::Custom("boom".to_string()), "username");
        assert!(matches!(err, SocialError::Database(_)));
    }
}
