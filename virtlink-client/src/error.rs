//! Error types for the client library.
//!
//! Every operation fails with exactly one [`ErrorCode`]. Callers branch on
//! [`ClientError::code`]; message text is diagnostic only.

use std::fmt;

use thiserror::Error;

/// Classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The referenced resource does not exist.
    NotFound,
    /// A caller-supplied value violates a precondition.
    BadArgument,
    /// The operation would violate a uniqueness constraint.
    Conflict,
    /// A required field was absent from a transport response.
    FieldMissing,
    /// Conversion or invariant failure not caused by caller input.
    Bug,
    /// Opaque transport failure.
    Unidentified,
}

impl ErrorCode {
    /// Whether the retry engine may attempt the operation again.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorCode::Unidentified)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::BadArgument => "bad_argument",
            ErrorCode::Conflict => "conflict",
            ErrorCode::FieldMissing => "field_missing",
            ErrorCode::Bug => "bug",
            ErrorCode::Unidentified => "unidentified",
        };
        f.write_str(name)
    }
}

/// Errors returned by every client operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Referenced resource is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller input was rejected before anything was changed.
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// Uniqueness violation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport response lacked a field the contract requires.
    #[error("Required field missing: {resource} has no {field}")]
    FieldMissing { resource: String, field: String },

    /// Internal error (contract mismatch, poisoned state).
    #[error("Bug: {0}")]
    Bug(String),

    /// Unclassified transport failure.
    #[error("Unidentified failure: {0}")]
    Unidentified(String),
}

impl ClientError {
    /// Shorthand for a [`ClientError::FieldMissing`].
    pub fn field_missing(resource: impl Into<String>, field: impl Into<String>) -> Self {
        ClientError::FieldMissing {
            resource: resource.into(),
            field: field.into(),
        }
    }

    /// The classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::BadArgument(_) => ErrorCode::BadArgument,
            ClientError::Conflict(_) => ErrorCode::Conflict,
            ClientError::FieldMissing { .. } => ErrorCode::FieldMissing,
            ClientError::Bug(_) => ErrorCode::Bug,
            ClientError::Unidentified(_) => ErrorCode::Unidentified,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.code().is_transient()
    }

    /// Re-label this error under `code`, prefixing `context` to the message.
    ///
    /// Only a [`ClientError::FieldMissing`] can stay field-missing; its
    /// resource gains the context and its field is kept. Any other error
    /// has no field to name and becomes [`ClientError::Bug`] instead.
    pub fn wrap(self, code: ErrorCode, context: impl fmt::Display) -> Self {
        if let ClientError::FieldMissing { resource, field } = &self {
            if code == ErrorCode::FieldMissing {
                return ClientError::field_missing(format!("{}: {}", context, resource), field.clone());
            }
        }
        let message = format!("{}: {}", context, self);
        match code {
            ErrorCode::NotFound => ClientError::NotFound(message),
            ErrorCode::BadArgument => ClientError::BadArgument(message),
            ErrorCode::Conflict => ClientError::Conflict(message),
            ErrorCode::FieldMissing | ErrorCode::Bug => ClientError::Bug(message),
            ErrorCode::Unidentified => ClientError::Unidentified(message),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unidentified_is_transient() {
        assert!(ErrorCode::Unidentified.is_transient());
        for code in [
            ErrorCode::NotFound,
            ErrorCode::BadArgument,
            ErrorCode::Conflict,
            ErrorCode::FieldMissing,
            ErrorCode::Bug,
        ] {
            assert!(!code.is_transient(), "{} must not be retried", code);
        }
    }

    #[test]
    fn test_wrap_relabels_and_keeps_cause() {
        let err = ClientError::field_missing("cdrom", "id")
            .wrap(ErrorCode::Bug, "failed to convert CD-ROM");

        assert_eq!(err.code(), ErrorCode::Bug);
        let text = err.to_string();
        assert!(text.contains("failed to convert CD-ROM"));
        assert!(text.contains("cdrom has no id"));
    }

    #[test]
    fn test_wrap_as_field_missing_keeps_the_field() {
        let err = ClientError::field_missing("cdrom", "id")
            .wrap(ErrorCode::FieldMissing, "VM vm-1");
        assert_eq!(err, ClientError::field_missing("VM vm-1: cdrom", "id"));
    }

    #[test]
    fn test_wrap_as_field_missing_without_a_field_is_bug() {
        let err = ClientError::Conflict("name taken".to_string())
            .wrap(ErrorCode::FieldMissing, "updating VM");
        assert_eq!(err.code(), ErrorCode::Bug);
        assert!(err.to_string().contains("name taken"));
    }
}
