//! # Error Handling
//!
//! Error types for the secret cache, built with `thiserror`.
//!
//! Every variant owns its data as plain strings so that an error can be
//! cached inside a snapshot and handed to each reader as an independent copy.

/// Custom result type for secret cache operations
pub type Result<T> = std::result::Result<T, SecretCacheError>;

/// Main error type for the secret cache
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretCacheError {
    /// A read for a key that no registered pod references.
    #[error("secret \"{namespace}\"/\"{name}\" not registered")]
    NotRegistered { namespace: String, name: String },

    /// The source confirmed that the secret does not exist.
    #[error("secret \"{namespace}\"/\"{name}\" not found")]
    NotFound { namespace: String, name: String },

    /// Any other failure while fetching from the source.
    #[error("failed to fetch secret \"{namespace}\"/\"{name}\": {message}")]
    Fetch { namespace: String, name: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SecretCacheError {
    /// Create a not registered error.
    pub fn not_registered(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotRegistered { namespace: namespace.into(), name: name.into() }
    }

    /// Create a not found error.
    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound { namespace: namespace.into(), name: name.into() }
    }

    /// Create a transient fetch error.
    pub fn fetch(
        namespace: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Fetch { namespace: namespace.into(), name: name.into(), message: message.into() }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether the source reported that the secret does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the read targeted a key without an active reference.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered { .. })
    }

    /// Whether the error is a source failure other than "not found".
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

impl From<validator::ValidationErrors> for SecretCacheError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages("", &errors, &mut messages);
        messages.sort();

        Self::validation(format!("Validation failed: {}", messages.join("; ")))
    }
}

/// Flatten nested validation errors into `path.to.field: message` entries.
fn collect_validation_messages(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                out.push(format!("{}: {}", path, error_messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_messages(&path, nested, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}
