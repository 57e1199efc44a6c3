//! # Error Types
//!
//! Error taxonomy for configuration-center operations using `thiserror`.

/// Custom result type for gantry operations
pub type Result<T> = std::result::Result<T, GantryError>;

/// Main error type for gantry
#[derive(thiserror::Error, Debug)]
pub enum GantryError {
    /// Tenant or project missing from a config item identity
    #[error("Invalid identity: {message}")]
    InvalidIdentity { message: String },

    /// Zero or ambiguous matches for a lookup
    #[error("Resource not found: {resource_type} '{id}'")]
    NotFound { resource_type: String, id: String },

    /// A list/create step of access provisioning failed
    #[error("Provisioning failed at '{step}': {source}")]
    ProvisioningFailed {
        step: String,
        #[source]
        source: Box<GantryError>,
    },

    /// Transport-level failure talking to a config center
    #[error("Backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// The config center answered a well-formed request with a failure status
    #[error("Backend '{backend}' rejected request: {message} (status: {status})")]
    BackendRejected { backend: String, status: u16, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GantryError {
    /// Create an invalid identity error
    pub fn invalid_identity<S: Into<String>>(message: S) -> Self {
        Self::InvalidIdentity { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Wrap a failed provisioning step
    pub fn provisioning<S: Into<String>>(step: S, source: GantryError) -> Self {
        Self::ProvisioningFailed { step: step.into(), source: Box::new(source) }
    }

    /// Create a backend unavailable error
    pub fn unavailable<B: Into<String>, M: Into<String>>(backend: B, message: M) -> Self {
        Self::BackendUnavailable { backend: backend.into(), message: message.into() }
    }

    /// Create a backend rejected error
    pub fn rejected<B: Into<String>, M: Into<String>>(backend: B, status: u16, message: M) -> Self {
        Self::BackendRejected { backend: backend.into(), status, message: message.into() }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Attach context to a database error
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// Nothing inside gantry retries; this only informs caller policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            GantryError::BackendUnavailable { .. } => true,
            GantryError::Database { .. } => true,
            GantryError::Io { .. } => true,
            GantryError::BackendRejected { status, .. } => *status >= 500,
            GantryError::ProvisioningFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, GantryError::NotFound { .. })
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for GantryError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for GantryError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for GantryError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for GantryError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<sqlx::migrate::MigrateError> for GantryError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::config_with_source("Database migration failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for GantryError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = GantryError::config("Test configuration error");
        assert!(matches!(error, GantryError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_provisioning_error_wraps_source() {
        let error = GantryError::provisioning(
            "create user",
            GantryError::rejected("nacos", 403, "permission denied"),
        );
        assert!(error.to_string().contains("create user"));
        assert!(error.to_string().contains("permission denied"));
        let source = std::error::Error::source(&error).unwrap();
        assert!(source.to_string().contains("403"));
    }

    #[test]
    fn test_validation_error() {
        let error = GantryError::validation_field("Root must not contain '/'", "root");
        if let GantryError::Validation { field, .. } = error {
            assert_eq!(field, Some("root".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_retryable_errors() {
        assert!(GantryError::unavailable("etcd", "connection refused").is_retryable());
        assert!(GantryError::rejected("nacos", 503, "busy").is_retryable());
        assert!(!GantryError::rejected("nacos", 400, "bad request").is_retryable());
        assert!(!GantryError::invalid_identity("tenant missing").is_retryable());
        assert!(!GantryError::not_found("config", "t/p/e/k").is_retryable());
        assert!(GantryError::provisioning("list users", GantryError::unavailable("etcd", "eof"))
            .is_retryable());
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: GantryError = io_error.into();
        assert!(matches!(error, GantryError::Io { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: GantryError = json_error.into();
        assert!(matches!(error, GantryError::Serialization { .. }));
    }
}
