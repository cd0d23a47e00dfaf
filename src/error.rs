//! # Error Handling System
//!
//! Hierarchical error types for the tagging service, with classification traits
//! and rich error context.
//!
//! ## Architecture
//!
//! - **Error Types**: One enum, one variant per failure family, each carrying an [`ErrorContext`]
//! - **Error Traits**: Retry, severity and recovery-suggestion traits
//! - **Error Context**: Timestamp, operation, severity and a recovery suggestion
//!
//! ## Error Families
//!
//! | Family | Raised by | Handling |
//! |--------|-----------|----------|
//! | `Validation` | form fields, price parsing | reported to the user, nothing mutated |
//! | `Encoding` / `Io` | QR rendering, image writes | reported to the user, record not committed |
//! | `FrameCapture` | a single failed frame grab | retried by the scan loop |
//! | `DeviceUnavailable` | scan loop retry bound exhausted | scan ends, reported to the user |
//!
//! The recovery suggestion doubles as the user-facing message: the web layer
//! shows it in place of the technical `Display` text when present.
//!
//! ## Usage
//!
//! ```rust
//! use stock_tag::error::{TagError, Retryable, HasRecoverySuggestion};
//!
//! let error = TagError::validation("tamanho", "must be one of P, M, G, GG, XG, XGG", "XL")
//!     .with_recovery_suggestion("Tamanho inválido. Utilize P, M, G, GG, XG ou XGG.");
//!
//! assert!(!error.is_retryable());
//! assert_eq!(error.user_message(), "Tamanho inválido. Utilize P, M, G, GG, XG ou XGG.");
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Caused by user input; nothing is wrong with the service
    Warning,
    /// An operation failed
    Error,
    /// A device or resource is gone and needs attention
    Critical,
}

/// Core error context containing metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Suggested recovery action, shown to end users when present
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }
}

/// Base error type for the tagging service
#[derive(Debug)]
pub enum TagError {
    /// Configuration validation errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// User input validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Tag rendering failures
    Encoding {
        stage: String,
        reason: String,
        context: ErrorContext,
    },
    /// A single frame grab failed
    FrameCapture {
        reason: String,
        context: ErrorContext,
    },
    /// The capture device kept failing past the configured bound
    DeviceUnavailable {
        device: String,
        attempts: u32,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
    /// State errors (invalid state transitions, poisoned locks)
    State {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Timeout errors
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },
}

impl TagError {
    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext {
                severity: ErrorSeverity::Warning,
                ..ErrorContext::new()
            },
        }
    }

    /// Create an encoding error
    pub fn encoding(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            stage: stage.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a frame capture error
    pub fn frame_capture(reason: impl Into<String>) -> Self {
        Self::FrameCapture {
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a device-unavailable error
    pub fn device_unavailable(
        device: impl Into<String>,
        attempts: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self::DeviceUnavailable {
            device: device.into(),
            attempts,
            reason: reason.into(),
            context: ErrorContext {
                severity: ErrorSeverity::Critical,
                ..ErrorContext::new()
            },
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.as_ref().display().to_string()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::State {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
            context: ErrorContext::new(),
        }
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Encoding { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::DeviceUnavailable { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Timeout { context, .. } => context,
        }
    }

    /// Get mutable reference to error context
    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Encoding { context, .. } => context,
            Self::FrameCapture { context, .. } => context,
            Self::DeviceUnavailable { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
            Self::State { context, .. } => context,
            Self::Timeout { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::Encoding { .. } => "encoding",
            Self::FrameCapture { .. } => "frame_capture",
            Self::DeviceUnavailable { .. } => "device_unavailable",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
            Self::State { .. } => "state",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self.recovery_suggestion() {
            Some(suggestion) => suggestion.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            TagError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            TagError::Encoding { stage, reason, .. } => {
                write!(f, "Encoding failed during {}: {}", stage, reason)
            }
            TagError::FrameCapture { reason, .. } => {
                write!(f, "Frame capture failed: {}", reason)
            }
            TagError::DeviceUnavailable {
                device,
                attempts,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Capture device '{}' unavailable after {} attempts: {}",
                    device, attempts, reason
                )
            }
            TagError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            TagError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
            TagError::State {
                current_state,
                attempted_operation,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Invalid state '{}' when attempting '{}': {}",
                    current_state, attempted_operation, reason
                )
            }
            TagError::Timeout {
                operation,
                duration_ms,
                ..
            } => {
                write!(f, "Timeout during {} after {}ms", operation, duration_ms)
            }
        }
    }
}

impl StdError for TagError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type TagResult<T> = Result<T, TagError>;

/// Trait for errors that can be retried
pub trait Retryable {
    /// Check if this error can be retried
    fn is_retryable(&self) -> bool;

    /// Get the recommended retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64> {
        None
    }
}

impl Retryable for TagError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FrameCapture { .. } | Self::Timeout { .. } | Self::Io { .. }
        )
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            Self::FrameCapture { .. } => Some(50),
            Self::Timeout { .. } => Some(1000),
            Self::Io { .. } => Some(100),
            _ => None,
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for TagError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for TagError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = TagError::config("bind", "nowhere", "not a socket address");
        assert_eq!(error.category(), "config");
        assert!(!error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_with_suggestion() {
        let error = TagError::encoding("qr_render", "data too long")
            .with_operation("render tag")
            .with_recovery_suggestion("Erro ao gerar QR Code: data too long");

        assert_eq!(error.category(), "encoding");
        assert!(!error.is_retryable());
        assert_eq!(error.context().operation.as_deref(), Some("render tag"));
        assert_eq!(error.user_message(), "Erro ao gerar QR Code: data too long");
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let error = TagError::timeout("scan_result", 5000);
        assert_eq!(error.user_message(), "Timeout during scan_result after 5000ms");
    }

    #[test]
    fn test_error_traits() {
        let capture = TagError::frame_capture("camera returned no frame");
        assert!(capture.is_retryable());
        assert_eq!(capture.retry_delay_ms(), Some(50));

        let device = TagError::device_unavailable("camera:0", 300, "no frames");
        assert!(!device.is_retryable());
        assert_eq!(device.severity(), ErrorSeverity::Critical);

        let state = TagError::state("scanning", "start scan", "busy");
        assert!(!state.is_retryable());
        assert_eq!(state.retry_delay_ms(), None);
    }

    #[test]
    fn test_validation_is_a_warning() {
        let error = TagError::validation("produto", "letters only", "Camis4")
            .with_recovery_suggestion("Entradas inválidas.");
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.recovery_suggestion(), Some("Entradas inválidas."));
    }
}
