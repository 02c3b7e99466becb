//! Error types for zero-vertica.

use thiserror::Error;

/// Result type for zero-vertica operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error/notice fields sent by the server.
#[derive(Debug, Clone, Default)]
pub struct ErrorFields {
    /// Severity: ERROR, FATAL, PANIC, WARNING, NOTICE, INFO, LOG
    pub severity: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub code: Option<String>,
    /// Primary error message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Cursor position in query string (1-based)
    pub position: Option<u32>,
    /// Context/stack trace
    pub where_: Option<String>,
    /// Source file name
    pub file: Option<String>,
    /// Source line number
    pub line: Option<u32>,
    /// Source routine name
    pub routine: Option<String>,
    /// Vertica-specific error code
    pub error_code: Option<String>,
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(severity) = &self.severity {
            write!(f, "Severity: {}, ", severity)?;
        }
        if let Some(message) = &self.message {
            write!(f, "Message: {}", message)?;
        }
        if let Some(code) = &self.code {
            write!(f, ", Sqlstate: {}", code)?;
        }
        if let Some(error_code) = &self.error_code {
            write!(f, ", Error Code: {}", error_code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Error type for zero-vertica.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not connect, or the session broke (TCP, handshake or auth failure).
    #[error("Connection error: {0}")]
    Connection(String),

    /// ErrorResponse on an established session. The socket stays open and the
    /// session is usable once it is back at ReadyForQuery.
    #[error("Connection error: {0}")]
    Server(ErrorFields),

    /// Malformed or unrecognized wire data
    #[error("Message error: {0}")]
    Message(String),

    /// SSL was requested but the server refused it
    #[error("SSL requested but not supported by server")]
    SslNotSupported,

    /// Invalid configuration or usage, detected before any network activity
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
}

impl Error {
    /// Returns true if the connection was closed because of this error.
    pub fn is_connection_broken(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Message(_) | Error::SslNotSupported
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Connection(err.to_string())
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized>
    From<zerocopy::error::CastError<Src, Dst>> for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Message(format!("zerocopy cast error: {err:?}"))
    }
}
