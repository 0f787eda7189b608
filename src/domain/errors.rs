use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, GurlError>;

/// Errors that can end a gurl invocation.
#[derive(Debug, thiserror::Error)]
pub enum GurlError {
    /// Malformed or conflicting command-line input.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A local file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// DNS, connect, TLS or protocol failure while talking to the server.
    #[error("transport error: {0}")]
    Transport(String),

    /// A single attempt did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl GurlError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the retry policy may try again after this error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Argument(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_failures_are_retryable() {
        assert!(GurlError::transport("connection refused").is_transport());
        assert!(GurlError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!GurlError::argument("bad auth").is_transport());
        assert!(!GurlError::io("out.bin", io::Error::other("denied")).is_transport());
    }

    #[test]
    fn argument_errors_exit_with_usage_code() {
        assert_eq!(GurlError::argument("x").exit_code(), 2);
        assert_eq!(GurlError::transport("x").exit_code(), 1);
    }

    #[test]
    fn io_error_names_the_path() {
        let err = GurlError::io("missing.json", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("missing.json: "));
    }
}
