//! Error types for option loading

/// Failure to fetch a list of options
///
/// Recovered locally: the chain shows it inline on the affected field and
/// never lets it escape into the surrounding form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("server responded with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Response body could not be decoded
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Fetch did not complete in time
    #[error("fetch timed out after {after_ms}ms")]
    Timeout {
        /// Elapsed budget in milliseconds
        after_ms: u64,
    },

    /// Source refused the request
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl FetchError {
    /// Check if retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Status { status } => *status >= 500,
            Self::Decode(_) | Self::Rejected(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let err = FetchError::Status { status: 500 };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn fetch_error_is_retryable() {
        assert!(FetchError::Status { status: 503 }.is_retryable());
        assert!(FetchError::Timeout { after_ms: 10 }.is_retryable());
        assert!(!FetchError::Status { status: 404 }.is_retryable());
        assert!(!FetchError::Decode("bad".to_string()).is_retryable());
    }
}
