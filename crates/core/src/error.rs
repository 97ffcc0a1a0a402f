//! Unified error types for bancast.
//!
//! Display output carries a stable `CODE:` prefix so log lines and CLI
//! messages stay greppable across releases.

/// Unified error types for the bancast invalidation core.
///
/// Upstream non-2xx statuses are deliberately absent: the cache layer
/// answering at all is data, not an error. They are recorded per host in
/// [`crate::report::DispatchReport`] and in [`crate::report::ProbeReport`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Operator tag input reduced to an empty set.
    #[error("INVALID_TAGS: {0}")]
    InvalidTags(String),

    /// A single tag is unusable (e.g. contains the wire delimiter).
    #[error("INVALID_TAG: {0}")]
    InvalidTag(String),

    /// Malformed or empty URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// URL scheme other than http/https.
    #[error("UNSUPPORTED_SCHEME: {0}")]
    UnsupportedScheme(String),

    /// Hostname that cannot be carried in a Host header.
    #[error("INVALID_HOST: {0}")]
    InvalidHost(String),

    /// The underlying HTTP client could not be constructed.
    #[error("CLIENT_BUILD: {0}")]
    ClientBuild(String),

    /// Request exceeded the configured timeout.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// Connection-level failure (refused, reset, TLS, DNS).
    #[error("TRANSPORT: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidTags("no tags after trimming".to_string());
        assert!(err.to_string().contains("INVALID_TAGS"));
        assert!(err.to_string().contains("no tags after trimming"));
    }

    #[test]
    fn test_transport_display() {
        let err = Error::Transport("connection refused".to_string());
        assert!(err.to_string().starts_with("TRANSPORT:"));
    }
}
