//! Error types for the lxcfs initializer

use thiserror::Error;

/// Main error type for initializer operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error (includes optimistic-concurrency conflicts)
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A request to the API server could not be constructed
    #[error("request error: {0}")]
    Request(String),

    /// Invalid startup configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a request construction error with the given message
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the API server rejected the write because the object changed underneath us
    ///
    /// Covers both `409 Conflict` from a stale resourceVersion on update and
    /// `422` from a failed JSON Patch `test` precondition.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 409 || e.code == 422)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> Error {
        Error::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "the object has been modified".to_string(),
            reason: "Conflict".to_string(),
            code,
        }))
    }

    #[test]
    fn conflict_codes_are_detected() {
        assert!(api_error(409).is_conflict());
        assert!(api_error(422).is_conflict());
        assert!(!api_error(500).is_conflict());
        assert!(!Error::serialization("bad").is_conflict());
    }

    #[test]
    fn serde_errors_convert_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error"));
    }
}
