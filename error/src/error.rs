use thiserror::Error;

/// Shown whenever a failure carries no usable message of its own.
pub const FALLBACK_MESSAGE: &str = "Failed to fetch";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The request never completed: dns, connect, timeout.
    #[error("network failure: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("remote failure ({status}): {}", .message.as_deref().unwrap_or(FALLBACK_MESSAGE))]
    Remote {
        status: u16,
        message: Option<String>,
    },

    #[error("could not serialize query: {0}")]
    Serialization(String),

    #[error("could not decode payload: {0}")]
    Decode(String),

    /// Client setup which can never succeed: a bad base url or header.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FetchError {
    pub fn network<S: Into<String>>(message: S) -> Self {
        FetchError::Network(message.into())
    }

    pub fn remote(status: u16, message: Option<String>) -> Self {
        FetchError::Remote { status, message }
    }

    /// Human-readable text for a failed fetch.
    ///
    /// Transport and remote failures only contribute their own message, empty
    /// or missing messages fall back to [`FALLBACK_MESSAGE`].
    pub fn message(&self) -> String {
        let message = match self {
            FetchError::Network(message) => Some(message.clone()),
            FetchError::Remote { message, .. } => message.clone(),
            FetchError::Serialization(_) | FetchError::Decode(_) | FetchError::Config(_) => {
                Some(self.to_string())
            }
        };

        message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(value: serde_json::Error) -> Self {
        FetchError::Decode(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::{FALLBACK_MESSAGE, FetchError};

    #[test]
    fn prefers_transport_message() {
        let err = FetchError::network("connection refused");
        assert_eq!(err.message(), "connection refused");

        let err = FetchError::remote(404, Some(String::from("Product not found")));
        assert_eq!(err.message(), "Product not found");
    }

    #[test]
    fn falls_back() {
        assert_eq!(FetchError::network("").message(), FALLBACK_MESSAGE);
        assert_eq!(FetchError::network("   ").message(), FALLBACK_MESSAGE);
        assert_eq!(FetchError::remote(500, None).message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn display() {
        let err = FetchError::remote(500, None);
        assert_eq!(err.to_string(), "remote failure (500): Failed to fetch");

        let err = FetchError::Config(String::from("invalid header X Shop"));
        assert_eq!(err.message(), "invalid configuration: invalid header X Shop");
    }

    #[test]
    fn from_json() {
        let err: FetchError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(err.message().starts_with("could not decode payload"));
    }
}
