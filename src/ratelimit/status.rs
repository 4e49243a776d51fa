//! Classification of upstream responses for backoff decisions.

use serde::{Deserialize, Serialize};

/// How a response should influence the request spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Anything that is neither throttled nor a server failure
    Ok,
    /// The service explicitly asked us to slow down (HTTP 429)
    RateLimited,
    /// The service failed (HTTP 5xx)
    ServerError,
}

impl ResponseStatus {
    /// Classify an HTTP status code.
    pub fn from_code(code: u16) -> Self {
        match code {
            429 => ResponseStatus::RateLimited,
            500..=599 => ResponseStatus::ServerError,
            _ => ResponseStatus::Ok,
        }
    }

    /// Whether this status counts as a consecutive error.
    pub fn is_error(&self) -> bool {
        !matches!(self, ResponseStatus::Ok)
    }
}

impl From<u16> for ResponseStatus {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(ResponseStatus::from_code(200), ResponseStatus::Ok);
        assert_eq!(ResponseStatus::from_code(404), ResponseStatus::Ok);
        assert_eq!(ResponseStatus::from_code(429), ResponseStatus::RateLimited);
        assert_eq!(ResponseStatus::from_code(500), ResponseStatus::ServerError);
        assert_eq!(ResponseStatus::from_code(503), ResponseStatus::ServerError);
        assert_eq!(ResponseStatus::from_code(599), ResponseStatus::ServerError);
        assert_eq!(ResponseStatus::from_code(600), ResponseStatus::Ok);
    }

    #[test]
    fn test_is_error() {
        assert!(!ResponseStatus::Ok.is_error());
        assert!(ResponseStatus::RateLimited.is_error());
        assert!(ResponseStatus::from(502).is_error());
    }
}
