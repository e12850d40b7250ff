//! HTTP abstractions: endpoint descriptors and the network error taxonomy

use crate::core::models::Rate;
use async_trait::async_trait;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("No data received")]
    NoData,
    #[error("Decoding error: {0}")]
    Decoding(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error with code: {0}")]
    Server(u16),
    #[error("Unknown error occurred")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HttpMethod::Get => "GET",
                HttpMethod::Post => "POST",
                HttpMethod::Put => "PUT",
                HttpMethod::Delete => "DELETE",
                HttpMethod::Patch => "PATCH",
            }
        )
    }
}

/// Describes a single HTTP call; the URL is `base_url` followed by `path`.
pub trait Endpoint: Send + Sync {
    fn base_url(&self) -> &str;
    fn path(&self) -> &str;
    fn method(&self) -> HttpMethod;

    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Query parameters, only applied to GET requests.
    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// A source of the current USD rate. The returned sample is the one announced to listeners.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self) -> Result<Rate, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            NetworkError::Server(500).to_string(),
            "Server error with code: 500"
        );
        assert_eq!(NetworkError::NoData.to_string(), "No data received");
        assert_eq!(HttpMethod::Get.to_string(), "GET");
    }
}
