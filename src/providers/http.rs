use crate::core::network::{Endpoint, HttpMethod, NetworkError};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// Executes endpoint requests and decodes JSON responses. Never retries.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .user_agent("ratewatch/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| {
                debug!(error = %e, "Failed to build HTTP client");
                NetworkError::Unknown
            })?;
        Ok(Self { client })
    }

    fn build_url(endpoint: &dyn Endpoint) -> Result<Url, NetworkError> {
        let mut url = Url::parse(&format!("{}{}", endpoint.base_url(), endpoint.path()))
            .map_err(|_| NetworkError::InvalidUrl)?;

        let query = endpoint.query();
        if endpoint.method() == HttpMethod::Get && !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
        }
    }

    fn transport_error(err: reqwest::Error) -> NetworkError {
        if err.is_builder() {
            NetworkError::Unknown
        } else {
            NetworkError::Network(err.to_string())
        }
    }

    #[instrument(
        name = "HttpRequest",
        skip(self, endpoint),
        fields(method = %endpoint.method(), path = %endpoint.path())
    )]
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &dyn Endpoint,
    ) -> Result<T, NetworkError> {
        let url = Self::build_url(endpoint)?;
        debug!("Requesting {}", url);

        let mut request = self.client.request(Self::method(endpoint.method()), url);
        for (name, value) in endpoint.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(Self::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            debug!(status = %status, "Non-success response");
            return Err(NetworkError::Server(status.as_u16()));
        }

        let body = response.bytes().await.map_err(Self::transport_error)?;
        if body.is_empty() {
            return Err(NetworkError::NoData);
        }

        serde_json::from_slice(&body).map_err(|e| {
            debug!(error = %e, body = %String::from_utf8_lossy(&body), "Failed to decode response");
            NetworkError::Decoding(e.to_string())
        })
    }
}
