use super::http::HttpClient;
use crate::core::analytics::RateEvent;
use crate::core::config::ProviderConfig;
use crate::core::models::Rate;
use crate::core::network::{Endpoint, HttpMethod, NetworkError, RateSource};
use crate::feed::{RateFeed, RateOrigin, RateUpdate};
use crate::telemetry::EventLog;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

const USD: &str = "USD";

/// GET `{base_url}{path}` on the price ticker.
pub struct TickerEndpoint {
    base_url: String,
    path: String,
}

impl TickerEndpoint {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            path: path.to_string(),
        }
    }
}

impl Endpoint for TickerEndpoint {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyRate {
    last: Decimal,
}

/// Ticker body: currency code to its latest trade price.
type TickerResponse = HashMap<String, CurrencyRate>;

/// Fetches the USD rate from the ticker, one round-trip per call.
pub struct RateFetcher {
    client: HttpClient,
    endpoint: TickerEndpoint,
    events: EventLog,
    feed: RateFeed,
}

impl RateFetcher {
    pub fn new(client: HttpClient, endpoint: TickerEndpoint, events: EventLog, feed: RateFeed) -> Self {
        Self {
            client,
            endpoint,
            events,
            feed,
        }
    }

    pub fn from_config(
        config: &ProviderConfig,
        events: EventLog,
        feed: RateFeed,
    ) -> Result<Self, NetworkError> {
        Ok(Self::new(
            HttpClient::new(config.timeout())?,
            TickerEndpoint::new(&config.base_url, &config.path),
            events,
            feed,
        ))
    }
}

#[async_trait]
impl RateSource for RateFetcher {
    #[instrument(name = "TickerFetch", skip(self))]
    async fn fetch_rate(&self) -> Result<Rate, NetworkError> {
        let response: TickerResponse = self.client.request(&self.endpoint).await?;

        let usd = response.get(USD).ok_or(NetworkError::NoData)?.last;
        let rate = Rate::new(usd).map_err(|e| NetworkError::Decoding(e.to_string()))?;
        debug!(rate = %usd, "Received USD rate");

        self.feed.publish(RateUpdate {
            value: rate.value(),
            origin: RateOrigin::Internet,
            observed_at: rate.observed_at(),
        });
        self.events.record_event(&RateEvent::RateUpdated {
            rate: usd.to_string(),
        });
        Ok(rate)
    }
}
