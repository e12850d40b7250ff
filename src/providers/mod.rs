pub mod blockchain_info;
pub mod http;

pub use blockchain_info::{RateFetcher, TickerEndpoint};
pub use http::HttpClient;
