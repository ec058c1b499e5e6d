// Content fetcher implementations
pub mod browser;
pub mod http;

pub use browser::BrowserFetcher;
pub use http::HttpFetcher;
