pub mod fetcher;
pub mod transport;

pub use fetcher::{normalize_text, ContentFetcher, PageContent, PageElement};
pub use transport::{AlertMessage, AlertTransport};
