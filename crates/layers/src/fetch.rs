use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status { url: String, status: u16 },
    /// The request never produced a response body.
    Network { url: String, message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status { url, status } => write!(f, "HTTP {status} from {url}"),
            FetchError::Network { url, message } => write!(f, "request to {url} failed: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Retrieves source text for a layer.
///
/// One call is one request: no retry, no backoff.
#[allow(async_fn_in_trait)]
pub trait DataFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}
