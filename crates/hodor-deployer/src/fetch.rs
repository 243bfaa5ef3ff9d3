// fetch.rs — Fetcher trait and the HTTP implementation.
//
// The installer never talks to the network directly; it asks a Fetcher for a
// reader over the archive bytes. Production uses HttpFetcher, tests serve
// fixtures from memory.

use std::io::Read;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::error::FetchError;

/// Source of release archives.
pub trait Fetcher: Send + Sync {
    /// Open the archive at `url` for reading.
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, FetchError>;
}

/// Downloads archives with a blocking HTTP client.
///
/// Must be used off any async runtime: the worker thread is a plain thread.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("hodor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, FetchError> {
        let response = self.client.get(url.clone()).send()?.error_for_status()?;
        tracing::debug!(
            url = %url,
            content_length = ?response.content_length(),
            "fetching release archive"
        );
        Ok(Box::new(response))
    }
}
