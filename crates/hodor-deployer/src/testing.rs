// testing.rs — Fixtures for tests: archive builder and in-memory fetchers.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Mutex;

use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Url;
use tar::{Builder, EntryType, Header};

use crate::error::FetchError;
use crate::fetch::Fetcher;

/// One entry of a fixture archive.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// Build a gzip-compressed tarball holding `entries` in order.
pub fn release_archive(entries: &[Entry<'_>]) -> Vec<u8> {
    gzip(&tarball(entries))
}

/// Build an uncompressed tarball holding `entries` in order.
pub fn tarball(entries: &[Entry<'_>]) -> Vec<u8> {
    try_tarball(entries).expect("building an in-memory tarball cannot fail")
}

/// Compress `data` as a single gzip member.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("compressing in memory cannot fail");
    encoder.finish().expect("compressing in memory cannot fail")
}

fn try_tarball(entries: &[Entry<'_>]) -> io::Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());

    for entry in entries {
        let mut header = Header::new_gnu();
        match *entry {
            Entry::Dir(name) => {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder.append_data(&mut header, name, io::empty())?;
            }
            Entry::File(name, content) => {
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(content.len() as u64);
                builder.append_data(&mut header, name, content)?;
            }
        }
    }

    builder.into_inner()
}

/// Serves fixed payloads by URL; unknown URLs fail like a 404 would.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    payloads: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `payload` for `url`, replacing any earlier payload.
    pub fn serve(&self, url: &Url, payload: Vec<u8>) {
        self.payloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), payload);
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &Url) -> Result<Box<dyn Read + Send>, FetchError> {
        let payloads = self.payloads.lock().unwrap_or_else(|e| e.into_inner());
        match payloads.get(url.as_str()) {
            Some(payload) => Ok(Box::new(Cursor::new(payload.clone()))),
            None => Err(FetchError::Unavailable(format!("no payload for {url}"))),
        }
    }
}

/// A fetcher whose every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn fetch(&self, _url: &Url) -> Result<Box<dyn Read + Send>, FetchError> {
        Err(FetchError::Unavailable("fake".to_string()))
    }
}

/// Parse a URL literal used by a test.
pub fn url(raw: &str) -> Url {
    Url::parse(raw).expect("test URL must parse")
}
