//! Remote texture downloads.
//!
//! The cache never awaits anything itself. It hands out [`FetchJob`]s that
//! the host runs on its async runtime; each job reports back through a
//! channel the cache drains once per frame.

use std::future::Future;
use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::texture::{Texture, TextureHandle};

/// Whether `key` is an absolute http(s) URL with a host.
#[must_use]
pub fn is_texture_url(key: &str) -> bool {
    Url::parse(key)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

/// Downloads raw bytes for a URL.
pub trait UrlFetcher: Send + Sync {
    /// Fetch `url`, failing if the body is larger than `size_limit` bytes.
    fn fetch_bytes(
        &self,
        url: &str,
        size_limit: usize,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// HTTP fetcher backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl UrlFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str, size_limit: usize) -> Result<Vec<u8>> {
        let url = Url::parse(url).map_err(|_| Error::InvalidUrl(url.to_string()))?;
        debug!("Fetching {url}");

        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let limit = size_limit as u64;
        if let Some(length) = response.content_length()
            && length > limit
        {
            return Err(Error::PayloadTooLarge {
                limit: size_limit,
                actual: length,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > size_limit {
                return Err(Error::PayloadTooLarge {
                    limit: size_limit,
                    actual: body.len() as u64,
                });
            }
        }
        Ok(body)
    }
}

impl<T: UrlFetcher> UrlFetcher for Arc<T> {
    fn fetch_bytes(
        &self,
        url: &str,
        size_limit: usize,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send {
        (**self).fetch_bytes(url, size_limit)
    }
}

/// Outcome of a download, keyed by the texture key that requested it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub key: String,
    /// `None` when the download or decode failed.
    pub texture: Option<TextureHandle>,
}

/// A pending texture download.
#[derive(Debug)]
pub struct FetchJob {
    pub key: String,
    pub size_limit: usize,
    pub mipmaps: bool,
    tx: async_channel::Sender<FetchResult>,
}

impl FetchJob {
    pub(crate) const fn new(
        key: String,
        size_limit: usize,
        mipmaps: bool,
        tx: async_channel::Sender<FetchResult>,
    ) -> Self {
        Self {
            key,
            size_limit,
            mipmaps,
            tx,
        }
    }

    /// Download and decode the texture, then report the result. A result
    /// is always sent so the cache can clear the in-flight marker.
    pub async fn run<F: UrlFetcher + ?Sized>(self, fetcher: &F) {
        let texture = match fetcher.fetch_bytes(&self.key, self.size_limit).await {
            Ok(bytes) => match Texture::decode(name_from_url(&self.key), &bytes) {
                Ok(texture) => Some(Arc::new(texture.with_mipmaps(self.mipmaps))),
                Err(err) => {
                    warn!("Failed to decode texture from {}: {err}", self.key);
                    None
                }
            },
            Err(err) => {
                warn!("Failed to download texture from {}: {err}", self.key);
                None
            }
        };

        let result = FetchResult {
            key: self.key,
            texture,
        };
        if self.tx.send(result).await.is_err() {
            debug!("Texture cache dropped before fetch completed");
        }
    }
}

fn name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| url.to_string())
}
