//! Fetch Module
//!
//! The network seam shared by the preload engine, the integrity checker and
//! the edge cache.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

// == Fetched Resource ==
/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedResource {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the content type is an image type or absent.
    ///
    /// Servers that send no content type get the benefit of the doubt.
    pub fn is_image(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.trim().to_ascii_lowercase().starts_with("image/"),
            None => true,
        }
    }
}

// == Fetcher Trait ==
/// Performs a GET and returns the whole response.
///
/// A non-2xx status is an `Ok` response; `Err` means no response arrived.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

// == HTTP Fetcher ==
/// reqwest-backed fetcher used in production.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(FetchedResource {
            status,
            content_type,
            body,
        })
    }
}
