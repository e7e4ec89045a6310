//! Direct HTTP(S) streaming resolver for plain media URLs.

use super::{ByteStream, Resolution, ResolvedStream, Resolver};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use tokio_util::io::StreamReader;
use url::Url;

const RESOLVER_ID: &str = "http";

/// Content type prefixes we are willing to pipe into the transcoder.
/// Anything else (notably text/html) falls through to the next resolver.
const MEDIA_CONTENT_TYPES: [&str; 3] = ["audio/", "video/", "application/octet-stream"];

pub struct HttpResolver {
    client: reqwest::Client,
}

impl HttpResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    fn id(&self) -> &str {
        RESOLVER_ID
    }

    async fn resolve(&self, url: &Url, _credential: Option<&str>) -> Result<Resolution> {
        if !matches!(url.scheme(), "http" | "https") {
            return Ok(Resolution::NotApplicable);
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .context("HTTP request failed")?
            .error_for_status()
            .context("HTTP request was rejected")?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !MEDIA_CONTENT_TYPES
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
        {
            debug!("Skipping {} with content type {:?}", url, content_type);
            return Ok(Resolution::NotApplicable);
        }

        let title = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_string());

        let stream: ByteStream = Box::new(StreamReader::new(Box::pin(io_stream(response))));

        Ok(Resolution::Matched(ResolvedStream {
            stream,
            diagnostics: None,
            title,
        }))
    }
}

fn io_stream(response: reqwest::Response) -> impl Stream<Item = std::io::Result<Bytes>> {
    response.bytes_stream().map_err(std::io::Error::other)
}
