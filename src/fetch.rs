use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

/// Why a category page could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid url for category {slug:?}: {source}")]
    InvalidUrl {
        slug: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with {status}")]
    Status { url: Url, status: StatusCode },
}

/// Fetches category listing pages from one site.
///
/// Holds its own HTTP session; build one per category run and drop it when
/// the run is over.
#[derive(Debug)]
pub struct PageFetcher {
    client: Client,
    site_url: Url,
}

impl PageFetcher {
    pub fn new(site_url: Url, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().default_headers(crate::build_headers());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;

        Ok(PageFetcher { client, site_url })
    }

    /// Listing URL of a category: `<site>/<slug>`.
    pub fn category_url(&self, slug: &str) -> Result<Url, FetchError> {
        let mut base = self.site_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(slug).map_err(|source| FetchError::InvalidUrl {
            slug: slug.to_owned(),
            source,
        })
    }

    /// Fetches `url` and returns its body when the server answers `200 OK`.
    ///
    /// Every other status is a failure, including other 2xx codes. There are
    /// no retries.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .client
            .get(url.to_owned())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!(%url, bytes = body.len(), "fetched listing page");
        Ok(body)
    }
}
