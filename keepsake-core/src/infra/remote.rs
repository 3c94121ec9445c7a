//! HTTP accessor for the remote media library.
//!
//! `GET {base}/v1/owners/{owner}/media` returns a JSON array of wire items.
//! Remote references are fetched with a plain `GET`; relative references are
//! resolved against the base URL.

use std::time::Duration;

use async_trait::async_trait;
use keepsake_contracts::{LibraryError, RemoteLibrary};
use keepsake_model::{MediaItem, MediaItemWire, OwnerId};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use url::Url;

/// Map a non-success status to the library error taxonomy.
pub fn classify_status(status: StatusCode, context: &str) -> LibraryError {
    let message = format!("{context}: HTTP {status}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LibraryError::PermissionDenied(message)
        }
        s if s.is_server_error() => LibraryError::Connectivity(message),
        _ => LibraryError::Remote(message),
    }
}

/// Transport failures mean the library could not be reached, except for
/// bodies that arrived but could not be decoded.
pub fn classify_transport(err: &reqwest::Error, context: &str) -> LibraryError {
    if err.is_decode() {
        LibraryError::Remote(format!("{context}: malformed response: {err}"))
    } else if let Some(status) = err.status() {
        classify_status(status, context)
    } else {
        LibraryError::Connectivity(format!("{context}: {err}"))
    }
}

#[derive(Debug, Clone)]
pub struct HttpRemoteLibrary {
    client: Client,
    base_url: Url,
}

impl HttpRemoteLibrary {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, LibraryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                LibraryError::Remote(format!(
                    "failed to build HTTP client: {e}"
                ))
            })?;

        info!(base_url = %base_url, "remote library client created");
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// `{base}/v1/owners/{owner}/media`, with the owner id percent-encoded.
    pub fn media_list_url(&self, owner: &OwnerId) -> Result<Url, LibraryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LibraryError::Remote(format!(
                    "base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(["v1", "owners", owner.as_str(), "media"]);
        Ok(url)
    }

    fn reference_url(&self, reference: &str) -> Result<Url, String> {
        match Url::parse(reference) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .join(reference)
                .map_err(|e| format!("invalid reference '{reference}': {e}")),
            Err(e) => Err(format!("invalid reference '{reference}': {e}")),
        }
    }
}

#[async_trait]
impl RemoteLibrary for HttpRemoteLibrary {
    async fn list_media(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<MediaItem>, LibraryError> {
        let url = self.media_list_url(owner)?;
        let context = "list media";

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport(&e, context))?;
        if !response.status().is_success() {
            return Err(classify_status(response.status(), context));
        }

        let raw: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| classify_transport(&e, context))?;

        let total = raw.len();
        let mut items = Vec::with_capacity(total);
        for value in raw {
            let parsed = serde_json::from_value::<MediaItemWire>(value)
                .map_err(|e| e.to_string())
                .and_then(|wire| {
                    MediaItem::try_from(wire).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(item) => items.push(item),
                Err(reason) => warn!(
                    owner = %owner,
                    reason,
                    "skipping malformed media item"
                ),
            }
        }

        debug!(
            owner = %owner,
            total,
            usable = items.len(),
            "remote media listed"
        );
        Ok(items)
    }

    async fn fetch_reference(
        &self,
        item: &MediaItem,
        reference: &str,
    ) -> Result<Vec<u8>, LibraryError> {
        let resolution = |reason: String| LibraryError::Resolution {
            id: item.id.clone(),
            reason,
        };
        let url = self.reference_url(reference).map_err(resolution)?;
        let context = "fetch media";
        let transport = |e: reqwest::Error| {
            resolution(classify_transport(&e, context).to_string())
        };

        let response =
            self.client.get(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(resolution(
                classify_status(response.status(), context).to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}
