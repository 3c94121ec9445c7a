use async_trait::async_trait;
use keepsake_model::{ContentSource, MediaItem, OwnerId};

use crate::error::LibraryError;

/// Read access to an owner's remote media library.
#[async_trait]
pub trait RemoteLibrary: Send + Sync {
    /// Full metadata list of the owner's media. May be empty.
    async fn list_media(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<MediaItem>, LibraryError>;

    /// Retrieve the bytes behind a remote reference.
    async fn fetch_reference(
        &self,
        item: &MediaItem,
        reference: &str,
    ) -> Result<Vec<u8>, LibraryError>;

    /// Materialize an item's bytes, decoding inline payloads locally and
    /// fetching remote references through [`RemoteLibrary::fetch_reference`].
    async fn resolve_bytes(
        &self,
        item: &MediaItem,
    ) -> Result<Vec<u8>, LibraryError> {
        match &item.source {
            ContentSource::Inline(payload) => {
                payload.decode().map_err(|err| LibraryError::Resolution {
                    id: item.id.clone(),
                    reason: err.to_string(),
                })
            }
            ContentSource::Remote(reference) => {
                self.fetch_reference(item, reference).await
            }
        }
    }
}
