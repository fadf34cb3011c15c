//! Remote gallery index, as the UI core sees it.
//!
//! All methods initiate a request and return immediately; replies come
//! back on the UI thread tagged with the epoch or job token that was
//! issued when the request started. Receivers check freshness before
//! applying a reply, so responses that arrive after selection mode
//! exited or after a newer request superseded them are dropped.

use crate::error::MedleyError;
use crate::models::{ItemDescriptor, ItemId, ViewQuery};

/// A bulk operation applied to every selected item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    /// Apply a tag to the items.
    Tag(String),
    /// Mark the items as favorites.
    Favorite,
}

impl BulkAction {
    pub fn describe(&self) -> String {
        match self {
            Self::Tag(tag) => format!("tag \"{tag}\""),
            Self::Favorite => "favorite".to_owned(),
        }
    }
}

/// One reply from the remote index, delivered to the UI thread.
#[derive(Debug)]
pub enum RemoteReply {
    /// Complete ordered id list for a select-all fetch.
    Listing {
        epoch: u64,
        result: Result<Vec<(ItemId, ItemDescriptor)>, MedleyError>,
    },
    /// Directory listing for populating the gallery view.
    Browse {
        query: ViewQuery,
        result: Result<Vec<(ItemId, ItemDescriptor)>, MedleyError>,
    },
    /// Batched bulk apply: number of items the server processed.
    Bulk {
        job: u64,
        result: Result<usize, MedleyError>,
    },
    /// Single-id fallback apply.
    Single {
        job: u64,
        id: ItemId,
        result: Result<(), MedleyError>,
    },
}

/// Server endpoints consumed by the core: full ordered listing, batched
/// tag/favorite apply, and single-id fallbacks for both.
pub trait RemoteIndex {
    /// Fetch the complete ordered id list for `query` (select-all).
    fn fetch_listing(&self, query: ViewQuery, epoch: u64);

    /// Fetch the directory listing for `query` (gallery population).
    fn fetch_browse(&self, query: ViewQuery);

    /// Apply `action` to all `ids` in one batched call.
    fn apply_bulk(&self, action: BulkAction, ids: Vec<ItemId>, job: u64);

    /// Apply `action` to a single id (sequential fallback path).
    fn apply_single(&self, action: BulkAction, id: ItemId, job: u64);
}
