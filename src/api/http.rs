//! HTTP implementation of the remote gallery index.
//!
//! Requests run on a small background tokio runtime; replies cross back
//! to the UI thread over a flume channel that the window drains from a
//! glib timeout. The UI thread itself never blocks on the network.

use anyhow::{Context, Result};
use flume::Sender;
use serde::{Deserialize, Serialize};
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};
use tracing::{debug, warn};

use crate::error::MedleyError;
use crate::models::{ItemDescriptor, ItemId, ItemKind, ViewQuery};

use super::remote::{BulkAction, RemoteIndex, RemoteReply};

#[derive(Debug, Deserialize)]
struct ListedItem {
    id: String,
    name: String,
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    items: Vec<ListedItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    applied: usize,
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct SingleRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    id: &'a str,
}

/// Remote index backed by the gallery server's HTTP API.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    runtime: Runtime,
    replies: Sender<RemoteReply>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, replies: Sender<RemoteReply>) -> Result<Self> {
        let runtime = RuntimeBuilder::new_multi_thread()
            .worker_threads(2)
            .thread_name("medley-net")
            .enable_all()
            .build()
            .context("Failed to start network runtime")?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("medley/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            runtime,
            replies,
        })
    }

    fn listing_url(&self, query: &ViewQuery) -> String {
        let mut url = format!(
            "{}/api/listing?dir={}&sort={}",
            self.base_url,
            urlencode(&query.directory),
            query.sort.as_query_str(),
        );
        if let Some(filter) = &query.filter {
            url.push_str("&filter=");
            url.push_str(&urlencode(filter));
        }
        url
    }

    fn action_url(&self, action: &BulkAction, single: bool) -> String {
        let base = match action {
            BulkAction::Tag(_) => "tags",
            BulkAction::Favorite => "favorites",
        };
        let suffix = if single { "apply-one" } else { "apply" };
        format!("{}/api/{base}/{suffix}", self.base_url)
    }

    async fn fetch_items(
        client: reqwest::Client,
        url: String,
    ) -> Result<Vec<(ItemId, ItemDescriptor)>, MedleyError> {
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(MedleyError::network)?
            .error_for_status()
            .map_err(MedleyError::network)?;
        let listing: ListingResponse =
            response.json().await.map_err(MedleyError::bad_response)?;
        Ok(listing
            .items
            .into_iter()
            .map(|item| {
                (
                    ItemId::new(item.id),
                    ItemDescriptor::new(item.name, ItemKind::from_label(&item.kind)),
                )
            })
            .collect())
    }

    fn send_reply(replies: &Sender<RemoteReply>, reply: RemoteReply) {
        // Receiver gone means the window is shutting down.
        if replies.send(reply).is_err() {
            debug!("reply channel closed, dropping remote reply");
        }
    }
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

impl RemoteIndex for HttpRemote {
    fn fetch_listing(&self, query: ViewQuery, epoch: u64) {
        let client = self.client.clone();
        let url = self.listing_url(&query);
        let replies = self.replies.clone();
        debug!(%url, epoch, "fetching complete listing");
        self.runtime.spawn(async move {
            let result = Self::fetch_items(client, url).await;
            if let Err(err) = &result {
                warn!(%err, epoch, "listing fetch failed");
            }
            Self::send_reply(&replies, RemoteReply::Listing { epoch, result });
        });
    }

    fn fetch_browse(&self, query: ViewQuery) {
        let client = self.client.clone();
        let url = self.listing_url(&query);
        let replies = self.replies.clone();
        debug!(%url, "fetching browse listing");
        self.runtime.spawn(async move {
            let result = Self::fetch_items(client, url).await;
            Self::send_reply(&replies, RemoteReply::Browse { query, result });
        });
    }

    fn apply_bulk(&self, action: BulkAction, ids: Vec<ItemId>, job: u64) {
        let client = self.client.clone();
        let url = self.action_url(&action, false);
        let replies = self.replies.clone();
        self.runtime.spawn(async move {
            let tag = match &action {
                BulkAction::Tag(tag) => Some(tag.as_str()),
                BulkAction::Favorite => None,
            };
            let body = BulkRequest {
                tag,
                ids: ids.iter().map(ItemId::as_str).collect(),
            };
            let result = async {
                let response = client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(MedleyError::network)?
                    .error_for_status()
                    .map_err(MedleyError::network)?;
                let bulk: BulkResponse =
                    response.json().await.map_err(MedleyError::bad_response)?;
                Ok(bulk.applied)
            }
            .await;
            Self::send_reply(&replies, RemoteReply::Bulk { job, result });
        });
    }

    fn apply_single(&self, action: BulkAction, id: ItemId, job: u64) {
        let client = self.client.clone();
        let url = self.action_url(&action, true);
        let replies = self.replies.clone();
        self.runtime.spawn(async move {
            let tag = match &action {
                BulkAction::Tag(tag) => Some(tag.as_str()),
                BulkAction::Favorite => None,
            };
            let body = SingleRequest {
                tag,
                id: id.as_str(),
            };
            let result = async {
                client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .map_err(MedleyError::network)?
                    .error_for_status()
                    .map_err(MedleyError::network)?;
                Ok(())
            }
            .await;
            Self::send_reply(&replies, RemoteReply::Single { job, id, result });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_url_encodes_query_parts() {
        let (tx, _rx) = flume::unbounded();
        let remote = HttpRemote::new("http://localhost:8080/", tx).unwrap();
        let mut query = ViewQuery::for_directory("photos/summer 2024");
        query.filter = Some("beach".into());
        assert_eq!(
            remote.listing_url(&query),
            "http://localhost:8080/api/listing?dir=photos/summer%202024&sort=name&filter=beach"
        );
    }

    #[test]
    fn action_urls_cover_batched_and_single_endpoints() {
        let (tx, _rx) = flume::unbounded();
        let remote = HttpRemote::new("http://srv", tx).unwrap();
        let tag = BulkAction::Tag("trip".into());
        assert_eq!(remote.action_url(&tag, false), "http://srv/api/tags/apply");
        assert_eq!(
            remote.action_url(&BulkAction::Favorite, true),
            "http://srv/api/favorites/apply-one"
        );
    }
}
