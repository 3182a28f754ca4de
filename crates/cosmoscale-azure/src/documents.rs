//! Cosmos DB data-plane client: partition key ranges and offers.

use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AzureError, AzureResult};
use crate::http::read_json;
use crate::signature::{MasterKey, rfc1123};

/// REST API version sent with every data-plane request.
pub const API_VERSION: &str = "2016-07-11";

const CONTINUATION_HEADER: &str = "x-ms-continuation";

#[derive(Debug, Deserialize)]
struct PartitionKeyRanges {
    #[serde(rename = "_count")]
    count: u32,
}

/// The fields of a collection resource this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResource {
    pub id: String,
    #[serde(rename = "_rid")]
    pub rid: String,
    /// Resource link offers point at.
    #[serde(rename = "_self")]
    pub self_link: String,
}

#[derive(Debug, Deserialize)]
struct OfferFeed {
    #[serde(rename = "Offers", default)]
    offers: Vec<Offer>,
}

/// A throughput offer. Unknown fields are kept so a replace sends back
/// everything that was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    #[serde(rename = "_rid")]
    pub rid: String,
    /// `_self` link of the collection this offer provisions.
    pub resource: String,
    #[serde(rename = "offerVersion", default, skip_serializing_if = "Option::is_none")]
    pub offer_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<OfferContent>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferContent {
    #[serde(rename = "offerThroughput", default, skip_serializing_if = "Option::is_none")]
    pub offer_throughput: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Offer {
    /// Manually provisioned throughput, if this offer has one.
    pub fn throughput(&self) -> Option<u64> {
        self.content.as_ref().and_then(|c| c.offer_throughput)
    }

    /// Copy of this offer carrying a new throughput.
    pub fn with_throughput(&self, throughput: u64) -> Offer {
        let mut offer = self.clone();
        offer.offer_version = Some("V2".to_string());
        match offer.content.as_mut() {
            Some(content) => content.offer_throughput = Some(throughput),
            None => {
                offer.content = Some(OfferContent {
                    offer_throughput: Some(throughput),
                    extra: serde_json::Map::new(),
                })
            }
        }
        offer
    }
}

/// Signed client for one database account.
#[derive(Debug, Clone)]
pub struct DocumentClient {
    http: reqwest::Client,
    base_url: String,
    key: MasterKey,
}

impl DocumentClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, key: MasterKey) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key,
        }
    }

    /// Number of partition key ranges backing a collection, summed over
    /// every page of the feed.
    pub async fn partition_key_range_count(
        &self,
        database: &str,
        collection: &str,
    ) -> AzureResult<u32> {
        let link = collection_link(database, collection);
        let path = format!("{link}/pkranges");
        let mut count = 0u32;
        let mut pages = 0usize;
        let mut continuation: Option<String> = None;
        loop {
            let (ranges, next): (PartitionKeyRanges, _) = self
                .send(
                    Method::GET,
                    &path,
                    "pkranges",
                    &link,
                    continuation.as_deref(),
                    None::<&()>,
                )
                .await?;
            count = count.saturating_add(ranges.count);
            pages += 1;
            match next {
                Some(token) if !token.is_empty() => continuation = Some(token),
                _ => break,
            }
        }
        debug!(%link, count, pages, "partition key ranges");
        Ok(count)
    }

    pub async fn collection(
        &self,
        database: &str,
        collection: &str,
    ) -> AzureResult<CollectionResource> {
        let link = collection_link(database, collection);
        let (resource, _) = self
            .send(Method::GET, &link, "colls", &link, None, None::<&()>)
            .await?;
        Ok(resource)
    }

    /// Every offer in the account, following continuation tokens.
    pub async fn list_offers(&self) -> AzureResult<Vec<Offer>> {
        let mut offers = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let (feed, next): (OfferFeed, _) = self
                .send(
                    Method::GET,
                    "offers",
                    "offers",
                    "",
                    continuation.as_deref(),
                    None::<&()>,
                )
                .await?;
            offers.extend(feed.offers);
            match next {
                Some(token) if !token.is_empty() => continuation = Some(token),
                _ => break,
            }
        }
        Ok(offers)
    }

    /// The offer provisioning the resource at `self_link`.
    pub async fn find_offer(&self, self_link: &str) -> AzureResult<Offer> {
        self.list_offers()
            .await?
            .into_iter()
            .find(|offer| same_link(&offer.resource, self_link))
            .ok_or_else(|| AzureError::NotFound(format!("offer for {self_link}")))
    }

    /// Replace an offer in full.
    pub async fn replace_offer(&self, offer: &Offer) -> AzureResult<Offer> {
        let path = format!("offers/{}", offer.rid);
        let (replaced, _) = self
            .send(
                Method::PUT,
                &path,
                "offers",
                &offer.rid.to_lowercase(),
                None,
                Some(offer),
            )
            .await?;
        Ok(replaced)
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        resource_type: &str,
        resource_link: &str,
        continuation: Option<&str>,
        body: Option<&B>,
    ) -> AzureResult<(T, Option<String>)>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let date = rfc1123(Utc::now());
        let authorization =
            self.key
                .authorization(method.as_str(), resource_type, resource_link, &date);

        let mut req = self
            .http
            .request(method, format!("{}/{path}", self.base_url))
            .header("authorization", authorization)
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION);
        if let Some(token) = continuation {
            req = req.header(CONTINUATION_HEADER, token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let next = resp
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let value = read_json(resp).await?;
        Ok((value, next))
    }
}

fn collection_link(database: &str, collection: &str) -> String {
    format!("dbs/{database}/colls/{collection}")
}

fn same_link(a: &str, b: &str) -> bool {
    a.trim_matches('/') == b.trim_matches('/')
}
