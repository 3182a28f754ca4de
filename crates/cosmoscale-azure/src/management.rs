//! Resource Manager metrics client.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use cosmoscale_core::{ManagedCollection, MetricWindow};

use crate::auth::TokenProvider;
use crate::error::{AzureError, AzureResult};
use crate::http::read_json;

pub const METRICS_API_VERSION: &str = "2015-04-08";

/// Metric read for every collection.
pub const METRIC_NAME: &str = "Max RUs Per Second";

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    value: Vec<MetricSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricSeries {
    #[serde(default)]
    metric_values: Vec<MetricValue>,
}

#[derive(Debug, Deserialize)]
struct MetricValue {
    #[serde(rename = "_count", default)]
    count: Option<f64>,
}

pub struct ManagementClient {
    http: reqwest::Client,
    base_url: String,
    subscription: String,
    tokens: Arc<TokenProvider>,
}

impl ManagementClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        subscription: impl Into<String>,
        tokens: Arc<TokenProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            subscription: subscription.into(),
            tokens,
        }
    }

    /// Per-minute observations for `collection` inside `window`. Empty when
    /// the metrics API has nothing for the window.
    pub async fn collection_samples(
        &self,
        collection: &ManagedCollection,
        window: &MetricWindow,
    ) -> AzureResult<Vec<u64>> {
        let token = self.tokens.bearer().await?;
        let url = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DocumentDb/databaseAccounts/{}/databases/{}/collections/{}/metrics",
            self.base_url,
            self.subscription,
            collection.resource_group,
            collection.id.account,
            collection.database_key,
            collection.collection_key,
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("api-version", METRICS_API_VERSION),
                ("$filter", metrics_filter(window).as_str()),
            ])
            .send()
            .await?;
        let metrics: MetricsResponse = read_json(resp).await?;

        let samples = samples_from(metrics).map_err(|reason| AzureError::Decode {
            url: url.clone(),
            reason,
        })?;
        debug!(
            resource = %collection.id,
            samples = samples.len(),
            "metric samples fetched"
        );
        Ok(samples)
    }
}

/// OData filter selecting one metric at one-minute grain.
fn metrics_filter(window: &MetricWindow) -> String {
    format!(
        "(name.value eq '{METRIC_NAME}') and timeGrain eq duration'PT1M' and startTime eq {} and endTime eq {}",
        metric_time(window.start),
        metric_time(window.end),
    )
}

fn metric_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:00.0000000Z").to_string()
}

/// Observations of the last series in the response.
fn samples_from(metrics: MetricsResponse) -> Result<Vec<u64>, String> {
    let Some(series) = metrics.value.into_iter().last() else {
        return Ok(Vec::new());
    };
    series
        .metric_values
        .into_iter()
        .filter_map(|v| v.count)
        .map(|count| {
            if count.is_finite() && count >= 0.0 {
                Ok(count.round() as u64)
            } else {
                Err(format!("invalid sample value {count}"))
            }
        })
        .collect()
}
