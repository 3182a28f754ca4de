//! Domain types shared across cosmoscale crates.
//!
//! Everything here is transient: built for one evaluation pass and
//! dropped afterwards. Nothing is persisted between runs.

use std::fmt;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

// ── Identity ───────────────────────────────────────────────────────

/// Control-plane identity of a managed collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Database account name (the `{account}` in `{account}.documents.azure.cn`).
    pub account: String,
    /// Database name.
    pub database: String,
    /// Collection name.
    pub collection: String,
}

impl ResourceId {
    pub fn new(
        account: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account, self.database, self.collection)
    }
}

// ── Policy ─────────────────────────────────────────────────────────

/// Control parameters for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    /// Target utilization ratio, e.g. `0.7`.
    pub threshold_rate: f64,
    /// Hysteresis margin around the threshold, e.g. `0.1`.
    pub increase_rate: f64,
    /// Minimum capacity a resize may produce.
    pub default_value: u64,
}

/// A collection under management: where to read its metrics, where to
/// apply its capacity, and how to decide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedCollection {
    pub id: ResourceId,
    /// Resource group that owns the database account.
    pub resource_group: String,
    /// Database resource id used by the metrics API.
    pub database_key: String,
    /// Collection resource id used by the metrics API.
    pub collection_key: String,
    pub policy: CapacityPolicy,
}

// ── Metrics ────────────────────────────────────────────────────────

/// Per-second consumption observations for one collection over the
/// look-back window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSample {
    pub values: Vec<u64>,
}

impl MetricSample {
    pub fn new(values: Vec<u64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean, or `None` for an empty sample.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sum: f64 = self.values.iter().map(|v| *v as f64).sum();
        Some(sum / self.values.len() as f64)
    }
}

impl From<Vec<u64>> for MetricSample {
    fn from(values: Vec<u64>) -> Self {
        Self::new(values)
    }
}

/// Half-open metric query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricWindow {
    /// How far back the window ends. The metrics pipeline lags a few
    /// minutes behind real time.
    pub const LAG_MINUTES: i64 = 5;
    /// Length of the window.
    pub const SPAN_MINUTES: i64 = 5;

    /// The `[now-10m, now-5m)` window, truncated to whole minutes.
    pub fn trailing(now: DateTime<Utc>) -> Self {
        let now = now
            .duration_trunc(Duration::minutes(1))
            .unwrap_or(now);
        let end = now - Duration::minutes(Self::LAG_MINUTES);
        Self {
            start: end - Duration::minutes(Self::SPAN_MINUTES),
            end,
        }
    }
}

// ── Capacity ───────────────────────────────────────────────────────

/// Live control-plane state for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Currently provisioned throughput (RU/s).
    pub current_capacity: u64,
    /// Number of physical partitions backing the collection.
    pub partition_count: u32,
}

/// Outcome of the capacity decider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityDecision {
    /// Leave provisioned capacity as it is.
    NoChange,
    /// Provision exactly this much capacity.
    SetTo(u64),
}

impl CapacityDecision {
    pub fn target(&self) -> Option<u64> {
        match self {
            CapacityDecision::NoChange => None,
            CapacityDecision::SetTo(n) => Some(*n),
        }
    }
}
