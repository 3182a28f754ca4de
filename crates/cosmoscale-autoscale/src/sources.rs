//! Collaborator seams: where samples, partition counts and offers come from.
//!
//! Implementations live outside this crate (`cosmoscale-azure` talks to the
//! Azure management and Cosmos DB REST APIs; tests use in-memory fakes).
//! Every implementation must be safe to call concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use cosmoscale_core::{ManagedCollection, MetricSample, MetricWindow};

/// Reads recent per-second consumption for one collection.
#[async_trait]
pub trait MetricSampler: Send + Sync {
    /// Observations inside `window`. An empty sample means "no data".
    async fn fetch_recent_samples(
        &self,
        collection: &ManagedCollection,
        window: &MetricWindow,
    ) -> anyhow::Result<MetricSample>;
}

/// Resolves how many physical partitions back a collection.
#[async_trait]
pub trait PartitionCounter: Send + Sync {
    /// Zero means the partitioning could not be determined.
    async fn count_partitions(&self, collection: &ManagedCollection) -> anyhow::Result<u32>;
}

/// Reads and replaces a collection's provisioned throughput.
#[async_trait]
pub trait CapacityApplier: Send + Sync {
    async fn current_capacity(&self, collection: &ManagedCollection) -> anyhow::Result<u64>;

    /// Set the absolute throughput. One request per call; calling it again
    /// with the same value converges to the same state.
    async fn apply_capacity(
        &self,
        collection: &ManagedCollection,
        new_capacity: u64,
    ) -> anyhow::Result<()>;
}

/// The three collaborators an [`Orchestrator`](crate::Orchestrator) needs.
#[derive(Clone)]
pub struct Collaborators {
    pub sampler: Arc<dyn MetricSampler>,
    pub partitions: Arc<dyn PartitionCounter>,
    pub applier: Arc<dyn CapacityApplier>,
}

impl Collaborators {
    pub fn new(
        sampler: Arc<dyn MetricSampler>,
        partitions: Arc<dyn PartitionCounter>,
        applier: Arc<dyn CapacityApplier>,
    ) -> Self {
        Self {
            sampler,
            partitions,
            applier,
        }
    }

    /// Use one backend for all three roles.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: MetricSampler + PartitionCounter + CapacityApplier + 'static,
    {
        Self {
            sampler: backend.clone(),
            partitions: backend.clone(),
            applier: backend,
        }
    }
}
