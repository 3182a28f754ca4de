//! `AzureBackend`: one value that plays all three collaborator roles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use cosmoscale_autoscale::{CapacityApplier, MetricSampler, PartitionCounter};
use cosmoscale_core::{ManagedCollection, MetricSample, MetricWindow, Settings};

use crate::auth::TokenProvider;
use crate::documents::{DocumentClient, Offer};
use crate::endpoints::CloudEndpoints;
use crate::error::{AzureError, AzureResult};
use crate::http::build_client;
use crate::management::ManagementClient;
use crate::signature::MasterKey;

pub struct AzureBackend {
    management: ManagementClient,
    /// Data-plane clients keyed by database account name.
    documents: HashMap<String, DocumentClient>,
}

impl AzureBackend {
    /// Build clients for every configured account using the settings'
    /// cloud endpoints.
    pub fn from_settings(settings: &Settings, timeout: Duration) -> AzureResult<Self> {
        Self::new(
            settings,
            CloudEndpoints::for_cloud(settings.azure.cloud),
            timeout,
        )
    }

    pub fn new(
        settings: &Settings,
        endpoints: CloudEndpoints,
        timeout: Duration,
    ) -> AzureResult<Self> {
        let http = build_client(timeout)?;
        let tokens = Arc::new(TokenProvider::new(
            http.clone(),
            &endpoints,
            &settings.azure,
        ));
        let management = ManagementClient::new(
            http.clone(),
            endpoints.management.clone(),
            settings.azure.subscription.clone(),
            tokens,
        );

        let mut documents = HashMap::new();
        for account in &settings.accounts {
            let key = MasterKey::from_base64(&account.primary_key).map_err(|e| {
                AzureError::InvalidKey {
                    account: account.database_account.clone(),
                    reason: e.to_string(),
                }
            })?;
            let client = DocumentClient::new(
                http.clone(),
                endpoints.documents_url(&account.database_account),
                key,
            );
            documents.insert(account.database_account.clone(), client);
        }
        debug!(accounts = documents.len(), "azure clients ready");

        Ok(Self {
            management,
            documents,
        })
    }

    fn documents(&self, collection: &ManagedCollection) -> AzureResult<&DocumentClient> {
        self.documents
            .get(&collection.id.account)
            .ok_or_else(|| AzureError::UnknownAccount(collection.id.account.clone()))
    }

    async fn offer_for(&self, collection: &ManagedCollection) -> AzureResult<(&DocumentClient, Offer)> {
        let client = self.documents(collection)?;
        let resource = client
            .collection(&collection.id.database, &collection.id.collection)
            .await?;
        let offer = client.find_offer(&resource.self_link).await?;
        Ok((client, offer))
    }
}

#[async_trait]
impl MetricSampler for AzureBackend {
    async fn fetch_recent_samples(
        &self,
        collection: &ManagedCollection,
        window: &MetricWindow,
    ) -> anyhow::Result<MetricSample> {
        let samples = self
            .management
            .collection_samples(collection, window)
            .await?;
        Ok(MetricSample::new(samples))
    }
}

#[async_trait]
impl PartitionCounter for AzureBackend {
    async fn count_partitions(&self, collection: &ManagedCollection) -> anyhow::Result<u32> {
        let count = self
            .documents(collection)?
            .partition_key_range_count(&collection.id.database, &collection.id.collection)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CapacityApplier for AzureBackend {
    async fn current_capacity(&self, collection: &ManagedCollection) -> anyhow::Result<u64> {
        let (_, offer) = self.offer_for(collection).await?;
        offer.throughput().ok_or_else(|| {
            anyhow::anyhow!("offer {} has no manually provisioned throughput", offer.id)
        })
    }

    async fn apply_capacity(
        &self,
        collection: &ManagedCollection,
        new_capacity: u64,
    ) -> anyhow::Result<()> {
        let (client, offer) = self.offer_for(collection).await?;
        let replaced = client
            .replace_offer(&offer.with_throughput(new_capacity))
            .await?;
        debug!(
            resource = %collection.id,
            offer = %replaced.id,
            throughput = ?replaced.throughput(),
            "offer replaced"
        );
        Ok(())
    }
}
