//! AAD client-credentials token for the management API.
//!
//! The token is requested on first use and shared by every call in the
//! pass. A failed request leaves the cell empty so the next caller retries.

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use cosmoscale_core::config::AzureSettings;

use crate::endpoints::CloudEndpoints;
use crate::error::{AzureError, AzureResult};
use crate::http::read_json;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    resource: String,
    client_id: String,
    client_secret: String,
    token: OnceCell<String>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, endpoints: &CloudEndpoints, azure: &AzureSettings) -> Self {
        Self {
            http,
            token_url: endpoints.token_url(&azure.tenant_id),
            resource: endpoints.management_resource.clone(),
            client_id: azure.client_id.clone(),
            client_secret: azure.client_secret.clone(),
            token: OnceCell::new(),
        }
    }

    /// Bearer token for management calls.
    pub async fn bearer(&self) -> AzureResult<&str> {
        self.token
            .get_or_try_init(|| self.request())
            .await
            .map(String::as_str)
    }

    async fn request(&self) -> AzureResult<String> {
        debug!(client_id = %self.client_id, "requesting management token");
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("resource", self.resource.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AzureError::Token(e.to_string()))?;

        let token: TokenResponse = read_json(resp)
            .await
            .map_err(|e| AzureError::Token(e.to_string()))?;
        info!("management token acquired");
        Ok(token.access_token)
    }
}
