//! Per-cloud endpoint sets.

use cosmoscale_core::config::Cloud;

/// Base URLs for one Azure cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEndpoints {
    /// AAD authority, e.g. `https://login.chinacloudapi.cn`.
    pub login: String,
    /// Resource Manager base URL.
    pub management: String,
    /// Audience requested for management tokens.
    pub management_resource: String,
    /// Cosmos DB account URL with an `{account}` placeholder.
    pub documents: String,
}

impl CloudEndpoints {
    pub fn for_cloud(cloud: Cloud) -> Self {
        match cloud {
            Cloud::China => Self {
                login: "https://login.chinacloudapi.cn".to_string(),
                management: "https://management.chinacloudapi.cn".to_string(),
                management_resource: "https://management.core.chinacloudapi.cn/".to_string(),
                documents: "https://{account}.documents.azure.cn:443".to_string(),
            },
            Cloud::Public => Self {
                login: "https://login.microsoftonline.com".to_string(),
                management: "https://management.azure.com".to_string(),
                management_resource: "https://management.core.windows.net/".to_string(),
                documents: "https://{account}.documents.azure.com:443".to_string(),
            },
        }
    }

    /// Point every endpoint at one base URL (local test servers).
    pub fn local(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            login: base.clone(),
            management: base.clone(),
            management_resource: format!("{base}/"),
            documents: base,
        }
    }

    pub fn documents_url(&self, account: &str) -> String {
        self.documents.replace("{account}", account)
    }

    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{tenant_id}/oauth2/token?api-version=1.0", self.login)
    }
}
