use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{AzureError, AzureResult};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// The client shared by every collaborator call.
pub(crate) fn build_client(timeout: Duration) -> AzureResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cosmoscale/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Check the status and decode a JSON body.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> AzureResult<T> {
    let url = strip_query(resp.url());
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(AzureError::Status {
            url,
            status: status.as_u16(),
            body: truncate(body),
        });
    }

    serde_json::from_str(&body).map_err(|e| AzureError::Decode {
        url,
        reason: e.to_string(),
    })
}

fn strip_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push('…');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_bodies() {
        let body = "x".repeat(2000);
        let out = truncate(body);
        assert!(out.len() <= MAX_ERROR_BODY + '…'.len_utf8());
        assert!(out.ends_with('…'));
        assert_eq!(truncate("short".to_string()), "short");
    }

    #[test]
    fn strip_query_drops_filters() {
        let url = reqwest::Url::parse("https://example.test/metrics?api-version=1&$filter=x").unwrap();
        assert_eq!(strip_query(&url), "https://example.test/metrics");
    }
}
