use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::runpod::GraphqlTransport;

const GRAPHQL_URL: &str = "https://api.runpod.io/graphql";
const REST_URL: &str = "https://rest.runpod.io";

#[derive(Debug, Clone)]
pub struct RunpodClient {
    http: reqwest::Client,
    graphql_url: String,
    rest_url: String,
}

impl RunpodClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| anyhow!("API key contains characters not valid in a header"))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to build runpod http client")?;

        Ok(Self {
            http,
            graphql_url: GRAPHQL_URL.to_string(),
            rest_url: REST_URL.to_string(),
        })
    }

    /// Looks up the datacenter a network volume lives in. One shot, no
    /// fallback: a volume id that does not resolve is fatal at startup.
    pub async fn network_volume_datacenter(&self, volume_id: &str) -> Result<String> {
        let url = format!("{}/v1/networkvolumes/{volume_id}", self.rest_url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("network volume request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("read response body failed")?;

        if !status.is_success() {
            bail!("runpod http error {status}: {text}");
        }

        let payload: Value =
            serde_json::from_str(&text).context("parse network volume response failed")?;

        datacenter_from_volume(&payload)
            .ok_or_else(|| anyhow!("network volume response carries no dataCenterId"))
    }
}

#[async_trait]
impl GraphqlTransport for RunpodClient {
    async fn post_graphql(&self, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(&self.graphql_url)
            .json(body)
            .send()
            .await
            .context("graphql request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("read response body failed")?;

        if !status.is_success() {
            bail!("runpod http error {status}: {text}");
        }

        serde_json::from_str(&text).context("parse graphql response failed")
    }
}

/// The volume endpoint has returned the id both at the top level and nested
/// under a `data` envelope. Accept either, top level first, skipping blanks.
fn datacenter_from_volume(payload: &Value) -> Option<String> {
    let direct = payload.get("dataCenterId").and_then(Value::as_str);
    let nested = payload
        .get("data")
        .and_then(|data| data.get("dataCenterId"))
        .and_then(Value::as_str);

    direct
        .filter(|id| !id.is_empty())
        .or_else(|| nested.filter(|id| !id.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_datacenter_id() {
        let payload = json!({"id": "vol123", "dataCenterId": "EU-RO-1"});
        assert_eq!(datacenter_from_volume(&payload).as_deref(), Some("EU-RO-1"));
    }

    #[test]
    fn test_nested_datacenter_id() {
        let payload = json!({"data": {"dataCenterId": "EU-RO-1"}});
        assert_eq!(datacenter_from_volume(&payload).as_deref(), Some("EU-RO-1"));
    }

    #[test]
    fn test_top_level_wins_over_nested() {
        let payload = json!({
            "dataCenterId": "US-TX-3",
            "data": {"dataCenterId": "EU-RO-1"}
        });
        assert_eq!(datacenter_from_volume(&payload).as_deref(), Some("US-TX-3"));
    }

    #[test]
    fn test_blank_top_level_falls_through_to_nested() {
        let payload = json!({"dataCenterId": "", "data": {"dataCenterId": "EU-RO-1"}});
        assert_eq!(datacenter_from_volume(&payload).as_deref(), Some("EU-RO-1"));
    }

    #[test]
    fn test_missing_datacenter_id_is_none() {
        assert_eq!(datacenter_from_volume(&json!({})), None);
        assert_eq!(datacenter_from_volume(&json!({"dataCenterId": 7})), None);
    }
}
