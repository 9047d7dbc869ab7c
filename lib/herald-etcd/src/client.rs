//! HTTP client for the etcd v3 JSON gateway

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// EtcdClient issues gateway requests against the first reachable endpoint
pub struct EtcdClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
}

/// A granted lease
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Lease {
    #[serde(rename = "ID", default, deserialize_with = "de_i64")]
    pub id: i64,
    #[serde(rename = "TTL", default, deserialize_with = "de_i64")]
    pub ttl: i64,
}

#[derive(Deserialize)]
struct KeepAliveResponse {
    #[serde(default)]
    result: Option<Lease>,
}

impl EtcdClient {
    /// Create a client for `endpoints`, tried in order on every request
    pub fn new(endpoints: &[String], timeout: Duration) -> anyhow::Result<Self> {
        let endpoints: Vec<String> = endpoints
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(normalize_endpoint)
            .collect();

        if endpoints.is_empty() {
            anyhow::bail!("no etcd endpoints configured");
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoints })
    }

    /// Endpoints in the order they are tried
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Grant a lease of `ttl` seconds
    pub async fn grant_lease(&self, ttl: i64) -> anyhow::Result<Lease> {
        let lease: Lease = self
            .call("/v3/lease/grant", &json!({ "TTL": ttl.to_string() }))
            .await?;
        if lease.id == 0 {
            anyhow::bail!("etcd granted no lease id");
        }
        Ok(lease)
    }

    /// Refresh a lease, returning its remaining TTL. Zero means it expired.
    pub async fn keep_alive(&self, id: i64) -> anyhow::Result<i64> {
        let response: KeepAliveResponse = self
            .call("/v3/lease/keepalive", &json!({ "ID": id.to_string() }))
            .await?;
        Ok(response.result.map(|lease| lease.ttl).unwrap_or(0))
    }

    /// Revoke a lease, deleting every key attached to it
    pub async fn revoke_lease(&self, id: i64) -> anyhow::Result<()> {
        let _: Value = self
            .call("/v3/lease/revoke", &json!({ "ID": id.to_string() }))
            .await?;
        Ok(())
    }

    /// Put `key` = `value`, attached to `lease`
    pub async fn put(&self, key: &str, value: &str, lease: i64) -> anyhow::Result<()> {
        let body = json!({
            "key": STANDARD.encode(key),
            "value": STANDARD.encode(value),
            "lease": lease.to_string(),
        });
        let _: Value = self.call("/v3/kv/put", &body).await?;
        debug!("Put {}", key);
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: &Value) -> anyhow::Result<T> {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            let url = format!("{}{}", endpoint, path);
            let response = match self.http.post(&url).json(body).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("etcd endpoint {} unreachable: {}", endpoint, e);
                    last_error = Some(e);
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("etcd {} returned {}: {}", path, status, gateway_message(&text));
            }

            return response
                .json()
                .await
                .with_context(|| format!("decoding etcd {} response", path));
        }

        match last_error {
            Some(e) => Err(anyhow::Error::new(e).context("no etcd endpoint reachable")),
            None => anyhow::bail!("no etcd endpoints configured"),
        }
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

// The gateway reports errors as {"error": ..., "code": ..., "message": ...}
fn gateway_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// int64 fields arrive as JSON strings from the gateway
fn de_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int {
        Number(i64),
        Text(String),
    }

    match Int::deserialize(deserializer)? {
        Int::Number(n) => Ok(n),
        Int::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
