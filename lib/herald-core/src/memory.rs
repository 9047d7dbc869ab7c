//! In-memory discovery client

use crate::{DiscoveryClient, FormatKind, Tags};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A call received by [`MemoryDiscovery`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveryCall {
    Register {
        name: String,
        address: String,
        tags: Option<Tags>,
    },
    Store {
        format: FormatKind,
        path: String,
    },
}

/// MemoryDiscovery keeps every call it receives, in order.
///
/// Used for dry runs and tests. Names or paths added with [`reject`] fail
/// instead of being recorded.
///
/// [`reject`]: MemoryDiscovery::reject
#[derive(Clone, Default)]
pub struct MemoryDiscovery {
    calls: Arc<RwLock<Vec<DiscoveryCall>>>,
    rejected: Arc<RwLock<HashSet<String>>>,
}

impl MemoryDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register` for this service name, or `store` for this path, fail
    pub async fn reject(&self, name_or_path: impl Into<String>) {
        self.rejected.write().await.insert(name_or_path.into());
    }

    /// All recorded calls
    pub async fn calls(&self) -> Vec<DiscoveryCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded `register` calls
    pub async fn service_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| matches!(call, DiscoveryCall::Register { .. }))
            .count()
    }

    /// Number of recorded `store` calls
    pub async fn store_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| matches!(call, DiscoveryCall::Store { .. }))
            .count()
    }

    async fn check(&self, key: &str) -> anyhow::Result<()> {
        if self.rejected.read().await.contains(key) {
            anyhow::bail!("{} rejected by memory backend", key);
        }
        Ok(())
    }
}

#[async_trait]
impl DiscoveryClient for MemoryDiscovery {
    async fn register(&self, name: &str, address: &str, tags: Option<&Tags>) -> anyhow::Result<()> {
        self.check(name).await?;

        self.calls.write().await.push(DiscoveryCall::Register {
            name: name.to_string(),
            address: address.to_string(),
            tags: tags.cloned(),
        });

        debug!("Recorded service: {} at {}", name, address);
        Ok(())
    }

    async fn store(&self, format: FormatKind, path: &str) -> anyhow::Result<()> {
        self.check(path).await?;

        self.calls.write().await.push(DiscoveryCall::Store {
            format,
            path: path.to_string(),
        });

        debug!("Recorded store: {} ({})", path, format);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let memory = MemoryDiscovery::new();
        memory.store(FormatKind::Puro, "/legacy").await.unwrap();
        memory.register("api", "10.0.0.1:8080", None).await.unwrap();

        assert_eq!(
            memory.calls().await,
            vec![
                DiscoveryCall::Store {
                    format: FormatKind::Puro,
                    path: "/legacy".to_string(),
                },
                DiscoveryCall::Register {
                    name: "api".to_string(),
                    address: "10.0.0.1:8080".to_string(),
                    tags: None,
                },
            ]
        );
        assert_eq!(memory.service_count().await, 1);
        assert_eq!(memory.store_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_name_is_not_recorded() {
        let memory = MemoryDiscovery::new();
        memory.reject("api").await;

        let err = memory.register("api", "10.0.0.1:8080", None).await.unwrap_err();
        assert_eq!(err.to_string(), "api rejected by memory backend");
        assert!(memory.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let memory = MemoryDiscovery::new();
        let other = memory.clone();
        other.register("api", "10.0.0.1:8080", None).await.unwrap();
        assert_eq!(memory.service_count().await, 1);
    }
}
