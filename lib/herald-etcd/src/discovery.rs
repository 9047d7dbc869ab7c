//! Service registration in etcd

use crate::record::{ServiceRecord, StoreTarget};
use crate::EtcdClient;
use anyhow::Context;
use async_trait::async_trait;
use herald_core::{DiscoveryClient, FormatKind, Tags};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Connection settings for [`EtcdDiscovery`]
#[derive(Clone, Debug)]
pub struct EtcdConfig {
    /// Gateway endpoints, tried in order
    pub endpoints: Vec<String>,
    /// TTL of the lease every key is attached to
    pub lease_ttl: Duration,
    /// Timeout of a single gateway request
    pub request_timeout: Duration,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            lease_ttl: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl EtcdConfig {
    /// Interval between lease refreshes
    pub fn keepalive_interval(&self) -> Duration {
        (self.lease_ttl / 3).max(Duration::from_secs(1))
    }
}

/// EtcdDiscovery writes every registered service into every known store.
///
/// Keys are attached to one lease. The lease is refreshed in the background
/// for as long as this value lives, so registrations end with the process.
/// If the lease expires anyway, a new one is granted and every key rewritten.
pub struct EtcdDiscovery {
    client: Arc<EtcdClient>,
    state: Arc<Mutex<State>>,
    keepalive: JoinHandle<()>,
}

struct State {
    lease: i64,
    services: Vec<ServiceRecord>,
    stores: Vec<StoreTarget>,
}

impl State {
    fn new(lease: i64) -> Self {
        Self {
            lease,
            services: Vec::new(),
            stores: Vec::new(),
        }
    }
}

impl EtcdDiscovery {
    /// Grant a lease and start keeping it alive
    pub async fn connect(config: &EtcdConfig) -> anyhow::Result<Self> {
        let ttl = lease_ttl_secs(config.lease_ttl)?;

        let client = Arc::new(EtcdClient::new(&config.endpoints, config.request_timeout)?);
        let lease = client
            .grant_lease(ttl)
            .await
            .context("granting etcd lease")?;
        info!("Granted etcd lease {:x} with TTL {}s", lease.id, lease.ttl);

        let state = Arc::new(Mutex::new(State::new(lease.id)));
        let keepalive = spawn_keepalive(
            client.clone(),
            state.clone(),
            ttl,
            config.keepalive_interval(),
        );

        Ok(Self {
            client,
            state,
            keepalive,
        })
    }

    /// Id of the lease registrations are currently attached to
    pub async fn lease_id(&self) -> i64 {
        self.state.lock().await.lease
    }

    /// Stop refreshing the lease and revoke it, removing every registration
    pub async fn close(self) -> anyhow::Result<()> {
        self.keepalive.abort();
        let lease = self.lease_id().await;
        self.client
            .revoke_lease(lease)
            .await
            .context("revoking etcd lease")?;
        info!("Revoked etcd lease {:x}", lease);
        Ok(())
    }
}

impl Drop for EtcdDiscovery {
    fn drop(&mut self) {
        self.keepalive.abort();
    }
}

#[async_trait]
impl DiscoveryClient for EtcdDiscovery {
    async fn register(&self, name: &str, address: &str, tags: Option<&Tags>) -> anyhow::Result<()> {
        let record = ServiceRecord::new(name, address, tags);
        let mut state = self.state.lock().await;

        for store in &state.stores {
            write(&self.client, state.lease, store, &record).await?;
        }

        debug!("Service {} written to {} stores", name, state.stores.len());
        state.services.push(record);
        Ok(())
    }

    async fn store(&self, format: FormatKind, path: &str) -> anyhow::Result<()> {
        let store = StoreTarget::new(format, path);
        let mut state = self.state.lock().await;

        for record in &state.services {
            write(&self.client, state.lease, &store, record).await?;
        }

        debug!("Store {} holds {} services", path, state.services.len());
        state.stores.push(store);
        Ok(())
    }
}

fn lease_ttl_secs(ttl: Duration) -> anyhow::Result<i64> {
    let secs = ttl.as_secs();
    if secs == 0 {
        anyhow::bail!("lease TTL must be at least one second");
    }
    i64::try_from(secs).map_err(|_| anyhow::anyhow!("lease TTL of {}s is too large", secs))
}

async fn write(
    client: &EtcdClient,
    lease: i64,
    store: &StoreTarget,
    record: &ServiceRecord,
) -> anyhow::Result<()> {
    let key = store.key(record);
    let value = store.value(record)?;
    client
        .put(&key, &value, lease)
        .await
        .with_context(|| format!("writing {}", key))
}

/// Grant a fresh lease and rewrite every (store, service) key under it
async fn renew(client: &EtcdClient, state: &mut State, ttl: i64) -> anyhow::Result<()> {
    let lease = client.grant_lease(ttl).await.context("granting etcd lease")?;

    for store in &state.stores {
        for record in &state.services {
            write(client, lease.id, store, record).await?;
        }
    }

    info!(
        "Replaced expired etcd lease {:x} with {:x}, rewrote {} keys",
        state.lease,
        lease.id,
        state.stores.len() * state.services.len()
    );
    state.lease = lease.id;
    Ok(())
}

fn spawn_keepalive(
    client: Arc<EtcdClient>,
    state: Arc<Mutex<State>>,
    ttl: i64,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let lease = state.lock().await.lease;

            match client.keep_alive(lease).await {
                Ok(remaining) if remaining > 0 => {
                    debug!("Refreshed etcd lease {:x}, TTL {}s", lease, remaining)
                }
                Ok(_) => {
                    error!("etcd lease {:x} expired, registering again", lease);
                    let mut state = state.lock().await;
                    // a failed renewal keeps the dead lease, so the next tick retries
                    if let Err(e) = renew(&client, &mut state, ttl).await {
                        warn!("Failed to renew etcd registrations: {:#}", e);
                    }
                }
                Err(e) => warn!("Failed to refresh etcd lease {:x}: {:#}", lease, e),
            }
        }
    })
}
