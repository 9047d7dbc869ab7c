//! Discovery client capability

use crate::{FormatKind, Tags};
use async_trait::async_trait;

/// A service-discovery backend that declarations are registered with.
///
/// Calls are awaited one at a time, in declaration order. Implementations
/// own any lease or heartbeat that keeps registrations alive.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Advertise `name` at `address`. `tags` is `None` when none were declared.
    async fn register(&self, name: &str, address: &str, tags: Option<&Tags>) -> anyhow::Result<()>;

    /// Add a path that services are stored under, encoded with `format`.
    async fn store(&self, format: FormatKind, path: &str) -> anyhow::Result<()>;
}
