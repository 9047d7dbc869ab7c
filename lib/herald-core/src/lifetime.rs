//! Keeps the process alive once registrations are live

use std::future::Future;
use tracing::info;

/// Wait for `shutdown` without doing any other work.
///
/// Registrations are tied to this process, so callers park here after
/// registering and exit once the termination signal arrives.
pub async fn park<F>(shutdown: F)
where
    F: Future<Output = ()>,
{
    info!("Registrations live, waiting for termination signal");
    shutdown.await;
    info!("Termination signal received, leaving parked state");
}
