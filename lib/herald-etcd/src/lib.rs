//! etcd-backed discovery client
//!
//! Registrations are written through the etcd v3 JSON gateway and attached
//! to a single lease that a background task keeps alive.
pub mod client;
pub mod discovery;
pub mod record;

pub use client::EtcdClient;
pub use discovery::{EtcdConfig, EtcdDiscovery};
pub use record::{ServiceRecord, StoreTarget};
