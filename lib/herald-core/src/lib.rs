//! Declaration language and registration driver for herald
//!
//! This library provides:
//! - Parsing of the compact service list (`name,address,key=value;...`) and
//!   store list (`kind,path;...`) into ordered records
//! - The `DiscoveryClient` capability that backends implement
//! - The registration driver and the lifetime guard that parks the process
//!   once every declaration is live

pub mod client;
pub mod declaration;
pub mod driver;
pub mod error;
pub mod format;
pub mod lifetime;
pub mod memory;
pub mod tags;

pub use client::DiscoveryClient;
pub use declaration::{Declarations, ServiceSpec, StoreSpec};
pub use driver::{register_all, run, Summary};
pub use error::{HeraldError, ListKind, Result};
pub use format::FormatKind;
pub use lifetime::park;
pub use memory::{DiscoveryCall, MemoryDiscovery};
pub use tags::Tags;
