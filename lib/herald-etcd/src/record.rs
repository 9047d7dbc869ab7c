//! Key and value layout of service records per store format

use chrono::{DateTime, Utc};
use herald_core::{FormatKind, Tags};
use serde::Serialize;

/// A registered service instance
#[derive(Clone, Debug, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub address: String,
    pub tags: Tags,
    pub registered_at: DateTime<Utc>,
}

impl ServiceRecord {
    pub fn new(name: &str, address: &str, tags: Option<&Tags>) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            tags: tags.cloned().unwrap_or_default(),
            registered_at: Utc::now(),
        }
    }
}

/// A store path and the format records are written in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreTarget {
    pub format: FormatKind,
    pub path: String,
}

impl StoreTarget {
    pub fn new(format: FormatKind, path: &str) -> Self {
        Self {
            format,
            path: path.to_string(),
        }
    }

    /// Key of `record` under this store: `{path}/{name}/{address}`
    pub fn key(&self, record: &ServiceRecord) -> String {
        format!(
            "{}/{}/{}",
            self.path.trim_end_matches('/'),
            record.name,
            record.address
        )
    }

    /// Value of `record` under this store
    pub fn value(&self, record: &ServiceRecord) -> anyhow::Result<String> {
        match self.format {
            FormatKind::Default => Ok(serde_json::to_string(record)?),
            FormatKind::Puro => Ok(record.address.clone()),
        }
    }
}
