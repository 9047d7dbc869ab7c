//! Service and store declarations
//!
//! Both lists share one shape: entries separated by `;`, fields separated by
//! `,`. A service entry is `name,address[,key=value]*`; a store entry is
//! `kind,path`. Positions in errors are 0-based entry indexes.

use crate::tags::{decode_tags, Tags};
use crate::{FormatKind, HeraldError, ListKind, Result};

const ENTRY_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ',';

/// A service to advertise
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,
    pub address: String,
    /// `None` when the entry carried only a name and an address
    pub tags: Option<Tags>,
}

/// A backend path services are stored under
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreSpec {
    pub format: FormatKind,
    pub path: String,
}

/// Every declaration of one run, validated and in input order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Declarations {
    pub services: Vec<ServiceSpec>,
    pub stores: Vec<StoreSpec>,
}

impl Declarations {
    /// Parse and validate both lists. Nothing is returned unless every entry
    /// of both lists is valid.
    pub fn parse(services: &str, stores: &str) -> Result<Self> {
        Ok(Self {
            services: parse_services(services)?,
            stores: parse_stores(stores)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.stores.is_empty()
    }
}

/// Parse a service list. An empty or blank list declares no services.
pub fn parse_services(input: &str) -> Result<Vec<ServiceSpec>> {
    entries(input)
        .map(|(position, entry)| parse_service(position, entry))
        .collect()
}

/// Parse a store list. An empty or blank list declares no stores.
pub fn parse_stores(input: &str) -> Result<Vec<StoreSpec>> {
    entries(input)
        .map(|(position, entry)| parse_store(position, entry))
        .collect()
}

fn entries(input: &str) -> impl Iterator<Item = (usize, &str)> {
    let input = if input.trim().is_empty() { None } else { Some(input) };
    input
        .into_iter()
        .flat_map(|input| input.split(ENTRY_SEPARATOR))
        .enumerate()
}

fn parse_service(position: usize, entry: &str) -> Result<ServiceSpec> {
    let fields: Vec<&str> = entry.split(FIELD_SEPARATOR).collect();
    if fields.len() < 2 {
        return Err(HeraldError::malformed(
            ListKind::Service,
            position,
            format!("expected at least 2 fields (name,address), found {}", fields.len()),
        ));
    }

    let name = required(ListKind::Service, position, "name", fields[0])?;
    let address = required(ListKind::Service, position, "address", fields[1])?;

    let tags = if fields.len() > 2 {
        Some(decode_tags(position, fields[2..].iter().copied())?)
    } else {
        None
    };

    Ok(ServiceSpec { name, address, tags })
}

fn parse_store(position: usize, entry: &str) -> Result<StoreSpec> {
    let fields: Vec<&str> = entry.split(FIELD_SEPARATOR).collect();
    if fields.len() != 2 {
        return Err(HeraldError::malformed(
            ListKind::Store,
            position,
            format!("expected 2 fields (kind,path), found {}", fields.len()),
        ));
    }

    let kind = fields[0].trim();
    let format = FormatKind::resolve(kind).ok_or_else(|| HeraldError::UnknownFormat {
        position,
        kind: kind.to_string(),
    })?;

    let path = required(ListKind::Store, position, "path", fields[1])?;

    Ok(StoreSpec {
        format,
        path: normalize_path(&path),
    })
}

fn required(list: ListKind, position: usize, what: &str, field: &str) -> Result<String> {
    let value = field.trim();
    if value.is_empty() {
        return Err(HeraldError::malformed(list, position, format!("empty {}", what)));
    }
    Ok(value.to_string())
}

// "/svc/" and "/svc" name the same store
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
