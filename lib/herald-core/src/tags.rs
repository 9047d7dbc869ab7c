//! Tag decoding for service entries

use crate::{HeraldError, Result};
use std::collections::BTreeMap;

/// Metadata attached to a service registration
pub type Tags = BTreeMap<String, String>;

/// Decode the `key=value` fields that follow a service's name and address.
///
/// Only the first `=` splits, so values may carry further `=` characters.
/// A repeated key keeps the value of its last occurrence.
pub fn decode_tags<'a, I>(position: usize, fields: I) -> Result<Tags>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut tags = Tags::new();

    for field in fields {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| malformed_tag(position, field))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(malformed_tag(position, field));
        }

        tags.insert(key.to_string(), value.trim().to_string());
    }

    Ok(tags)
}

fn malformed_tag(position: usize, field: &str) -> HeraldError {
    HeraldError::MalformedTag {
        position,
        field: field.to_string(),
    }
}
