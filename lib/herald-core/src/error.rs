use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HeraldError>;

/// Which declaration list an entry came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Service,
    Store,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Service => f.write_str("service"),
            ListKind::Store => f.write_str("store"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("Malformed {list} entry at position {position}: {reason}")]
    MalformedEntry {
        list: ListKind,
        position: usize,
        reason: String,
    },

    #[error("Malformed tag {field:?} in service entry at position {position}: expected key=value")]
    MalformedTag { position: usize, field: String },

    #[error("Unknown store format {kind:?} in store entry at position {position}")]
    UnknownFormat { position: usize, kind: String },

    #[error("Discovery backend rejected {list} entry at position {position}")]
    RegistrationFailed {
        list: ListKind,
        position: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl HeraldError {
    pub(crate) fn malformed(list: ListKind, position: usize, reason: impl Into<String>) -> Self {
        HeraldError::MalformedEntry {
            list,
            position,
            reason: reason.into(),
        }
    }

    /// Position of the failing entry within its list
    pub fn position(&self) -> usize {
        match self {
            HeraldError::MalformedEntry { position, .. }
            | HeraldError::MalformedTag { position, .. }
            | HeraldError::UnknownFormat { position, .. }
            | HeraldError::RegistrationFailed { position, .. } => *position,
        }
    }

    /// List the failing entry belongs to
    pub fn list(&self) -> ListKind {
        match self {
            HeraldError::MalformedEntry { list, .. } | HeraldError::RegistrationFailed { list, .. } => *list,
            HeraldError::MalformedTag { .. } => ListKind::Service,
            HeraldError::UnknownFormat { .. } => ListKind::Store,
        }
    }
}
