//! Store formats understood by discovery backends

use std::fmt;

/// How service records are laid out under a store path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// JSON record per service instance
    Default,
    /// Bare address per service instance, no tags
    Puro,
}

/// Kind tokens accepted in the store list. New formats add a variant and a row.
const FORMATS: &[(&str, FormatKind)] = &[
    ("default", FormatKind::Default),
    ("puro", FormatKind::Puro),
];

impl FormatKind {
    /// Resolve a store kind token. Matching is case-sensitive.
    pub fn resolve(token: &str) -> Option<FormatKind> {
        FORMATS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, kind)| *kind)
    }

    /// Token this format is declared with
    pub fn as_str(&self) -> &'static str {
        FORMATS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_tokens() {
        assert_eq!(FormatKind::resolve("default"), Some(FormatKind::Default));
        assert_eq!(FormatKind::resolve("puro"), Some(FormatKind::Puro));
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert_eq!(FormatKind::resolve("Default"), None);
        assert_eq!(FormatKind::resolve("PURO"), None);
        assert_eq!(FormatKind::resolve("foo"), None);
        assert_eq!(FormatKind::resolve(""), None);
    }

    #[test]
    fn test_display_matches_token() {
        assert_eq!(FormatKind::Default.to_string(), "default");
        assert_eq!(FormatKind::Puro.to_string(), "puro");
    }
}
