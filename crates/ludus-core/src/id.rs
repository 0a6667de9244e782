//! Prefixed identifier generation
//!
//! Every entity id has the shape `prefix_xxxxxxxx` where the suffix is the
//! first 8 hex characters of a random UUIDv4. No in-process collision check
//! happens here; the store enforces uniqueness where it matters.

use uuid::Uuid;

/// Entity prefixes recognized across the state document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Session,
    Lineage,
    Agent,
    Artifact,
    Directive,
}

impl IdPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            IdPrefix::Session => "ses",
            IdPrefix::Lineage => "lin",
            IdPrefix::Agent => "agt",
            IdPrefix::Artifact => "art",
            IdPrefix::Directive => "dir",
        }
    }
}

/// Generate a fresh prefixed id, e.g. `ses_1f4a9c02`.
pub fn new_id(prefix: IdPrefix) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix.as_str(), &hex[..8])
}

/// Check that an id matches `^(ses|lin|agt|art|dir)_[a-f0-9]{8}$`.
pub fn is_well_formed(id: &str) -> bool {
    let Some((prefix, suffix)) = id.split_once('_') else {
        return false;
    };
    matches!(prefix, "ses" | "lin" | "agt" | "art" | "dir")
        && suffix.len() == 8
        && suffix
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}
