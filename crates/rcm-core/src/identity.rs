//! Unified patient identity.
//!
//! Source systems number their patients independently, so a local id is only
//! meaningful together with the database or file it came from. The unified
//! key joins the two and is the SCD2 join key across runs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key assigned to rows whose local id or provenance is missing.
///
/// Resolved keys always contain [`SEPARATOR`], this one never does.
pub const UNKNOWN_IDENTITY: &str = "unknown";

const SEPARATOR: char = '_';

/// Globally unique patient identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnifiedKey(String);

impl UnifiedKey {
    pub fn unknown() -> Self {
        Self(UNKNOWN_IDENTITY.to_string())
    }

    /// Wraps a key read back from a persisted snapshot.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IDENTITY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provenance tag of a row: its source database, else its source file.
pub fn provenance_tag<'a>(source_db: &'a str, source_file: &'a str) -> &'a str {
    let source_db = source_db.trim();
    if source_db.is_empty() {
        source_file.trim()
    } else {
        source_db
    }
}

/// Derive the unified key from a source-local id and a provenance tag.
///
/// Pure: the same inputs always produce the same key. A blank id or tag
/// resolves to [`UnifiedKey::unknown`].
///
/// The id and tag are joined with `_` and not escaped, so keys stay readable
/// and match those already stored in snapshots. Two pairs that differ only in
/// where an underscore falls, such as (`P1_a`, `b`) and (`P1`, `a_b`), map to
/// the same key.
///
/// # Examples
///
/// ```
/// use rcm_core::identity::resolve_unified_key;
///
/// assert_eq!(resolve_unified_key("P1", "hospital_a").as_str(), "P1_hospital_a");
/// assert!(resolve_unified_key("", "hospital_a").is_unknown());
/// ```
pub fn resolve_unified_key(local_id: &str, provenance: &str) -> UnifiedKey {
    let local_id = local_id.trim();
    let provenance = provenance.trim();
    if local_id.is_empty() || provenance.is_empty() {
        return UnifiedKey::unknown();
    }
    UnifiedKey(format!("{local_id}{SEPARATOR}{provenance}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let a = resolve_unified_key("P1", "hospital_a");
        let b = resolve_unified_key(" P1 ", "hospital_a ");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "P1_hospital_a");
    }

    #[test]
    fn sources_keep_identities_apart() {
        assert_ne!(
            resolve_unified_key("P1", "hospital_a"),
            resolve_unified_key("P1", "hospital_b")
        );
    }

    #[test]
    fn missing_parts_resolve_to_unknown() {
        assert!(resolve_unified_key("", "hospital_a").is_unknown());
        assert!(resolve_unified_key("P1", "  ").is_unknown());
    }

    #[test]
    fn unknown_never_collides_with_resolved_keys() {
        // A local id literally named "unknown" still carries its provenance.
        let resolved = resolve_unified_key("unknown", "hospital_a");
        assert!(!resolved.is_unknown());
        assert_ne!(resolved, UnifiedKey::unknown());
    }

    #[test]
    fn underscores_are_not_escaped() {
        assert_eq!(
            resolve_unified_key("P1_a", "b"),
            resolve_unified_key("P1", "a_b")
        );
        assert_eq!(resolve_unified_key("P_1", "hospital_a").as_str(), "P_1_hospital_a");
    }

    #[test]
    fn provenance_prefers_source_database() {
        assert_eq!(provenance_tag("hospital_a", "claims_1.csv"), "hospital_a");
        assert_eq!(provenance_tag(" ", "claims_1.csv"), "claims_1.csv");
        assert_eq!(provenance_tag("", ""), "");
    }
}
