//! Canonical campaign identifiers and the legacy-identifier read shim.

use serde::{Deserialize, Serialize};

/// Canonical campaign identifier.
///
/// New writes always store the raw string form handed to the dispatcher.
/// Historical records may carry the same identifier in its typed (ULID)
/// canonical form instead; reads go through [`compat::lookup_candidates`]
/// to cover both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CampaignId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Read-compatibility shim for records written before identifiers were
/// normalized. Store read paths are its only callers; write paths always
/// use the raw string.
pub mod compat {
    use ulid::Ulid;

    /// Candidate key forms for a raw campaign identifier, in lookup order:
    /// the raw string first, then (when the raw form parses as a ULID) its
    /// canonical uppercase rendering.
    #[must_use]
    pub fn lookup_candidates(raw: &str) -> Vec<String> {
        let mut candidates = vec![raw.to_string()];
        if let Ok(ulid) = Ulid::from_string(raw) {
            let canonical = ulid.to_string();
            if canonical != raw {
                candidates.push(canonical);
            }
        }
        candidates
    }
}
