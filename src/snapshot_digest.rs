use crate::models::{Lead, ScoreRecord};
use hex;
use sha2::{Digest, Sha256};

/// SHA-256 fingerprint of a normalized snapshot.
///
/// Used to:
/// 1. Tell whether a refresh actually changed anything
/// 2. Serve an `ETag` for view responses
///
/// The digest covers the normalized records, so two fetches that differ only
/// in fields the engine ignores produce the same fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct SnapshotDigest(String);

impl SnapshotDigest {
    /// Computes the digest of a snapshot's records and leads.
    pub fn compute(records: &[ScoreRecord], leads: &[Lead]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(records).unwrap_or_default());
        // separator so moving rows between the two lists changes the digest
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(leads).unwrap_or_default());
        Self(hex::encode(hasher.finalize()))
    }

    /// Hex-encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Quoted form for the `ETag` header.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }
}
