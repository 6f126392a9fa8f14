//! Entry-level proof verification: the Merkle inclusion proof and the
//! signed entry timestamp together prove a record is really in the log.

use p256::ecdsa::VerifyingKey;

use crate::merkle::{self, HASH_SIZE};
use crate::set;
use crate::tlog::LogEntry;
use crate::ProofError;

/// Verify that `entry` (fetched under `entry_id`) is included in the log and
/// that the log signed it.
pub fn verify_log_entry(
    entry_id: &str,
    entry: &LogEntry,
    log_key: &VerifyingKey,
) -> Result<(), ProofError> {
    let verification = entry.verification.as_ref().ok_or(ProofError::MissingProof)?;
    let proof = verification
        .inclusion_proof
        .as_ref()
        .ok_or(ProofError::MissingProof)?;
    let signed_entry_timestamp = verification
        .signed_entry_timestamp
        .as_deref()
        .ok_or(ProofError::MissingProof)?;

    let leaf = merkle::leaf_hash_from_entry_id(entry_id)?;
    let root = decode_hash(&proof.root_hash, "root hash")?;
    let hashes = proof
        .hashes
        .iter()
        .map(|hash| decode_hash(hash, "proof hash"))
        .collect::<Result<Vec<_>, _>>()?;

    merkle::verify_inclusion(proof.log_index, proof.tree_size, &leaf, &hashes, &root)?;

    set::verify_set(
        &entry.body,
        entry.integrated_time,
        &entry.log_id,
        entry.log_index,
        signed_entry_timestamp,
        log_key,
    )
}

fn decode_hash(value: &str, what: &str) -> Result<[u8; HASH_SIZE], ProofError> {
    let decoded =
        hex::decode(value).map_err(|_| ProofError::Malformed(format!("{what} is not hex")))?;
    decoded
        .try_into()
        .map_err(|_| ProofError::Malformed(format!("{what} has the wrong length")))
}
