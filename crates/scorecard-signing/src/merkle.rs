//! RFC 6962 Merkle tree verification.
//!
//! The log commits to entries with domain-separated SHA-256: leaves hash
//! under a `0x00` prefix, interior nodes under `0x01`. An inclusion proof is
//! the chain of sibling hashes from a leaf to the signed root.

use sha2::{Digest, Sha256};

use crate::ProofError;

pub const HASH_SIZE: usize = 32;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

pub fn leaf_hash(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

pub fn node_hash(left: &[u8; HASH_SIZE], right: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// The leaf hash committed to by an entry ID. Entry IDs may carry a tree-ID
/// prefix; only the trailing 32 bytes are the leaf hash.
pub fn leaf_hash_from_entry_id(entry_id: &str) -> Result<[u8; HASH_SIZE], ProofError> {
    let decoded = hex::decode(entry_id)
        .map_err(|_| ProofError::Malformed("entry id is not valid hex".to_string()))?;
    if decoded.len() < HASH_SIZE {
        return Err(ProofError::Malformed(
            "entry id is shorter than a leaf hash".to_string(),
        ));
    }
    let mut leaf = [0u8; HASH_SIZE];
    leaf.copy_from_slice(&decoded[decoded.len() - HASH_SIZE..]);
    Ok(leaf)
}

/// Verify that `leaf` sits at `leaf_index` of the tree of `tree_size` leaves
/// whose root is `root`, using the sibling `proof` hashes.
pub fn verify_inclusion(
    leaf_index: u64,
    tree_size: u64,
    leaf: &[u8; HASH_SIZE],
    proof: &[[u8; HASH_SIZE]],
    root: &[u8; HASH_SIZE],
) -> Result<(), ProofError> {
    let computed = root_from_inclusion_proof(leaf_index, tree_size, leaf, proof)?;
    if computed != *root {
        return Err(ProofError::InclusionFailed);
    }
    Ok(())
}

/// Recompute the root committed to by an inclusion proof.
///
/// The proof decomposes into an "inner" part, where the path may have
/// siblings on either side, and a "border" part along the right edge of the
/// tree where every sibling is on the left.
fn root_from_inclusion_proof(
    leaf_index: u64,
    tree_size: u64,
    leaf: &[u8; HASH_SIZE],
    proof: &[[u8; HASH_SIZE]],
) -> Result<[u8; HASH_SIZE], ProofError> {
    if tree_size == 0 {
        return Err(ProofError::Malformed("tree is empty".to_string()));
    }
    if leaf_index >= tree_size {
        return Err(ProofError::Malformed(format!(
            "leaf index {leaf_index} out of range for tree size {tree_size}"
        )));
    }

    let inner = inner_proof_size(leaf_index, tree_size);
    let border = (leaf_index >> inner).count_ones() as usize;
    if proof.len() != inner + border {
        return Err(ProofError::Malformed(format!(
            "wrong proof size {}, want {}",
            proof.len(),
            inner + border
        )));
    }

    let mut seed = *leaf;
    for (i, sibling) in proof[..inner].iter().enumerate() {
        if (leaf_index >> i) & 1 == 0 {
            seed = node_hash(&seed, sibling);
        } else {
            seed = node_hash(sibling, &seed);
        }
    }
    for sibling in &proof[inner..] {
        seed = node_hash(sibling, &seed);
    }
    Ok(seed)
}

fn inner_proof_size(leaf_index: u64, tree_size: u64) -> usize {
    (u64::BITS - (leaf_index ^ (tree_size - 1)).leading_zeros()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(count: usize) -> Vec<[u8; HASH_SIZE]> {
        (0..count)
            .map(|i| leaf_hash(format!("entry-{i}").as_bytes()))
            .collect()
    }

    fn subtree_root(leaves: &[[u8; HASH_SIZE]]) -> [u8; HASH_SIZE] {
        if leaves.len() == 1 {
            return leaves[0];
        }
        let k = largest_power_of_two_below(leaves.len());
        node_hash(&subtree_root(&leaves[..k]), &subtree_root(&leaves[k..]))
    }

    fn largest_power_of_two_below(n: usize) -> usize {
        let mut k = 1;
        while k * 2 < n {
            k *= 2;
        }
        k
    }

    fn proof_for(index: usize, leaves: &[[u8; HASH_SIZE]]) -> Vec<[u8; HASH_SIZE]> {
        if leaves.len() == 1 {
            return Vec::new();
        }
        let k = largest_power_of_two_below(leaves.len());
        if index < k {
            let mut proof = proof_for(index, &leaves[..k]);
            proof.push(subtree_root(&leaves[k..]));
            proof
        } else {
            let mut proof = proof_for(index - k, &leaves[k..]);
            proof.push(subtree_root(&leaves[..k]));
            proof
        }
    }

    #[test]
    fn single_leaf_tree_root_is_the_leaf() {
        let leaves = leaves(1);
        verify_inclusion(0, 1, &leaves[0], &[], &leaves[0]).unwrap();
    }

    #[test]
    fn every_leaf_verifies_in_small_trees() {
        for size in 1..=8usize {
            let leaves = leaves(size);
            let root = subtree_root(&leaves);
            for (index, leaf) in leaves.iter().enumerate() {
                let proof = proof_for(index, &leaves);
                verify_inclusion(index as u64, size as u64, leaf, &proof, &root)
                    .unwrap_or_else(|err| {
                        panic!("leaf {index} of {size} failed to verify: {err}")
                    });
            }
        }
    }

    #[test]
    fn tampered_leaf_fails() {
        let leaves = leaves(5);
        let root = subtree_root(&leaves);
        let proof = proof_for(2, &leaves);
        let wrong = leaf_hash(b"someone-else");
        assert!(matches!(
            verify_inclusion(2, 5, &wrong, &proof, &root),
            Err(ProofError::InclusionFailed)
        ));
    }

    #[test]
    fn wrong_index_fails() {
        let leaves = leaves(4);
        let root = subtree_root(&leaves);
        let proof = proof_for(1, &leaves);
        assert!(verify_inclusion(2, 4, &leaves[1], &proof, &root).is_err());
    }

    #[test]
    fn truncated_proof_is_malformed() {
        let leaves = leaves(6);
        let root = subtree_root(&leaves);
        let mut proof = proof_for(3, &leaves);
        proof.pop();
        assert!(matches!(
            verify_inclusion(3, 6, &leaves[3], &proof, &root),
            Err(ProofError::Malformed(_))
        ));
    }

    #[test]
    fn out_of_range_index_is_malformed() {
        let leaves = leaves(3);
        let root = subtree_root(&leaves);
        assert!(matches!(
            verify_inclusion(3, 3, &leaves[0], &[], &root),
            Err(ProofError::Malformed(_))
        ));
    }

    #[test]
    fn entry_id_trailing_bytes_become_the_leaf() {
        let plain = "ab".repeat(32);
        let leaf = leaf_hash_from_entry_id(&plain).unwrap();
        assert_eq!(leaf, [0xab; 32]);

        let prefixed = format!("{}{}", "11".repeat(8), "cd".repeat(32));
        let leaf = leaf_hash_from_entry_id(&prefixed).unwrap();
        assert_eq!(leaf, [0xcd; 32]);
    }

    #[test]
    fn short_or_invalid_entry_ids_are_rejected() {
        assert!(leaf_hash_from_entry_id(&"ab".repeat(16)).is_err());
        assert!(leaf_hash_from_entry_id("not-hex").is_err());
    }
}
