// Hashing for blocks and transaction ids

use crate::core::Hash256;
use sha2::{Digest, Sha256};

/// Double SHA-256: hash256 = SHA256(SHA256(data)).
/// Every content hash in the ledger (block hash, txid) goes through this.
pub fn hash256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    Hash256::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash256_deterministic() {
        let data = b"hello world";
        let hash = hash256(data);
        assert_eq!(hash, hash256(data));
        assert!(!hash.is_zero());
    }

    #[test]
    fn test_hash256_distinguishes_inputs() {
        assert_ne!(hash256(b"a"), hash256(b"b"));
    }

    #[test]
    fn test_hash256_empty_input() {
        let hash = hash256(b"");
        assert_eq!(hash.as_bytes().len(), 32);
    }
}
