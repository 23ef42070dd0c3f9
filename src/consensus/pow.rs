// Proof of work

use crate::core::{Block, Hash256, Transaction, hash256};
use std::time::{Duration, Instant};

/// Difficulty in the original implementation: the top 16 bits of an
/// admissible hash must be zero.
pub const DEFAULT_DIFFICULTY_BITS: u32 = 16;

/// Big-endian 32-byte representation of 2^(256 - difficulty_bits).
/// A hash is admissible when it is numerically below this value.
pub fn target_from_bits(difficulty_bits: u32) -> Hash256 {
    assert!(
        (1..=255).contains(&difficulty_bits),
        "difficulty_bits must be in 1..=255"
    );
    let shift = 256 - difficulty_bits as usize;
    let mut target = [0u8; 32];
    target[31 - shift / 8] = 1 << (shift % 8);
    Hash256::new(target)
}

/// Nonce searcher with a fixed difficulty target.
pub struct Miner {
    target: Hash256,
}

impl Miner {
    pub fn new(difficulty_bits: u32) -> Self {
        Self {
            target: target_from_bits(difficulty_bits),
        }
    }

    /// Search nonces from 0 upward until the block content hash falls below
    /// the target. CPU-bound, no I/O; the search cannot fail for a
    /// representable difficulty (the u64 nonce space is never exhausted in
    /// practice).
    pub fn mine(
        &self,
        prev_hash: Hash256,
        timestamp: u64,
        transactions: &[Transaction],
    ) -> PowSolution {
        let started = Instant::now();
        let mut buf = Block::hash_prefix(prev_hash, timestamp, transactions);
        let prefix_len = buf.len();

        let mut attempts = 0u64;
        for nonce in 0..=u64::MAX {
            buf.truncate(prefix_len);
            buf.extend_from_slice(&nonce.to_le_bytes());
            let hash = hash256(&buf);
            attempts += 1;

            if self.meets_target(&hash) {
                return PowSolution {
                    nonce,
                    hash,
                    attempts,
                    elapsed: started.elapsed(),
                };
            }

            if attempts % 100_000 == 0 {
                let elapsed = started.elapsed();
                log::debug!(
                    "mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }
        }
        unreachable!("u64 nonce space exhausted")
    }

    /// Check an already-built block against the target.
    pub fn verify(&self, block: &Block) -> bool {
        let hash = Block::content_hash(
            block.prev_hash,
            block.timestamp,
            &block.transactions,
            block.nonce,
        );
        hash == block.hash() && self.meets_target(&hash)
    }

    /// Big-endian unsigned comparison: hash < target.
    #[inline]
    fn meets_target(&self, hash: &Hash256) -> bool {
        hash.as_bytes() < self.target.as_bytes()
    }
}

/// Outcome of a nonce search.
#[derive(Debug)]
pub struct PowSolution {
    pub nonce: u64,
    pub hash: Hash256,
    pub attempts: u64,
    pub elapsed: Duration,
}

impl PowSolution {
    pub fn hash_rate(&self) -> f64 {
        self.attempts as f64 / self.elapsed.as_secs_f64()
    }
}
