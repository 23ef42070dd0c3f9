// Block data structure

use crate::core::serialize::{Serializable, read_varint, write_varint};
use crate::core::{Hash256, Transaction, hash256};
use crate::error::Result;
use std::io::{Cursor, Read, Write};

/// One link of the chain. The hash is computed exactly once, in the
/// constructor, from the other four fields; there is no way to mutate a
/// block after construction, so the cached value can never go stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub prev_hash: Hash256,
    /// Creation time, unix seconds. Recorded but not ordered-checked.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    hash: Hash256,
}

impl Block {
    pub fn new(
        prev_hash: Hash256,
        timestamp: u64,
        transactions: Vec<Transaction>,
        nonce: u64,
    ) -> Self {
        let hash = Self::content_hash(prev_hash, timestamp, &transactions, nonce);
        Self {
            prev_hash,
            timestamp,
            transactions,
            nonce,
            hash,
        }
    }

    pub fn hash(&self) -> Hash256 {
        self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_zero()
    }

    /// Hash preimage without the trailing nonce. The miner reuses this
    /// prefix across nonce candidates.
    pub(crate) fn hash_prefix(
        prev_hash: Hash256,
        timestamp: u64,
        transactions: &[Transaction],
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(prev_hash.as_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        write_varint(&mut buf, transactions.len() as u64).expect("write to Vec cannot fail");
        for tx in transactions {
            tx.write_to(&mut buf).expect("write to Vec cannot fail");
        }
        buf
    }

    /// The block content hash:
    /// hash256(prev_hash || timestamp || varint(#txs) || txs || nonce).
    pub fn content_hash(
        prev_hash: Hash256,
        timestamp: u64,
        transactions: &[Transaction],
        nonce: u64,
    ) -> Hash256 {
        let mut buf = Self::hash_prefix(prev_hash, timestamp, transactions);
        buf.extend_from_slice(&nonce.to_le_bytes());
        hash256(&buf)
    }
}

impl Serializable for Block {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_all(self.prev_hash.as_bytes())
            .expect("write to Vec cannot fail");
        buf.write_all(&self.timestamp.to_le_bytes())
            .expect("write to Vec cannot fail");
        buf.write_all(&self.nonce.to_le_bytes())
            .expect("write to Vec cannot fail");
        write_varint(&mut buf, self.transactions.len() as u64)
            .expect("write to Vec cannot fail");
        for tx in &self.transactions {
            tx.write_to(&mut buf).expect("write to Vec cannot fail");
        }
        buf
    }

    // The cached hash is not part of the record; it is a pure function of
    // the fields and gets recomputed here, so a corrupted record can never
    // masquerade under its original key.
    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let mut prev_bytes = [0u8; 32];
        cursor.read_exact(&mut prev_bytes)?;

        let mut timestamp_bytes = [0u8; 8];
        cursor.read_exact(&mut timestamp_bytes)?;

        let mut nonce_bytes = [0u8; 8];
        cursor.read_exact(&mut nonce_bytes)?;

        let tx_count = read_varint(&mut cursor)? as usize;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            transactions.push(Transaction::read_from(&mut cursor)?);
        }

        Ok(Self::new(
            Hash256::new(prev_bytes),
            u64::from_le_bytes(timestamp_bytes),
            transactions,
            u64::from_le_bytes(nonce_bytes),
        ))
    }
}
