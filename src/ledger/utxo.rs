// On-demand UTXO index
//
// No persistent state: the unspent set is derived from the chain on every
// query, walking tip to genesis. Because traversal is newest-first, an
// output's consumption is always seen before its creation, so one pass
// with a spent-outpoint set yields the exact UTXO set.

use crate::core::{Address, Hash256};
use crate::error::{LedgerError, Result};
use crate::storage::ChainDb;
use std::collections::HashSet;

/// Identity of one transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

/// An unspent output owned by the queried address.
#[derive(Debug, Clone)]
pub struct UtxoEntry {
    pub txid: Hash256,
    pub vout: u32,
    pub value: u64,
}

impl UtxoEntry {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout: self.vout,
        }
    }
}

/// Read-only view over the chain as of a fixed tip.
pub struct UtxoView<'a> {
    db: &'a ChainDb,
    tip: Hash256,
}

impl<'a> UtxoView<'a> {
    /// View the chain as of `tip` (normally the store's current tip).
    pub fn new(db: &'a ChainDb, tip: Hash256) -> Self {
        Self { db, tip }
    }

    /// All unspent outputs belonging to `address`, in traversal order
    /// (newest block first, output order within a transaction preserved).
    pub fn unspent_outputs(&self, address: &Address) -> Result<Vec<UtxoEntry>> {
        let mut spent: HashSet<OutPoint> = HashSet::new();
        let mut unspent = Vec::new();

        for block in self.db.chain_from(self.tip) {
            let block = block?;

            // Each block is atomic relative to the spent-set bookkeeping:
            // record every spend it contains before emitting any of its
            // outputs, so an output consumed by a sibling transaction in
            // the same block is never reported unspent.
            for tx in &block.transactions {
                for input in &tx.inputs {
                    if !input.is_coinbase() {
                        spent.insert(OutPoint {
                            txid: input.prev_txid,
                            vout: input.prev_index,
                        });
                    }
                }
            }

            for tx in &block.transactions {
                let txid = tx.txid();
                for (vout, output) in tx.outputs.iter().enumerate() {
                    let vout = vout as u32;
                    if output.to == *address && !spent.contains(&OutPoint { txid, vout }) {
                        unspent.push(UtxoEntry {
                            txid,
                            vout,
                            value: output.value,
                        });
                    }
                }
            }
        }

        Ok(unspent)
    }

    /// Sum of all unspent output values for `address`.
    pub fn balance(&self, address: &Address) -> Result<u64> {
        Ok(self
            .unspent_outputs(address)?
            .iter()
            .map(|entry| entry.value)
            .sum())
    }

    /// Greedy first-fit selection: walk the unspent outputs in scan order,
    /// skipping outpoints in `reserved`, and accumulate until the running
    /// total covers `amount`. Not minimal coin selection.
    pub fn select_spendable(
        &self,
        address: &Address,
        amount: u64,
        reserved: &HashSet<OutPoint>,
    ) -> Result<(Vec<UtxoEntry>, u64)> {
        let mut selected = Vec::new();
        let mut total = 0u64;

        for entry in self.unspent_outputs(address)? {
            if total >= amount {
                break;
            }
            if reserved.contains(&entry.outpoint()) {
                continue;
            }
            total += entry.value;
            selected.push(entry);
        }

        if total < amount {
            return Err(LedgerError::InsufficientFunds {
                address: address.to_string(),
                requested: amount,
                available: total,
            });
        }
        Ok((selected, total))
    }
}
