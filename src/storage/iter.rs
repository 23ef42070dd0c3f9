// Backward chain traversal
//
// One traversal implementation serves both the UTXO scan and the chain
// dump, so the two can never disagree on chain order.

use crate::core::{Block, Hash256};
use crate::error::{LedgerError, Result};
use crate::storage::ChainDb;

/// Lazy walk from a starting block back to genesis along `prev_hash`
/// links. Each `Ledger::blocks()` call builds a fresh iterator from the
/// current tip, so traversals are restartable by construction.
pub struct ChainIter<'a> {
    db: &'a ChainDb,
    cursor: Option<Hash256>,
}

impl<'a> ChainIter<'a> {
    pub(crate) fn new(db: &'a ChainDb, from: Hash256) -> Self {
        Self {
            db,
            cursor: Some(from),
        }
    }
}

impl Iterator for ChainIter<'_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.cursor.take()?;
        match self.db.block(&hash) {
            Ok(Some(block)) => {
                if !block.is_genesis() {
                    self.cursor = Some(block.prev_hash);
                }
                Some(Ok(block))
            }
            // A dangling link means the chain is corrupt; report it rather
            // than silently ending the walk.
            Ok(None) => Some(Err(LedgerError::BlockNotFound(hash))),
            Err(e) => Some(Err(e)),
        }
    }
}
