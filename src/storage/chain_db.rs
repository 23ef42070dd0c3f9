// Chain store backed by sled
//
// Two logical tables: `blocks` maps block hash to the canonical block
// record, `chainstate` holds the single mutable tip pointer. A block and
// the tip advance land in one sled transaction; readers never observe one
// without the other.

use crate::core::{Block, Hash256, Serializable};
use crate::error::{LedgerError, Result};
use crate::storage::ChainIter;
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;

const TREE_BLOCKS: &str = "blocks";
const TREE_CHAINSTATE: &str = "chainstate";
const KEY_TIP: &[u8] = b"tip";

pub struct ChainDb {
    db: sled::Db,
    blocks: sled::Tree,
    state: sled::Tree,
}

impl ChainDb {
    /// Open or create the store at `path`. Fails with `StoreUnavailable`
    /// if the directory cannot be opened or locked.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        let store = Self::from_db(db)?;
        log::info!("chain store opened at {}", path.as_ref().display());
        Ok(store)
    }

    /// Temporary in-memory store (for tests).
    pub fn memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let blocks = db.open_tree(TREE_BLOCKS)?;
        let state = db.open_tree(TREE_CHAINSTATE)?;
        Ok(Self { db, blocks, state })
    }

    /// Hash of the most recently admitted block, if any.
    pub fn tip(&self) -> Result<Option<Hash256>> {
        match self.state.get(KEY_TIP)? {
            Some(bytes) => Ok(Some(Hash256::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch a block by hash.
    pub fn block(&self, hash: &Hash256) -> Result<Option<Block>> {
        match self.blocks.get(hash.as_bytes())? {
            Some(bytes) => Ok(Some(Block::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Admit a block: insert its record and advance the tip to it, as one
    /// durable unit. Re-inserting identical bytes is idempotent; the same
    /// hash with different bytes aborts with `DuplicateBlock`.
    pub fn commit_block(&self, block: &Block) -> Result<()> {
        let hash = block.hash();
        let encoded = block.serialize();

        (&self.blocks, &self.state)
            .transaction(|(blocks_tx, state_tx)| {
                let key: &[u8] = hash.as_bytes();
                if let Some(existing) = blocks_tx.get(key)? {
                    if existing.as_ref() != encoded.as_slice() {
                        return Err(ConflictableTransactionError::Abort(
                            LedgerError::DuplicateBlock(hash),
                        ));
                    }
                }
                blocks_tx.insert(key, encoded.clone())?;
                state_tx.insert(KEY_TIP, key)?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => LedgerError::from(err),
            })?;

        self.db.flush()?;
        log::debug!("committed block {}", hash);
        Ok(())
    }

    /// Lazy tip-to-genesis traversal starting at `from`.
    pub fn chain_from(&self, from: Hash256) -> ChainIter<'_> {
        ChainIter::new(self, from)
    }

    /// Flush and release the handle. Dropping the store also releases the
    /// sled lock, but an explicit close surfaces flush failures.
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
