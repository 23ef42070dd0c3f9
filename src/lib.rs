// Single-node educational UTXO ledger
//
// An append-only hash-linked chain in an embedded store, value transfer
// through unspent transaction outputs, block admission gated by
// proof-of-work.

pub mod cli;
pub mod consensus;
pub mod core;
pub mod error;
pub mod ledger;
pub mod storage;

// Re-exports for convenience
pub use cli::{Cli, CliHandler};
pub use consensus::{Miner, PowSolution};
pub use core::{Address, Block, Hash256, Transaction, TxInput, TxOutput};
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig, UtxoEntry, UtxoView};
pub use storage::{ChainDb, ChainIter};
