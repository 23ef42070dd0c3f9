// Ledger engine
//
// Orchestrates the other components: genesis creation, transfer batches
// (build transactions, mine, commit, advance tip), balance queries, and
// the chain dump. One explicit handle per open store; no ambient state.

mod utxo;

pub use utxo::{OutPoint, UtxoEntry, UtxoView};

use crate::consensus::{DEFAULT_DIFFICULTY_BITS, Miner};
use crate::core::{Address, Block, Hash256, Transaction, TxInput, TxOutput};
use crate::error::{LedgerError, Result};
use crate::storage::{ChainDb, ChainIter};
use std::collections::HashSet;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Block reward in the original implementation.
pub const DEFAULT_SUBSIDY: u64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    pub difficulty_bits: u32,
    /// Reward paid by the genesis coinbase and by every mined block.
    pub subsidy: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: DEFAULT_DIFFICULTY_BITS,
            subsidy: DEFAULT_SUBSIDY,
        }
    }
}

/// Handle to one ledger instance. All operations are synchronous and run
/// to completion; the store serializes the single writer.
pub struct Ledger {
    db: ChainDb,
    miner: Miner,
    subsidy: u64,
}

impl Ledger {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, LedgerConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: LedgerConfig) -> Result<Self> {
        Ok(Self::with_db(ChainDb::open(path)?, config))
    }

    /// In-memory instance (for tests).
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Ok(Self::with_db(ChainDb::memory()?, config))
    }

    fn with_db(db: ChainDb, config: LedgerConfig) -> Self {
        Self {
            db,
            miner: Miner::new(config.difficulty_bits),
            subsidy: config.subsidy,
        }
    }

    /// Create the ledger: mine and admit the genesis block, whose single
    /// coinbase pays the subsidy to `reward_addr`.
    pub fn init(&self, reward_addr: &Address) -> Result<Hash256> {
        if self.db.tip()?.is_some() {
            return Err(LedgerError::AlreadyInitialized);
        }
        let coinbase = Transaction::coinbase(self.subsidy, reward_addr.clone());
        self.admit(Hash256::zero(), vec![coinbase])
    }

    /// Submit a transfer batch: one transaction per `(from, to, amount)`
    /// triple plus one coinbase paying the subsidy to `from[0]`, all mined
    /// into a single block on the current tip.
    ///
    /// Triples are processed strictly in input order; outputs selected by
    /// an earlier triple are reserved and invisible to later ones, and
    /// outputs created by the in-flight batch are not spendable within it.
    /// On any failure nothing is stored and the tip is unchanged.
    pub fn transfer(
        &self,
        from: &[Address],
        to: &[Address],
        amounts: &[u64],
    ) -> Result<Hash256> {
        if from.is_empty() || from.len() != to.len() || from.len() != amounts.len() {
            return Err(LedgerError::EmptyTransferSet);
        }
        let tip = self.db.tip()?.ok_or(LedgerError::NotInitialized)?;
        let view = UtxoView::new(&self.db, tip);

        let mut reserved: HashSet<OutPoint> = HashSet::new();
        let mut transactions = Vec::with_capacity(from.len() + 1);
        for ((from_addr, to_addr), &amount) in from.iter().zip(to).zip(amounts) {
            let (selected, total) = view.select_spendable(from_addr, amount, &reserved)?;

            let inputs = selected
                .iter()
                .map(|entry| TxInput::new(entry.txid, entry.vout, from_addr.clone()))
                .collect();
            let mut outputs = vec![TxOutput::new(amount, to_addr.clone())];
            if total > amount {
                outputs.push(TxOutput::new(total - amount, from_addr.clone()));
            }
            reserved.extend(selected.iter().map(UtxoEntry::outpoint));
            transactions.push(Transaction::new(inputs, outputs));
        }
        transactions.push(Transaction::coinbase(self.subsidy, from[0].clone()));

        self.admit(tip, transactions)
    }

    /// Sum of unspent outputs owned by `address` as of the current tip.
    pub fn balance(&self, address: &Address) -> Result<u64> {
        let tip = self.db.tip()?.ok_or(LedgerError::NotInitialized)?;
        UtxoView::new(&self.db, tip).balance(address)
    }

    /// Lazy tip-to-genesis block sequence. Restartable: every call starts
    /// a fresh traversal from the tip current at call time.
    pub fn blocks(&self) -> Result<ChainIter<'_>> {
        let tip = self.db.tip()?.ok_or(LedgerError::NotInitialized)?;
        Ok(self.db.chain_from(tip))
    }

    /// Flush and release the store handle.
    pub fn close(self) -> Result<()> {
        self.db.close()
    }

    /// Mine `transactions` on top of `prev_hash` and commit block + tip
    /// as one durable unit.
    fn admit(&self, prev_hash: Hash256, transactions: Vec<Transaction>) -> Result<Hash256> {
        let timestamp = unix_now();
        let solution = self.miner.mine(prev_hash, timestamp, &transactions);
        let block = Block::new(prev_hash, timestamp, transactions, solution.nonce);
        self.db.commit_block(&block)?;
        log::info!(
            "admitted block {} (nonce {}, {} attempts, {:.1} H/s)",
            block.hash(),
            solution.nonce,
            solution.attempts,
            solution.hash_rate()
        );
        Ok(block.hash())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    /// Low difficulty so every mined-path test completes in milliseconds.
    fn test_ledger(subsidy: u64) -> Ledger {
        Ledger::in_memory(LedgerConfig {
            difficulty_bits: 8,
            subsidy,
        })
        .unwrap()
    }

    fn collect_chain(ledger: &Ledger) -> Vec<Block> {
        ledger
            .blocks()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_init_pays_genesis_reward() {
        let ledger = test_ledger(10);
        ledger.init(&addr("miner")).unwrap();
        assert_eq!(ledger.balance(&addr("miner")).unwrap(), 10);
    }

    #[test]
    fn test_init_twice_fails() {
        let ledger = test_ledger(10);
        ledger.init(&addr("miner")).unwrap();
        assert!(matches!(
            ledger.init(&addr("miner")),
            Err(LedgerError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_operations_before_init_fail() {
        let ledger = test_ledger(10);
        assert!(matches!(
            ledger.balance(&addr("miner")),
            Err(LedgerError::NotInitialized)
        ));
        assert!(matches!(
            ledger.transfer(&[addr("a")], &[addr("b")], &[1]),
            Err(LedgerError::NotInitialized)
        ));
        assert!(ledger.blocks().is_err());
    }

    #[test]
    fn test_empty_transfer_set_rejected_before_store_access() {
        // Checked before the tip read: even an uninitialized ledger
        // reports the malformed batch, not NotInitialized.
        let ledger = test_ledger(10);
        assert!(matches!(
            ledger.transfer(&[], &[], &[]),
            Err(LedgerError::EmptyTransferSet)
        ));
        assert!(matches!(
            ledger.transfer(&[addr("a")], &[addr("b"), addr("c")], &[1]),
            Err(LedgerError::EmptyTransferSet)
        ));
        assert!(matches!(
            ledger.transfer(&[addr("a")], &[addr("b")], &[1, 2]),
            Err(LedgerError::EmptyTransferSet)
        ));
    }

    #[test]
    fn test_transfer_scenario() {
        // init("miner") with subsidy 10, then send 4 to alice: the miner
        // spends 4 of 10 and earns a fresh 10-unit reward.
        let ledger = test_ledger(10);
        ledger.init(&addr("miner")).unwrap();
        ledger
            .transfer(&[addr("miner")], &[addr("alice")], &[4])
            .unwrap();

        assert_eq!(ledger.balance(&addr("miner")).unwrap(), 16);
        assert_eq!(ledger.balance(&addr("alice")).unwrap(), 4);
    }

    #[test]
    fn test_change_output_returns_remainder() {
        let ledger = test_ledger(100);
        ledger.init(&addr("a")).unwrap();
        ledger.transfer(&[addr("a")], &[addr("b")], &[30]).unwrap();

        // 100 - 30 change plus the 100 reward for mining the block
        assert_eq!(ledger.balance(&addr("a")).unwrap(), 170);
        assert_eq!(ledger.balance(&addr("b")).unwrap(), 30);

        // exact spend: no change output
        ledger.transfer(&[addr("b")], &[addr("c")], &[30]).unwrap();
        let chain = collect_chain(&ledger);
        let spend = &chain[0].transactions[0];
        assert_eq!(spend.outputs.len(), 1);
    }

    #[test]
    fn test_insufficient_funds_leaves_tip_unchanged() {
        let ledger = test_ledger(10);
        ledger.init(&addr("miner")).unwrap();
        let tip_before = collect_chain(&ledger)[0].hash();

        let err = ledger
            .transfer(&[addr("miner")], &[addr("alice")], &[11])
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        let chain = collect_chain(&ledger);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].hash(), tip_before);
        assert_eq!(ledger.balance(&addr("miner")).unwrap(), 10);
    }

    #[test]
    fn test_multi_triple_batch_in_one_block() {
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();
        // split m's money across two outputs (change + reward) so both
        // triples of the batch below have an output of their own to spend
        ledger.transfer(&[addr("m")], &[addr("a")], &[3]).unwrap();

        ledger
            .transfer(&[addr("m"), addr("m")], &[addr("b"), addr("c")], &[5, 6])
            .unwrap();

        assert_eq!(ledger.balance(&addr("a")).unwrap(), 3);
        assert_eq!(ledger.balance(&addr("b")).unwrap(), 5);
        assert_eq!(ledger.balance(&addr("c")).unwrap(), 6);
        // held 7 + 10, spent 11, plus the 10-unit reward
        assert_eq!(ledger.balance(&addr("m")).unwrap(), 16);

        let chain = collect_chain(&ledger);
        assert_eq!(chain.len(), 3);
        // two transfers plus the coinbase in the tip block
        assert_eq!(chain[0].transactions.len(), 3);
        assert!(chain[0].transactions[2].is_coinbase());
    }

    #[test]
    fn test_batch_change_is_not_spendable_within_batch() {
        // The first triple reserves m's only output; its change exists
        // only in the in-flight block, so the second triple has nothing
        // to spend even though 3 + 4 <= 10.
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();

        let err = ledger
            .transfer(&[addr("m"), addr("m")], &[addr("a"), addr("b")], &[3, 4])
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { available: 0, .. }
        ));
        assert_eq!(collect_chain(&ledger).len(), 1);
    }

    #[test]
    fn test_batch_overdraft_fails_atomically() {
        // Two triples from the same address whose combined amount exceeds
        // its balance: the first reserves the only output, the second
        // fails, and nothing is admitted.
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();

        let err = ledger
            .transfer(&[addr("m"), addr("m")], &[addr("a"), addr("b")], &[8, 8])
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        assert_eq!(collect_chain(&ledger).len(), 1);
        assert_eq!(ledger.balance(&addr("m")).unwrap(), 10);
        assert_eq!(ledger.balance(&addr("a")).unwrap(), 0);
    }

    #[test]
    fn test_single_tip_chain_walk() {
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();
        ledger.transfer(&[addr("m")], &[addr("a")], &[1]).unwrap();
        ledger.transfer(&[addr("m")], &[addr("b")], &[2]).unwrap();

        let chain = collect_chain(&ledger);
        assert_eq!(chain.len(), 3);
        // each block links to the next one in dump order; only the last
        // block is genesis
        for pair in chain.windows(2) {
            assert_eq!(pair[0].prev_hash, pair[1].hash());
            assert!(!pair[0].is_genesis());
        }
        assert!(chain[2].is_genesis());
    }

    #[test]
    fn test_dump_is_restartable() {
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();
        ledger.transfer(&[addr("m")], &[addr("a")], &[1]).unwrap();

        let first: Vec<Hash256> = collect_chain(&ledger).iter().map(Block::hash).collect();
        let second: Vec<Hash256> = collect_chain(&ledger).iter().map(Block::hash).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_admitted_block_satisfies_pow() {
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();
        ledger.transfer(&[addr("m")], &[addr("a")], &[1]).unwrap();

        let miner = Miner::new(8);
        for block in collect_chain(&ledger) {
            assert!(miner.verify(&block));
        }
    }

    #[test]
    fn test_no_double_spend_across_chain() {
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();
        ledger.transfer(&[addr("m")], &[addr("a")], &[4]).unwrap();
        ledger.transfer(&[addr("m")], &[addr("b")], &[5]).unwrap();
        ledger.transfer(&[addr("a")], &[addr("b")], &[2]).unwrap();

        let mut seen: HashSet<OutPoint> = HashSet::new();
        for block in collect_chain(&ledger) {
            for tx in &block.transactions {
                for input in tx.inputs.iter().filter(|i| !i.is_coinbase()) {
                    let outpoint = OutPoint {
                        txid: input.prev_txid,
                        vout: input.prev_index,
                    };
                    assert!(seen.insert(outpoint), "outpoint referenced twice");
                }
            }
        }
    }

    #[test]
    fn test_conservation_of_value() {
        let ledger = test_ledger(10);
        ledger.init(&addr("m")).unwrap();
        ledger.transfer(&[addr("m")], &[addr("a")], &[4]).unwrap();
        ledger.transfer(&[addr("a")], &[addr("b")], &[3]).unwrap();

        let chain = collect_chain(&ledger);
        let txs_by_id: HashMap<Hash256, Transaction> = chain
            .iter()
            .flat_map(|b| b.transactions.iter())
            .map(|tx| (tx.txid(), tx.clone()))
            .collect();

        for tx in txs_by_id.values().filter(|tx| !tx.is_coinbase()) {
            let input_total: u64 = tx
                .inputs
                .iter()
                .map(|input| {
                    txs_by_id.get(&input.prev_txid).expect("referenced tx exists").outputs
                        [input.prev_index as usize]
                        .value
                })
                .sum();
            assert!(tx.total_output_value() <= input_total);
        }
    }
}
