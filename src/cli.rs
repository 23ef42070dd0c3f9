// CLI commands

use crate::core::{Address, Block};
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "utxo-ledger")]
#[command(about = "Single-node educational UTXO ledger", long_about = None)]
pub struct Cli {
    /// Directory holding the ledger database
    #[arg(long, global = true, default_value = "./data")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger and mine the genesis block
    Init {
        /// Address receiving the genesis reward
        #[arg(long)]
        address: String,
    },

    /// Submit a transfer batch and mine it into one block
    Send {
        /// Sender addresses (comma-separated, parallel to --to/--amount)
        #[arg(long, value_delimiter = ',')]
        from: Vec<String>,
        /// Recipient addresses
        #[arg(long, value_delimiter = ',')]
        to: Vec<String>,
        /// Amounts to transfer
        #[arg(long, value_delimiter = ',')]
        amount: Vec<u64>,
    },

    /// Query the balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },

    /// Print the chain from tip to genesis
    Print {
        /// Emit one JSON document instead of text
        #[arg(long)]
        json: bool,
    },
}

/// CLI handler owning the open ledger handle for one invocation.
pub struct CliHandler {
    ledger: Ledger,
}

impl CliHandler {
    pub fn new(data_dir: &str) -> Result<Self> {
        Ok(Self {
            ledger: Ledger::open(data_dir)?,
        })
    }

    pub fn handle(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { address } => self.init(&address),
            Commands::Send { from, to, amount } => self.send(from, to, &amount),
            Commands::Balance { address } => self.balance(&address),
            Commands::Print { json } => self.print(json),
        }
    }

    /// Release the store handle, surfacing flush failures.
    pub fn close(self) -> Result<()> {
        self.ledger.close()
    }

    fn init(&self, address: &str) -> Result<()> {
        let address = Address::new(address)?;
        let hash = self.ledger.init(&address)?;
        println!("Ledger initialized");
        println!("  Genesis block: {}", hash);
        println!("  Reward to: {}", address);
        Ok(())
    }

    fn send(&self, from: Vec<String>, to: Vec<String>, amounts: &[u64]) -> Result<()> {
        let from = from
            .into_iter()
            .map(Address::new)
            .collect::<Result<Vec<_>>>()?;
        let to = to
            .into_iter()
            .map(Address::new)
            .collect::<Result<Vec<_>>>()?;

        let hash = self.ledger.transfer(&from, &to, amounts)?;
        println!("Block admitted: {}", hash);
        Ok(())
    }

    fn balance(&self, address: &str) -> Result<()> {
        let address = Address::new(address)?;
        let balance = self.ledger.balance(&address)?;
        println!("Balance of {}: {}", address, balance);
        Ok(())
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            let dump = self
                .ledger
                .blocks()?
                .map(|block| Ok(BlockDump::from(&block?)))
                .collect::<Result<Vec<_>>>()?;
            let rendered = serde_json::to_string_pretty(&dump)
                .map_err(|e| LedgerError::Codec(e.to_string()))?;
            println!("{}", rendered);
            return Ok(());
        }

        for block in self.ledger.blocks()? {
            print_block(&block?);
        }
        Ok(())
    }
}

fn print_block(block: &Block) {
    println!("Block:");
    println!("  Hash: {}", block.hash());
    println!("  Previous: {}", block.prev_hash);
    println!("  Timestamp: {}", block.timestamp);
    println!("  Nonce: {}", block.nonce);
    println!("  Transactions: {}", block.transactions.len());

    for (i, tx) in block.transactions.iter().enumerate() {
        let kind = if tx.is_coinbase() { " (coinbase)" } else { "" };
        println!("    [{}] {}{}", i, tx.txid(), kind);
        for output in &tx.outputs {
            println!("        {} -> {}", output.value, output.to);
        }
    }
}

#[derive(Serialize)]
struct BlockDump {
    hash: String,
    prev_hash: String,
    timestamp: u64,
    nonce: u64,
    transactions: Vec<TxDump>,
}

#[derive(Serialize)]
struct TxDump {
    txid: String,
    coinbase: bool,
    inputs: Vec<InputDump>,
    outputs: Vec<OutputDump>,
}

#[derive(Serialize)]
struct InputDump {
    prev_txid: String,
    prev_index: u32,
    from: String,
}

#[derive(Serialize)]
struct OutputDump {
    value: u64,
    to: String,
}

impl From<&Block> for BlockDump {
    fn from(block: &Block) -> Self {
        Self {
            hash: block.hash().to_hex(),
            prev_hash: block.prev_hash.to_hex(),
            timestamp: block.timestamp,
            nonce: block.nonce,
            transactions: block
                .transactions
                .iter()
                .map(|tx| TxDump {
                    txid: tx.txid().to_hex(),
                    coinbase: tx.is_coinbase(),
                    inputs: tx
                        .inputs
                        .iter()
                        .map(|input| InputDump {
                            prev_txid: input.prev_txid.to_hex(),
                            prev_index: input.prev_index,
                            from: input.from.to_string(),
                        })
                        .collect(),
                    outputs: tx
                        .outputs
                        .iter()
                        .map(|output| OutputDump {
                            value: output.value,
                            to: output.to.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
