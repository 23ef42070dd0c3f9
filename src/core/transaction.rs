// Transaction data structures

use crate::core::{Address, Hash256, hash256};
use crate::core::serialize::{
    Serializable, read_var_str, read_varint, write_var_str, write_varint,
};
use crate::error::Result;
use std::io::{Cursor, Read, Write};

/// Output index marking a synthetic coinbase input.
const COINBASE_INDEX: u32 = u32::MAX;

/// Transaction input - references an output of a previous transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Id of the transaction whose output is being spent.
    pub prev_txid: Hash256,
    /// Index of that output within the referenced transaction.
    pub prev_index: u32,
    /// Owner of the referenced output.
    pub from: Address,
}

impl TxInput {
    pub fn new(prev_txid: Hash256, prev_index: u32, from: Address) -> Self {
        Self {
            prev_txid,
            prev_index,
            from,
        }
    }

    /// Synthetic input for a block reward. Has no real referent; `from`
    /// carries the reward recipient and is never treated as a spend.
    pub fn coinbase(recipient: Address) -> Self {
        Self {
            prev_txid: Hash256::zero(),
            prev_index: COINBASE_INDEX,
            from: recipient,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.prev_txid.is_zero() && self.prev_index == COINBASE_INDEX
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.prev_txid.as_bytes())?;
        writer.write_all(&self.prev_index.to_le_bytes())?;
        write_var_str(writer, self.from.as_str())
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut txid_bytes = [0u8; 32];
        reader.read_exact(&mut txid_bytes)?;

        let mut index_bytes = [0u8; 4];
        reader.read_exact(&mut index_bytes)?;

        let from = Address::new(read_var_str(reader)?)?;

        Ok(Self {
            prev_txid: Hash256::new(txid_bytes),
            prev_index: u32::from_le_bytes(index_bytes),
            from,
        })
    }
}

/// Transaction output - a value assigned to an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub to: Address,
}

impl TxOutput {
    pub fn new(value: u64, to: Address) -> Self {
        Self { value, to }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.value.to_le_bytes())?;
        write_var_str(writer, self.to.as_str())
    }

    fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut value_bytes = [0u8; 8];
        reader.read_exact(&mut value_bytes)?;
        let to = Address::new(read_var_str(reader)?)?;
        Ok(Self {
            value: u64::from_le_bytes(value_bytes),
            to,
        })
    }
}

/// A value transfer: inputs consumed, outputs created. Order of both lists
/// is part of the transaction's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self { inputs, outputs }
    }

    /// Build a block-reward transaction: one synthetic input, one output of
    /// `value` to `recipient`.
    pub fn coinbase(value: u64, recipient: Address) -> Self {
        Self {
            inputs: vec![TxInput::coinbase(recipient.clone())],
            outputs: vec![TxOutput::new(value, recipient)],
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Transaction id: double SHA-256 of the canonical serialization.
    /// Derived on demand, never stored.
    pub fn txid(&self) -> Hash256 {
        hash256(&self.serialize())
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|out| out.value).sum()
    }

    pub(crate) fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let input_count = read_varint(reader)? as usize;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = read_varint(reader)? as usize;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOutput::read_from(reader)?);
        }

        Ok(Self { inputs, outputs })
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_varint(writer, self.inputs.len() as u64)?;
        for input in &self.inputs {
            input.write_to(writer)?;
        }
        write_varint(writer, self.outputs.len() as u64)?;
        for output in &self.outputs {
            output.write_to(writer)?;
        }
        Ok(())
    }
}

impl Serializable for Transaction {
    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf).expect("write to Vec cannot fail");
        buf
    }

    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        Self::read_from(&mut cursor)
    }
}
