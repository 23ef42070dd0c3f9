// Canonical encoding primitives
//
// Every hash preimage and every stored record uses these encoders, so the
// byte layout is identical across runs: little-endian fixed-width integers,
// compact varints for counts, varint-length-prefixed UTF-8 for addresses.

use crate::error::{LedgerError, Result};
use std::io::{self, Read, Write};

/// Types with a single canonical byte encoding.
pub trait Serializable {
    fn serialize(&self) -> Vec<u8>;
    fn deserialize(data: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// Write a compact variable-length integer.
pub fn write_varint<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    match value {
        0..=0xfc => writer.write_all(&[value as u8]),
        0xfd..=0xffff => {
            writer.write_all(&[0xfd])?;
            writer.write_all(&(value as u16).to_le_bytes())
        }
        0x10000..=0xffffffff => {
            writer.write_all(&[0xfe])?;
            writer.write_all(&(value as u32).to_le_bytes())
        }
        _ => {
            writer.write_all(&[0xff])?;
            writer.write_all(&value.to_le_bytes())
        }
    }
}

/// Read a compact variable-length integer.
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut first = [0u8; 1];
    reader.read_exact(&mut first)?;
    match first[0] {
        n @ 0..=0xfc => Ok(n as u64),
        0xfd => {
            let mut bytes = [0u8; 2];
            reader.read_exact(&mut bytes)?;
            Ok(u16::from_le_bytes(bytes) as u64)
        }
        0xfe => {
            let mut bytes = [0u8; 4];
            reader.read_exact(&mut bytes)?;
            Ok(u32::from_le_bytes(bytes) as u64)
        }
        0xff => {
            let mut bytes = [0u8; 8];
            reader.read_exact(&mut bytes)?;
            Ok(u64::from_le_bytes(bytes))
        }
    }
}

/// Write a UTF-8 string with a varint length prefix.
pub fn write_var_str<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    write_varint(writer, s.len() as u64)?;
    writer.write_all(s.as_bytes())
}

/// Read a varint-length-prefixed UTF-8 string.
pub fn read_var_str<R: Read + ?Sized>(reader: &mut R) -> Result<String> {
    let len = read_varint(reader)? as usize;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;
    String::from_utf8(data).map_err(|e| LedgerError::Codec(format!("non-UTF-8 string: {}", e)))
}
