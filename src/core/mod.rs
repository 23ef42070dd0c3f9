// Core ledger data structures

mod block;
mod hash;
mod serialize;
mod transaction;
mod types;

pub use block::*;
pub use hash::*;
pub use serialize::*;
pub use transaction::*;
pub use types::*;
