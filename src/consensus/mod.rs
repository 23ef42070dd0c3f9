// Proof-of-work consensus

pub mod pow;

pub use pow::{DEFAULT_DIFFICULTY_BITS, Miner, PowSolution, target_from_bits};
