//! Mining module: the proof-of-work search that seals blocks

pub mod pow;

pub use pow::{MiningError, MiningStats, ProofOfWork};
