//! Anti-entropy reconciliation

pub mod anti_entropy;

pub use anti_entropy::{AntiEntropyHandler, AntiEntropyResponder};
