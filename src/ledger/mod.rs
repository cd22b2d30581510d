//! Ledger module containing the chart of accounts and journal processing

pub mod account;
pub mod core;
pub mod import;
pub mod journal;
pub mod numbering;
pub mod transaction;
pub mod tree;

pub use account::*;
pub use self::core::*;
pub use import::*;
pub use journal::*;
pub use numbering::*;
pub use transaction::*;
pub use tree::*;
