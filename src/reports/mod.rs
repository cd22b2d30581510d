//! Read-only projections over posted ledger records

pub mod balance;
pub mod grand_livre;

pub use balance::*;
pub use grand_livre::*;
