//! # Plan Comptable Core
//!
//! Chart of accounts and double-entry journal for an invoicing backend.
//!
//! ## Features
//!
//! - **Chart of accounts**: prefix-based account numbering, number suggestion,
//!   hierarchy building for display and export, cascade deletion
//! - **Journal entries**: draft editing and double-entry validation before submission
//! - **Reports**: general ledger listing, client/supplier balances and per-account trial balance
//! - **Storage abstraction**: REST backend or in-memory repository behind async traits
//!
//! ## Quick Start
//!
//! ```rust
//! use plan_comptable_core::{AccountClass, AccountInput, Ledger, MemoryRepository};
//!
//! # async fn run() -> plan_comptable_core::LedgerResult<()> {
//! let storage = MemoryRepository::with_classes(vec![AccountClass::new(1, "1", "Capitaux")]);
//! let mut ledger = Ledger::new(storage);
//! ledger.load().await?;
//!
//! let root = ledger.create_account(AccountInput::new("1", "Capitaux").in_class(1)).await?;
//! let suggested = ledger.chart().suggest_next_numero(Some(root.id), None)?;
//! assert_eq!(suggested.as_deref(), Some("11"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use reports::*;
pub use traits::*;
pub use types::*;
pub use utils::{DigitsOnlyAccountValidator, MemoryRepository, RestRepository};
