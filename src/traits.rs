//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::types::*;
use crate::utils::validation::{validate_account_name, validate_account_number};

/// Persistence of accounting classes and accounts
///
/// This trait lets the chart of accounts work against the REST backend, an
/// in-memory store, or any other backend. Implementations report every
/// failure as [`LedgerError::Persistence`] unless a more specific variant
/// (e.g. [`LedgerError::AccountNotFound`]) applies.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// List all accounting classes
    async fn list_classes(&self) -> LedgerResult<Vec<AccountClass>>;

    /// List all accounts
    async fn list_accounts(&self) -> LedgerResult<Vec<Account>>;

    /// Persist a new account and return it with its assigned id
    async fn create_account(&mut self, account: &AccountInput) -> LedgerResult<Account>;

    /// Replace the fields of an existing account
    async fn update_account(&mut self, id: AccountId, account: &AccountInput)
        -> LedgerResult<Account>;

    /// Delete an account together with its whole subtree
    async fn delete_account(&mut self, id: AccountId) -> LedgerResult<()>;
}

/// Persistence of journal entries and of the ledger projection derived from them
#[async_trait]
pub trait JournalRepository: Send + Sync {
    /// List all journal entries
    async fn list_entries(&self) -> LedgerResult<Vec<JournalEntry>>;

    /// Get a journal entry by id
    async fn get_entry(&self, id: EntryId) -> LedgerResult<Option<JournalEntry>>;

    /// Persist a new entry with all of its lines
    async fn create_entry(&mut self, entry: &JournalEntry) -> LedgerResult<JournalEntry>;

    /// Replace an entry and its complete line set
    async fn update_entry(&mut self, id: EntryId, entry: &JournalEntry)
        -> LedgerResult<JournalEntry>;

    /// Delete an entry and its lines
    async fn delete_entry(&mut self, id: EntryId) -> LedgerResult<()>;

    /// List the posted ledger records (grand livre)
    async fn list_ledger_records(&self) -> LedgerResult<Vec<LedgerRecord>>;
}

/// Trait for implementing custom account validation rules
///
/// Runs before the numbering and duplicate checks of the chart of accounts.
pub trait AccountValidator: Send + Sync {
    /// Validate account fields before saving
    fn validate_account(&self, account: &AccountInput) -> LedgerResult<()>;
}

/// Trait for implementing custom journal entry validation rules
pub trait EntryValidator: Send + Sync {
    /// Validate a draft before it is turned into an entry and submitted
    fn validate_draft(&self, draft: &crate::ledger::JournalEntryDraft) -> LedgerResult<()>;

    /// Validate a fully formed entry (e.g. one received from another system)
    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Validate that every line references a known account
    fn validate_account_references(
        &self,
        entry: &JournalEntry,
        accounts: &[Account],
    ) -> LedgerResult<()>;
}

/// Default account validator: number and name must be present
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &AccountInput) -> LedgerResult<()> {
        validate_account_name(&account.nom)?;
        validate_account_number(&account.numero)?;
        Ok(())
    }
}
