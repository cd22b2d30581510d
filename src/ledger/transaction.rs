//! Journal entry submission and management

use chrono::Datelike;
use tracing::{info, warn};

use crate::ledger::journal::{JournalEntryDraft, JournalEntryValidator, ValidatedEntry};
use crate::traits::*;
use crate::types::*;

/// Service for submitting, reopening and deleting journal entries
pub struct JournalService<S: JournalRepository> {
    pub(crate) storage: S,
    validator: Box<dyn EntryValidator>,
    entry_number_prefix: String,
}

impl<S: JournalRepository> JournalService<S> {
    /// Create a new journal service with the default validator
    pub fn new(storage: S) -> Self {
        Self::with_validator(storage, Box::new(JournalEntryValidator::default()))
    }

    /// Create a new journal service with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn EntryValidator>) -> Self {
        Self {
            storage,
            validator,
            entry_number_prefix: "AG".to_string(),
        }
    }

    /// Prefix used when numbering new entries
    pub fn with_entry_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_number_prefix = prefix.into();
        self
    }

    /// Validate a draft and persist it as one entry.
    ///
    /// A draft with an id replaces the stored entry and its complete line
    /// set; otherwise a new entry is created and numbered. On rejection
    /// nothing is written.
    pub async fn submit(&mut self, draft: JournalEntryDraft) -> LedgerResult<JournalEntry> {
        self.validator.validate_draft(&draft).map_err(|e| {
            warn!(reference = %draft.reference, error = %e, "Rejected journal entry");
            e
        })?;
        let validated = ValidatedEntry::from_draft(draft)?;
        self.persist(validated).await
    }

    /// Like [`JournalService::submit`], also checking that every line
    /// references one of `accounts`
    pub async fn submit_checked(
        &mut self,
        draft: JournalEntryDraft,
        accounts: &[Account],
    ) -> LedgerResult<JournalEntry> {
        self.validator.validate_draft(&draft).map_err(|e| {
            warn!(reference = %draft.reference, error = %e, "Rejected journal entry");
            e
        })?;
        let validated = ValidatedEntry::from_draft(draft)?;
        self.validator
            .validate_account_references(validated.entry(), accounts)
            .map_err(|e| {
                warn!(reference = %validated.entry().reference, error = %e, "Entry references an unknown account");
                e
            })?;
        self.persist(validated).await
    }

    async fn persist(&mut self, validated: ValidatedEntry) -> LedgerResult<JournalEntry> {
        let mut entry = validated.into_entry();

        let saved = match entry.id {
            Some(id) => {
                self.get_entry_required(id).await?;
                self.storage.update_entry(id, &entry).await?
            }
            None => {
                if entry.num.is_none() {
                    let existing = self.storage.list_entries().await?;
                    entry.num = Some(next_entry_number(
                        &self.entry_number_prefix,
                        entry.date.year(),
                        existing.iter().filter_map(|e| e.num.as_deref()),
                    ));
                }
                self.storage.create_entry(&entry).await?
            }
        };

        info!(
            id = ?saved.id,
            num = ?saved.num,
            reference = %saved.reference,
            lines = saved.lines.len(),
            "Saved journal entry"
        );
        Ok(saved)
    }

    /// Get an entry by id
    pub async fn get_entry(&self, id: EntryId) -> LedgerResult<Option<JournalEntry>> {
        self.storage.get_entry(id).await
    }

    /// Get an entry by id, returning an error if not found
    pub async fn get_entry_required(&self, id: EntryId) -> LedgerResult<JournalEntry> {
        self.storage
            .get_entry(id)
            .await?
            .ok_or(LedgerError::EntryNotFound(id))
    }

    pub async fn list_entries(&self) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_entries().await
    }

    /// Reopen a stored entry as a draft
    pub async fn load_draft(&self, id: EntryId) -> LedgerResult<JournalEntryDraft> {
        let entry = self.get_entry_required(id).await?;
        Ok(JournalEntryDraft::from_entry(&entry))
    }

    /// Check a stored or externally produced entry
    pub fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        self.validator.validate_entry(entry)
    }

    /// Delete an entry and its lines
    pub async fn delete_entry(&mut self, id: EntryId) -> LedgerResult<()> {
        self.get_entry_required(id).await?;
        self.storage.delete_entry(id).await?;
        info!(id, "Deleted journal entry");
        Ok(())
    }

    /// Posted ledger records
    pub async fn ledger_records(&self) -> LedgerResult<Vec<LedgerRecord>> {
        self.storage.list_ledger_records().await
    }
}

/// Next entry number for `year`: `"{prefix}-{year}-{n}"` with `n` one more
/// than the largest number already used in that year.
pub fn next_entry_number<'a>(
    prefix: &str,
    year: i32,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let stem = format!("{}-{}-", prefix, year);
    let next = existing
        .into_iter()
        .filter_map(|num| num.strip_prefix(stem.as_str()))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .map_or(1, |max| max + 1);
    format!("{}{}", stem, next)
}
