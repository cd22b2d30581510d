//! Main ledger orchestrator that coordinates the chart of accounts and the journal

use tracing::debug;

use crate::config::Config;
use crate::ledger::account::ChartOfAccountsService;
use crate::ledger::import::{AccountRow, ImportReport};
use crate::ledger::journal::{JournalEntryDraft, JournalEntryValidator};
use crate::ledger::transaction::JournalService;
use crate::reports::{
    aggregate_by_account, aggregate_by_party, list_ledger, BalanceFilters, LedgerFilters,
    PartyBalanceReport, TrialBalance,
};
use crate::traits::*;
use crate::types::*;

/// Main ledger system wiring the chart of accounts and the journal over one
/// storage backend
pub struct Ledger<S: AccountRepository + JournalRepository> {
    chart: ChartOfAccountsService<S>,
    journal: JournalService<S>,
    config: Config,
}

/// General ledger listing detached from the record buffer
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GrandLivre {
    pub records: Vec<LedgerRecord>,
    pub totals: crate::reports::LedgerTotals,
}

impl<S: AccountRepository + JournalRepository + Clone> Ledger<S> {
    /// Create a new ledger with the default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, Config::default())
    }

    /// Create a new ledger; the journal tolerance and entry numbering come
    /// from `config`
    pub fn with_config(storage: S, config: Config) -> Self {
        Self::with_validators(
            storage,
            Box::new(DefaultAccountValidator),
            Box::new(JournalEntryValidator::from_config(&config.journal)),
            config,
        )
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        account_validator: Box<dyn AccountValidator>,
        entry_validator: Box<dyn EntryValidator>,
        config: Config,
    ) -> Self {
        Self {
            chart: ChartOfAccountsService::with_validator(storage.clone(), account_validator),
            journal: JournalService::with_validator(storage, entry_validator)
                .with_entry_number_prefix(config.journal.entry_number_prefix.clone()),
            config,
        }
    }

    /// Load classes and accounts from storage
    pub async fn load(&mut self) -> LedgerResult<()> {
        self.chart.refresh().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chart(&self) -> &ChartOfAccountsService<S> {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut ChartOfAccountsService<S> {
        &mut self.chart
    }

    pub fn journal(&self) -> &JournalService<S> {
        &self.journal
    }

    // Account operations
    pub async fn create_account(&mut self, input: AccountInput) -> LedgerResult<Account> {
        self.chart.create_account(input).await
    }

    pub async fn update_account(&mut self, id: AccountId, input: AccountInput) -> LedgerResult<Account> {
        self.chart.update_account(id, input).await
    }

    pub async fn delete_account(&mut self, id: AccountId, confirmed: bool) -> LedgerResult<Vec<AccountId>> {
        self.chart.delete_account(id, confirmed).await
    }

    pub async fn import_accounts(&mut self, rows: Vec<AccountRow>) -> ImportReport {
        self.chart.import_rows(rows).await
    }

    pub fn export_accounts(&self) -> Vec<AccountRow> {
        self.chart.export_rows()
    }

    // Journal operations
    /// Validate and save a draft; every line must reference a loaded account
    pub async fn submit_entry(&mut self, draft: JournalEntryDraft) -> LedgerResult<JournalEntry> {
        self.journal
            .submit_checked(draft, self.chart.accounts())
            .await
    }

    pub async fn load_draft(&self, id: EntryId) -> LedgerResult<JournalEntryDraft> {
        self.journal.load_draft(id).await
    }

    pub async fn delete_entry(&mut self, id: EntryId) -> LedgerResult<()> {
        self.journal.delete_entry(id).await
    }

    pub async fn list_entries(&self) -> LedgerResult<Vec<JournalEntry>> {
        self.journal.list_entries().await
    }

    // Reports
    /// Filtered general ledger with totals
    pub async fn grand_livre(&self, filters: &LedgerFilters) -> LedgerResult<GrandLivre> {
        let records = self.journal.ledger_records().await?;
        let listing = list_ledger(&records, filters);
        debug!(
            total = records.len(),
            selected = listing.records.len(),
            "Built general ledger"
        );

        Ok(GrandLivre {
            records: listing.records.into_iter().cloned().collect(),
            totals: listing.totals,
        })
    }

    /// Client or supplier balances
    pub async fn party_balance(&self, kind: PartyKind, filters: &BalanceFilters) -> LedgerResult<PartyBalanceReport> {
        let records = self.journal.ledger_records().await?;
        Ok(aggregate_by_party(&records, kind, filters))
    }

    /// Debit and credit per account number
    pub async fn trial_balance(&self) -> LedgerResult<TrialBalance> {
        let records = self.journal.ledger_records().await?;
        Ok(aggregate_by_account(&records))
    }

    /// Check every stored entry against the journal rules; returns the
    /// entries that fail with their error
    pub async fn audit_entries(&self) -> LedgerResult<Vec<(JournalEntry, LedgerError)>> {
        let entries = self.journal.list_entries().await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                self.journal
                    .validate_entry(&entry)
                    .err()
                    .map(|error| (entry, error))
            })
            .collect())
    }
}

impl GrandLivre {
    /// One page of the listing, see [`Config::reports`]
    pub fn page(&self, page: usize, per_page: usize) -> crate::reports::Page<'_, LedgerRecord> {
        crate::reports::paginate(&self.records, page, per_page)
    }
}
