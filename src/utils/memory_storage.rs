//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ledger::tree::find_descendant_ids;
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct State {
    classes: Vec<AccountClass>,
    accounts: Vec<Account>,
    entries: Vec<JournalEntry>,
    records: Vec<LedgerRecord>,
    last_account_id: AccountId,
    last_entry_id: EntryId,
    last_line_id: i64,
}

/// In-memory repository for testing and development.
///
/// Behaves like the REST backend: ids are assigned sequentially, deleting
/// an account removes its subtree, and every saved entry is projected into
/// one ledger record per line. Clones share the same data.
///
/// Records are keyed by reference only: updating or deleting an entry also
/// drops every other record with that reference, including ones added with
/// [`MemoryRepository::push_ledger_records`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<State>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding the given accounting classes
    pub fn with_classes(classes: Vec<AccountClass>) -> Self {
        let storage = Self::new();
        if let Ok(mut state) = storage.state.write() {
            state.classes = classes;
        }
        storage
    }

    /// Append ledger records that did not come from a journal entry, such as
    /// invoice postings carrying client or supplier names
    pub fn push_ledger_records(&self, records: impl IntoIterator<Item = LedgerRecord>) -> LedgerResult<()> {
        self.write()?.records.extend(records);
        Ok(())
    }

    /// Make every subsequent write fail with a persistence error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Clear all accounts, entries and records; classes are kept
    pub fn clear(&self) -> LedgerResult<()> {
        let mut state = self.write()?;
        state.accounts.clear();
        state.entries.clear();
        state.records.clear();
        Ok(())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Persistence("storage lock poisoned".to_string()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, State>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Persistence(
                "storage is not accepting writes".to_string(),
            ));
        }
        self.state
            .write()
            .map_err(|_| LedgerError::Persistence("storage lock poisoned".to_string()))
    }
}

impl State {
    fn assign_line_ids(&mut self, entry: &mut JournalEntry) {
        for line in entry.lines.iter_mut() {
            self.last_line_id += 1;
            line.id = Some(self.last_line_id);
        }
    }

    fn post(&mut self, entry: &JournalEntry) {
        let date = entry.date.and_hms_opt(0, 0, 0).map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string());

        for line in &entry.lines {
            let account = self.accounts.iter().find(|a| a.id == line.account_id());
            self.records.push(LedgerRecord {
                date_ecriture: date.clone(),
                reference: Some(entry.reference.clone()),
                compte_numero: account.map(|a| a.numero.clone()),
                compte_name: account.map(|a| a.nom.clone()),
                debit: line.debit.clone(),
                credit: line.credit.clone(),
                ..Default::default()
            });
        }
    }

    fn unpost(&mut self, reference: &str) {
        self.records
            .retain(|r| r.reference.as_deref() != Some(reference));
    }
}

#[async_trait]
impl AccountRepository for MemoryRepository {
    async fn list_classes(&self) -> LedgerResult<Vec<AccountClass>> {
        Ok(self.read()?.classes.clone())
    }

    async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        Ok(self.read()?.accounts.clone())
    }

    async fn create_account(&mut self, input: &AccountInput) -> LedgerResult<Account> {
        let mut state = self.write()?;

        if let Some(parent_id) = input.parent_id {
            if !state.accounts.iter().any(|a| a.id == parent_id) {
                return Err(LedgerError::AccountNotFound(parent_id));
            }
        }

        state.last_account_id += 1;
        let account = Account::new(
            state.last_account_id,
            input.numero.clone(),
            input.nom.clone(),
            input.classe_id,
            input.parent_id,
        );
        state.accounts.push(account.clone());
        Ok(account)
    }

    async fn update_account(&mut self, id: AccountId, input: &AccountInput) -> LedgerResult<Account> {
        let mut state = self.write()?;
        let account = state
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(LedgerError::AccountNotFound(id))?;

        account.numero = input.numero.clone();
        account.nom = input.nom.clone();
        account.classe_id = input.classe_id;
        account.parent_id = input.parent_id;
        Ok(account.clone())
    }

    async fn delete_account(&mut self, id: AccountId) -> LedgerResult<()> {
        let mut state = self.write()?;
        if !state.accounts.iter().any(|a| a.id == id) {
            return Err(LedgerError::AccountNotFound(id));
        }

        let mut removed = find_descendant_ids(id, &state.accounts);
        removed.insert(id);
        state.accounts.retain(|a| !removed.contains(&a.id));
        Ok(())
    }
}

#[async_trait]
impl JournalRepository for MemoryRepository {
    async fn list_entries(&self) -> LedgerResult<Vec<JournalEntry>> {
        Ok(self.read()?.entries.clone())
    }

    async fn get_entry(&self, id: EntryId) -> LedgerResult<Option<JournalEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .find(|e| e.id == Some(id))
            .cloned())
    }

    async fn create_entry(&mut self, entry: &JournalEntry) -> LedgerResult<JournalEntry> {
        let mut state = self.write()?;
        let mut entry = entry.clone();

        state.last_entry_id += 1;
        entry.id = Some(state.last_entry_id);
        state.assign_line_ids(&mut entry);
        state.post(&entry);
        state.entries.push(entry.clone());
        Ok(entry)
    }

    async fn update_entry(&mut self, id: EntryId, entry: &JournalEntry) -> LedgerResult<JournalEntry> {
        let mut state = self.write()?;
        let index = state
            .entries
            .iter()
            .position(|e| e.id == Some(id))
            .ok_or(LedgerError::EntryNotFound(id))?;

        let previous = state.entries[index].clone();
        let mut entry = entry.clone();
        entry.id = Some(id);
        if entry.num.is_none() {
            entry.num = previous.num;
        }

        state.unpost(&previous.reference);
        state.assign_line_ids(&mut entry);
        state.post(&entry);
        state.entries[index] = entry.clone();
        Ok(entry)
    }

    async fn delete_entry(&mut self, id: EntryId) -> LedgerResult<()> {
        let mut state = self.write()?;
        let index = state
            .entries
            .iter()
            .position(|e| e.id == Some(id))
            .ok_or(LedgerError::EntryNotFound(id))?;

        let removed = state.entries.remove(index);
        state.unpost(&removed.reference);
        Ok(())
    }

    async fn list_ledger_records(&self) -> LedgerResult<Vec<LedgerRecord>> {
        Ok(self.read()?.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_ids_are_sequential_and_subtrees_deleted() {
        let mut storage = MemoryRepository::new();
        let root = storage
            .create_account(&AccountInput::new("1", "Capitaux").in_class(1))
            .await
            .unwrap();
        let child = storage
            .create_account(&AccountInput::new("10", "Capital").under(root.id))
            .await
            .unwrap();
        storage
            .create_account(&AccountInput::new("101", "Capital social").under(child.id))
            .await
            .unwrap();
        storage
            .create_account(&AccountInput::new("2", "Immobilisations").in_class(2))
            .await
            .unwrap();

        assert_eq!((root.id, child.id), (1, 2));
        storage.delete_account(root.id).await.unwrap();

        let remaining = storage.list_accounts().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].numero, "2");
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let mut storage = MemoryRepository::new();
        assert!(matches!(
            storage
                .create_account(&AccountInput::new("10", "Capital").under(5))
                .await,
            Err(LedgerError::AccountNotFound(5))
        ));
    }

    #[tokio::test]
    async fn test_entries_are_projected_into_records() {
        let mut storage = MemoryRepository::new();
        let bank = storage
            .create_account(&AccountInput::new("512", "Banque").in_class(5))
            .await
            .unwrap();
        let entry = JournalEntry {
            id: None,
            num: Some("AG-2024-1".to_string()),
            reference: "VIR-1".to_string(),
            statut: EntryStatus::Published,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            lines: vec![
                JournalLine::debit("Virement", bank.id, BigDecimal::from(40)),
                JournalLine::credit("Virement", 99, BigDecimal::from(40)),
            ],
        };

        let saved = storage.create_entry(&entry).await.unwrap();
        assert!(saved.lines.iter().all(|l| l.id.is_some()));

        let records = storage.list_ledger_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].compte_numero.as_deref(), Some("512"));
        assert_eq!(records[0].date_ecriture.as_deref(), Some("2024-06-03T00:00:00"));
        assert_eq!(records[1].compte_numero, None);

        storage.delete_entry(saved.id.unwrap()).await.unwrap();
        assert!(storage.list_ledger_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_are_removed_by_reference() {
        let mut storage = MemoryRepository::new();
        storage
            .push_ledger_records(vec![
                LedgerRecord {
                    reference: Some("FAC-7".to_string()),
                    client_name: Some("Dupont".to_string()),
                    credit: BigDecimal::from(60),
                    ..Default::default()
                },
                LedgerRecord {
                    reference: Some("FAC-8".to_string()),
                    debit: BigDecimal::from(5),
                    ..Default::default()
                },
            ])
            .unwrap();
        let entry = JournalEntry {
            id: None,
            num: None,
            reference: "FAC-7".to_string(),
            statut: EntryStatus::Draft,
            date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            lines: vec![
                JournalLine::debit("Facture", 1, BigDecimal::from(60)),
                JournalLine::credit("Facture", 2, BigDecimal::from(60)),
            ],
        };
        let saved = storage.create_entry(&entry).await.unwrap();
        assert_eq!(storage.list_ledger_records().await.unwrap().len(), 4);

        storage.delete_entry(saved.id.unwrap()).await.unwrap();
        let records = storage.list_ledger_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reference.as_deref(), Some("FAC-8"));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let mut storage = MemoryRepository::new();
        storage.set_fail_writes(true);
        assert!(matches!(
            storage
                .create_account(&AccountInput::new("1", "Capitaux").in_class(1))
                .await,
            Err(LedgerError::Persistence(_))
        ));
        assert!(storage.list_accounts().await.unwrap().is_empty());
    }
}
