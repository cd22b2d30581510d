//! Bulk import and export of the chart of accounts as spreadsheet rows

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ledger::account::ChartOfAccountsService;
use crate::ledger::tree;
use crate::traits::AccountRepository;
use crate::types::*;

/// One spreadsheet row, keyed by the column headers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountRow {
    #[serde(rename = "Numéro")]
    pub numero: String,
    #[serde(rename = "Nom")]
    pub nom: String,
    #[serde(rename = "Numéro Parent", default, skip_serializing_if = "Option::is_none")]
    pub numero_parent: Option<String>,
    #[serde(rename = "Numéro Classe", default, skip_serializing_if = "Option::is_none")]
    pub numero_classe: Option<String>,
}

impl AccountRow {
    pub fn new(numero: impl Into<String>, nom: impl Into<String>) -> Self {
        Self {
            numero: numero.into(),
            nom: nom.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, numero_parent: impl Into<String>) -> Self {
        self.numero_parent = Some(numero_parent.into());
        self
    }

    pub fn with_class(mut self, numero_classe: impl Into<String>) -> Self {
        self.numero_classe = Some(numero_classe.into());
        self
    }

    fn parent(&self) -> Option<&str> {
        non_blank(self.numero_parent.as_deref())
    }

    fn class(&self) -> Option<&str> {
        non_blank(self.numero_classe.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum RowStatus {
    Created(AccountId),
    Failed(String),
}

/// Result for one imported row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    /// Position of the row in the submitted list
    pub row_index: usize,
    pub numero: String,
    pub status: RowStatus,
}

/// Summary of an import batch; rows are reported in submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch_id: Uuid,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<RowOutcome>,
}

impl ImportReport {
    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RowStatus::Failed(_)))
    }
}

impl<S: AccountRepository> ChartOfAccountsService<S> {
    /// Create accounts from spreadsheet rows, continuing past failing rows.
    ///
    /// Rows without a parent are created first. Rows with a parent are then
    /// created in passes, each pass handling the rows whose parent number now
    /// exists, until a pass makes no progress. Rows left over fail. Every row
    /// goes through [`ChartOfAccountsService::create_account`].
    pub async fn import_rows(&mut self, rows: Vec<AccountRow>) -> ImportReport {
        let batch_id = Uuid::new_v4();
        let mut outcomes = Vec::with_capacity(rows.len());
        let (roots, mut pending): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .enumerate()
            .partition(|(_, row)| row.parent().is_none());

        for (row_index, row) in roots {
            let status = self.import_row(&row, None).await;
            outcomes.push(RowOutcome {
                row_index,
                numero: row.numero,
                status,
            });
        }

        let mut pass = 0;
        loop {
            pass += 1;
            let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|(_, row)| {
                row.parent()
                    .is_some_and(|parent| self.account_by_numero(parent).is_some())
            });
            pending = waiting;
            if ready.is_empty() {
                break;
            }
            debug!(%batch_id, pass, rows = ready.len(), "Importing child accounts");

            for (row_index, row) in ready {
                let parent_id = row
                    .parent()
                    .and_then(|parent| self.account_by_numero(parent))
                    .map(|parent| parent.id);
                let status = self.import_row(&row, parent_id).await;
                outcomes.push(RowOutcome {
                    row_index,
                    numero: row.numero,
                    status,
                });
            }
        }

        for (row_index, row) in pending {
            let message = format!(
                "Parent account {} not found",
                row.parent().unwrap_or_default()
            );
            outcomes.push(RowOutcome {
                row_index,
                numero: row.numero,
                status: RowStatus::Failed(message),
            });
        }

        outcomes.sort_by_key(|o| o.row_index);
        let succeeded = outcomes
            .iter()
            .filter(|o| matches!(o.status, RowStatus::Created(_)))
            .count();
        let failed = outcomes.len() - succeeded;
        info!(%batch_id, succeeded, failed, "Imported chart of accounts");

        ImportReport {
            batch_id,
            succeeded,
            failed,
            outcomes,
        }
    }

    async fn import_row(&mut self, row: &AccountRow, parent_id: Option<AccountId>) -> RowStatus {
        let classe_id = match row.class() {
            Some(numero) => match self.class_by_numero(numero) {
                Some(class) => Some(class.id),
                None => return RowStatus::Failed(LedgerError::ClassNotFound(numero.to_string()).to_string()),
            },
            None => None,
        };

        let input = AccountInput {
            numero: row.numero.clone(),
            nom: row.nom.clone(),
            classe_id,
            parent_id,
        };

        match self.create_account(input).await {
            Ok(account) => RowStatus::Created(account.id),
            Err(e) => RowStatus::Failed(e.to_string()),
        }
    }

    /// Every account as a spreadsheet row, in export order
    pub fn export_rows(&self) -> Vec<AccountRow> {
        tree::build_hierarchy_for_export(self.accounts())
            .flatten()
            .into_iter()
            .map(|flat| {
                let account = flat.account;
                AccountRow {
                    numero: account.numero.clone(),
                    nom: account.nom.clone(),
                    numero_parent: account
                        .parent_id
                        .and_then(|id| self.account(id))
                        .map(|parent| parent.numero.clone()),
                    numero_classe: account
                        .classe_id
                        .and_then(|id| self.class(id))
                        .map(|class| class.numero.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryRepository;

    async fn service() -> ChartOfAccountsService<MemoryRepository> {
        let storage = MemoryRepository::with_classes(vec![
            AccountClass::new(1, "1", "Comptes de capitaux"),
            AccountClass::new(6, "6", "Comptes de charges"),
        ]);
        let mut service = ChartOfAccountsService::new(storage);
        service.refresh().await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_import_resolves_parents_across_passes() {
        let mut service = service().await;
        let rows = vec![
            AccountRow::new("101", "Capital social").with_parent("10"),
            AccountRow::new("10", "Capital").with_parent("1"),
            AccountRow::new("1", "Capitaux").with_class("1"),
        ];

        let report = service.import_rows(rows).await;

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        let numeros: Vec<&str> = report.outcomes.iter().map(|o| o.numero.as_str()).collect();
        assert_eq!(numeros, vec!["101", "10", "1"]);
        assert_eq!(service.account_by_numero("101").unwrap().classe_id, Some(1));
    }

    #[tokio::test]
    async fn test_import_continues_past_failures() {
        let mut service = service().await;
        let rows = vec![
            AccountRow::new("6", "Charges").with_class("6"),
            AccountRow::new("60", "Achats").with_parent("6"),
            AccountRow::new("60", "Achats bis").with_parent("6"),
            AccountRow::new("9", "Inconnue").with_class("9"),
            AccountRow::new("701", "Ventes").with_parent("70"),
            AccountRow::new("", "Sans numéro").with_class("6"),
        ];

        let report = service.import_rows(rows).await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 4);
        let failed: Vec<usize> = report.failures().map(|o| o.row_index).collect();
        assert_eq!(failed, vec![2, 3, 4, 5]);
        match &report.outcomes[4].status {
            RowStatus::Failed(message) => assert!(message.contains("70")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_export_rows_use_numeric_order() {
        let mut service = service().await;
        service
            .import_rows(vec![
                AccountRow::new("6", "Charges").with_class("6"),
                AccountRow::new("610", "Services").with_parent("6"),
                AccountRow::new("62", "Autres services").with_parent("6"),
                AccountRow::new("1", "Capitaux").with_class("1"),
            ])
            .await;

        let rows = service.export_rows();
        let numeros: Vec<&str> = rows.iter().map(|r| r.numero.as_str()).collect();
        assert_eq!(numeros, vec!["1", "6", "62", "610"]);
        assert_eq!(rows[2].numero_parent.as_deref(), Some("6"));
        assert_eq!(rows[2].numero_classe.as_deref(), Some("6"));

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["Numéro"], "1");
        assert!(json.get("Numéro Parent").is_none());
    }
}
