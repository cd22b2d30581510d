//! Journal entry drafts and the double-entry validator.
//!
//! An entry moves through three states: a [`JournalEntryDraft`] edited in
//! memory, a [`ValidatedEntry`] that can only be obtained from a draft that
//! passed validation, and the persisted [`JournalEntry`] returned by storage.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JournalConfig;
use crate::traits::EntryValidator;
use crate::types::*;
use crate::utils::validation::{validate_positive_amount, validate_reference_length};

/// One line of a draft, entered on either the debit or the credit side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftLine {
    pub description: String,
    pub account_id: Option<AccountId>,
    pub montant: BigDecimal,
}

impl DraftLine {
    pub fn new(description: impl Into<String>, account_id: AccountId, montant: BigDecimal) -> Self {
        Self {
            description: description.into(),
            account_id: Some(account_id),
            montant,
        }
    }
}

/// Journal entry being edited, with debit and credit lines kept apart
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JournalEntryDraft {
    pub id: Option<EntryId>,
    pub num: Option<String>,
    pub reference: String,
    pub statut: Option<EntryStatus>,
    pub date: Option<NaiveDate>,
    pub debit_lines: Vec<DraftLine>,
    pub credit_lines: Vec<DraftLine>,
}

/// Running totals shown under the entry form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryTotals {
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// `total_debit - total_credit`
    pub difference: BigDecimal,
    pub is_balanced: bool,
}

impl JournalEntryDraft {
    pub fn new(reference: impl Into<String>, statut: EntryStatus, date: NaiveDate) -> Self {
        Self {
            reference: reference.into(),
            statut: Some(statut),
            date: Some(date),
            ..Default::default()
        }
    }

    /// Add a debit line
    pub fn debit(mut self, description: impl Into<String>, account_id: AccountId, montant: BigDecimal) -> Self {
        self.debit_lines
            .push(DraftLine::new(description, account_id, montant));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, description: impl Into<String>, account_id: AccountId, montant: BigDecimal) -> Self {
        self.credit_lines
            .push(DraftLine::new(description, account_id, montant));
        self
    }

    /// Reopen a stored entry for editing.
    ///
    /// Lines with a positive debit go to the debit side, lines with a positive
    /// credit to the credit side. Line ids are dropped: saving always resends
    /// the complete line set.
    pub fn from_entry(entry: &JournalEntry) -> Self {
        let mut draft = Self {
            id: entry.id,
            num: entry.num.clone(),
            reference: entry.reference.clone(),
            statut: Some(entry.statut),
            date: Some(entry.date),
            ..Default::default()
        };

        for line in &entry.lines {
            let (side, montant) = match line.side() {
                Some(LineSide::Debit) => (&mut draft.debit_lines, &line.debit),
                Some(LineSide::Credit) => (&mut draft.credit_lines, &line.credit),
                None => continue,
            };
            side.push(DraftLine {
                description: line.description.clone(),
                account_id: Some(line.account_id()),
                montant: montant.clone(),
            });
        }

        draft
    }

    pub fn total_debit(&self) -> BigDecimal {
        self.debit_lines.iter().map(|l| &l.montant).sum()
    }

    pub fn total_credit(&self) -> BigDecimal {
        self.credit_lines.iter().map(|l| &l.montant).sum()
    }

    /// Totals and balance state against `tolerance`
    pub fn summary(&self, tolerance: &BigDecimal) -> EntryTotals {
        let total_debit = self.total_debit();
        let total_credit = self.total_credit();
        let difference = &total_debit - &total_credit;
        let is_balanced = difference.abs() < *tolerance;

        EntryTotals {
            total_debit,
            total_credit,
            difference,
            is_balanced,
        }
    }
}

/// A draft that passed validation, ready to be submitted as one entry
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    entry: JournalEntry,
}

impl ValidatedEntry {
    /// Flatten the draft into a single line list: debit lines first with a
    /// zero credit, then credit lines with a zero debit.
    pub(crate) fn from_draft(draft: JournalEntryDraft) -> LedgerResult<Self> {
        let statut = draft.statut.ok_or(LedgerError::MissingField(EntryField::Status))?;
        let date = draft.date.ok_or(LedgerError::MissingField(EntryField::Date))?;

        let mut lines = Vec::with_capacity(draft.debit_lines.len() + draft.credit_lines.len());
        for (side, source) in [
            (LineSide::Debit, draft.debit_lines),
            (LineSide::Credit, draft.credit_lines),
        ] {
            for (line_index, line) in source.into_iter().enumerate() {
                let account_id = line.account_id.ok_or(LedgerError::IncompleteLine {
                    side,
                    line_index,
                    field: LineField::Account,
                })?;
                lines.push(match side {
                    LineSide::Debit => JournalLine::debit(line.description, account_id, line.montant),
                    LineSide::Credit => JournalLine::credit(line.description, account_id, line.montant),
                });
            }
        }

        Ok(Self {
            entry: JournalEntry {
                id: draft.id,
                num: draft.num,
                reference: draft.reference.trim().to_string(),
                statut,
                date,
                lines,
            },
        })
    }

    pub fn entry(&self) -> &JournalEntry {
        &self.entry
    }

    pub fn into_entry(self) -> JournalEntry {
        self.entry
    }
}

/// Validator enforcing header completeness, line completeness and the
/// double-entry balance
#[derive(Debug, Clone)]
pub struct JournalEntryValidator {
    tolerance: BigDecimal,
}

impl Default for JournalEntryValidator {
    fn default() -> Self {
        Self {
            // 0.001
            tolerance: BigDecimal::new(1.into(), 3),
        }
    }
}

impl JournalEntryValidator {
    pub fn new(tolerance: BigDecimal) -> Self {
        Self { tolerance }
    }

    pub fn from_config(config: &JournalConfig) -> Self {
        Self::new(config.balance_tolerance.clone())
    }

    pub fn tolerance(&self) -> &BigDecimal {
        &self.tolerance
    }

    /// Validate a draft and turn it into a submittable entry
    pub fn validate(&self, draft: JournalEntryDraft) -> LedgerResult<ValidatedEntry> {
        self.check_draft(&draft)?;
        ValidatedEntry::from_draft(draft)
    }

    /// Check a draft, stopping at the first violated rule
    pub fn check_draft(&self, draft: &JournalEntryDraft) -> LedgerResult<()> {
        if draft.reference.trim().is_empty() {
            return Err(LedgerError::MissingField(EntryField::Reference));
        }
        validate_reference_length(draft.reference.trim())?;
        if draft.statut.is_none() {
            return Err(LedgerError::MissingField(EntryField::Status));
        }
        if draft.date.is_none() {
            return Err(LedgerError::MissingField(EntryField::Date));
        }

        if draft.debit_lines.is_empty() {
            return Err(LedgerError::MissingSide(LineSide::Debit));
        }
        if draft.credit_lines.is_empty() {
            return Err(LedgerError::MissingSide(LineSide::Credit));
        }

        check_lines(LineSide::Debit, &draft.debit_lines)?;
        check_lines(LineSide::Credit, &draft.credit_lines)?;

        let totals = draft.summary(&self.tolerance);
        if !totals.is_balanced {
            debug!(
                reference = %draft.reference,
                total_debit = %totals.total_debit,
                total_credit = %totals.total_credit,
                "Rejected unbalanced draft"
            );
            return Err(LedgerError::UnbalancedEntry {
                total_debit: totals.total_debit,
                total_credit: totals.total_credit,
            });
        }

        Ok(())
    }

    /// Check an already flattened entry with the rules the backend applies
    pub fn check_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        if entry.reference.trim().is_empty() {
            return Err(LedgerError::MissingField(EntryField::Reference));
        }
        if entry.lines.len() < 2 {
            return Err(LedgerError::Validation(
                "An entry must contain at least two lines".to_string(),
            ));
        }

        let zero = BigDecimal::from(0);
        for (line_index, line) in entry.lines.iter().enumerate() {
            let reason = if line.debit < zero || line.credit < zero {
                Some("amounts cannot be negative")
            } else if line.debit > zero && line.credit > zero {
                Some("a line cannot carry both a debit and a credit")
            } else if line.description.trim().is_empty() {
                Some("the description is required")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(LedgerError::InvalidLine {
                    line_index,
                    reason: reason.to_string(),
                });
            }
        }

        if !entry.lines.iter().any(|l| l.debit > zero) {
            return Err(LedgerError::MissingSide(LineSide::Debit));
        }
        if !entry.lines.iter().any(|l| l.credit > zero) {
            return Err(LedgerError::MissingSide(LineSide::Credit));
        }

        if !entry.is_balanced(&self.tolerance) {
            return Err(LedgerError::UnbalancedEntry {
                total_debit: entry.total_debit(),
                total_credit: entry.total_credit(),
            });
        }

        Ok(())
    }
}

fn check_lines(side: LineSide, lines: &[DraftLine]) -> LedgerResult<()> {
    for (line_index, line) in lines.iter().enumerate() {
        let field = if line.description.trim().is_empty() {
            Some(LineField::Description)
        } else if line.account_id.is_none() {
            Some(LineField::Account)
        } else if validate_positive_amount(&line.montant).is_err() {
            Some(LineField::Amount)
        } else {
            None
        };

        if let Some(field) = field {
            return Err(LedgerError::IncompleteLine {
                side,
                line_index,
                field,
            });
        }
    }

    Ok(())
}

impl EntryValidator for JournalEntryValidator {
    fn validate_draft(&self, draft: &JournalEntryDraft) -> LedgerResult<()> {
        self.check_draft(draft)
    }

    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        self.check_entry(entry)
    }

    fn validate_account_references(&self, entry: &JournalEntry, accounts: &[Account]) -> LedgerResult<()> {
        for line in &entry.lines {
            if !accounts.iter().any(|a| a.id == line.account_id()) {
                return Err(LedgerError::AccountNotFound(line.account_id()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    fn dec(value: &str) -> BigDecimal {
        value.parse().unwrap()
    }

    fn balanced() -> JournalEntryDraft {
        JournalEntryDraft::new("FAC-2024-001", EntryStatus::Draft, date())
            .debit("Client Dupont", 411, BigDecimal::from(100))
            .credit("Vente marchandises", 701, BigDecimal::from(100))
    }

    #[test]
    fn test_balanced_draft_is_flattened() {
        let validated = JournalEntryValidator::default().validate(balanced()).unwrap();
        let entry = validated.entry();

        assert_eq!(entry.lines.len(), 2);
        assert_eq!(entry.lines[0].debit, BigDecimal::from(100));
        assert_eq!(entry.lines[0].credit, BigDecimal::from(0));
        assert_eq!(entry.lines[1].credit, BigDecimal::from(100));
        assert_eq!(entry.lines[1].account_id(), 701);
        assert!(entry.lines.iter().all(|l| l.id.is_none()));
    }

    #[test]
    fn test_unbalanced_draft_reports_totals() {
        let draft = JournalEntryDraft::new("FAC-2024-002", EntryStatus::Draft, date())
            .debit("Client", 411, BigDecimal::from(100))
            .credit("Vente", 701, BigDecimal::from(90));

        match JournalEntryValidator::default().validate(draft) {
            Err(LedgerError::UnbalancedEntry {
                total_debit,
                total_credit,
            }) => {
                assert_eq!(total_debit, BigDecimal::from(100));
                assert_eq!(total_credit, BigDecimal::from(90));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_tolerance_is_strict() {
        let validator = JournalEntryValidator::default();

        let within = JournalEntryDraft::new("R", EntryStatus::Draft, date())
            .debit("a", 1, dec("10.0005"))
            .credit("b", 2, dec("10"));
        assert!(validator.check_draft(&within).is_ok());

        let at_limit = JournalEntryDraft::new("R", EntryStatus::Draft, date())
            .debit("a", 1, dec("10.001"))
            .credit("b", 2, dec("10"));
        assert!(matches!(
            validator.check_draft(&at_limit),
            Err(LedgerError::UnbalancedEntry { .. })
        ));
    }

    #[test]
    fn test_header_fields_checked_first() {
        let validator = JournalEntryValidator::default();

        let mut draft = balanced();
        draft.reference = "  ".to_string();
        draft.debit_lines.clear();
        assert!(matches!(
            validator.check_draft(&draft),
            Err(LedgerError::MissingField(EntryField::Reference))
        ));

        let mut draft = balanced();
        draft.statut = None;
        assert!(matches!(
            validator.check_draft(&draft),
            Err(LedgerError::MissingField(EntryField::Status))
        ));

        let mut draft = balanced();
        draft.date = None;
        assert!(matches!(
            validator.check_draft(&draft),
            Err(LedgerError::MissingField(EntryField::Date))
        ));
    }

    #[test]
    fn test_both_sides_required() {
        let draft = JournalEntryDraft::new("R", EntryStatus::Draft, date())
            .debit("a", 1, BigDecimal::from(5));
        assert!(matches!(
            JournalEntryValidator::default().check_draft(&draft),
            Err(LedgerError::MissingSide(LineSide::Credit))
        ));
    }

    #[test]
    fn test_incomplete_line_names_side_index_and_field() {
        let validator = JournalEntryValidator::default();

        let draft = balanced().credit("Frais", 627, BigDecimal::from(0));
        match validator.check_draft(&draft) {
            Err(LedgerError::IncompleteLine {
                side,
                line_index,
                field,
            }) => {
                assert_eq!(side, LineSide::Credit);
                assert_eq!(line_index, 1);
                assert_eq!(field, LineField::Amount);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let mut draft = balanced();
        draft.debit_lines[0].account_id = None;
        assert!(matches!(
            validator.check_draft(&draft),
            Err(LedgerError::IncompleteLine {
                side: LineSide::Debit,
                line_index: 0,
                field: LineField::Account,
            })
        ));

        let draft = balanced().debit("Avoir", 411, BigDecimal::from(-20));
        assert!(matches!(
            validator.check_draft(&draft),
            Err(LedgerError::IncompleteLine {
                side: LineSide::Debit,
                line_index: 1,
                field: LineField::Amount,
            })
        ));

        let mut draft = balanced();
        draft.credit_lines[0].description.clear();
        assert!(matches!(
            validator.check_draft(&draft),
            Err(LedgerError::IncompleteLine {
                field: LineField::Description,
                ..
            })
        ));
    }

    #[test]
    fn test_from_entry_splits_sides() {
        let stored = JournalEntry {
            id: Some(9),
            num: Some("AG-2024-3".to_string()),
            reference: "FAC-9".to_string(),
            statut: EntryStatus::Published,
            date: date(),
            lines: vec![
                JournalLine::credit("Vente", 701, BigDecimal::from(80)),
                JournalLine::debit("Client", 411, BigDecimal::from(80)),
                JournalLine::debit("Ligne vide", 471, BigDecimal::from(0)),
            ],
        };
        assert_eq!(stored.lines[0].side(), Some(LineSide::Credit));
        assert_eq!(stored.lines[2].side(), None);
        let draft = JournalEntryDraft::from_entry(&stored);

        assert_eq!(draft.id, Some(9));
        assert_eq!(draft.debit_lines.len(), 1);
        assert_eq!(draft.credit_lines.len(), 1);
        assert_eq!(draft.debit_lines[0].account_id, Some(411));
        assert_eq!(draft.credit_lines[0].montant, BigDecimal::from(80));
        assert!(draft.summary(&BigDecimal::new(1.into(), 3)).is_balanced);
    }

    #[test]
    fn test_summary_difference() {
        let draft = JournalEntryDraft::new("R", EntryStatus::Draft, date())
            .debit("a", 1, dec("150.50"))
            .credit("b", 2, dec("100"));
        let totals = draft.summary(JournalEntryValidator::default().tolerance());

        assert_eq!(totals.difference, dec("50.50"));
        assert!(!totals.is_balanced);
    }

    #[test]
    fn test_stored_entry_rules() {
        let validator = JournalEntryValidator::default();
        let mut entry = validator.validate(balanced()).unwrap().into_entry();
        assert!(validator.check_entry(&entry).is_ok());

        entry.lines[0].credit = BigDecimal::from(100);
        assert!(matches!(
            validator.check_entry(&entry),
            Err(LedgerError::InvalidLine { line_index: 0, .. })
        ));

        entry.lines[0].credit = BigDecimal::from(0);
        entry.lines[1].credit = BigDecimal::from(-100);
        assert!(matches!(
            validator.check_entry(&entry),
            Err(LedgerError::InvalidLine { line_index: 1, .. })
        ));

        entry.lines.truncate(1);
        assert!(matches!(
            validator.check_entry(&entry),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_account_references() {
        let validator = JournalEntryValidator::default();
        let entry = validator.validate(balanced()).unwrap().into_entry();
        let accounts = vec![Account::new(411, "411", "Clients", Some(4), None)];

        assert!(matches!(
            validator.validate_account_references(&entry, &accounts),
            Err(LedgerError::AccountNotFound(701))
        ));
    }
}
