//! Core types and data structures for the chart of accounts and the journal

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of an account as assigned by the backend
pub type AccountId = i64;
/// Identifier of an accounting class
pub type ClassId = i64;
/// Identifier of a journal entry
pub type EntryId = i64;

/// Accounting class (classe comptable), e.g. "1" for capital accounts.
///
/// Classes are maintained outside this crate and are read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountClass {
    pub id: ClassId,
    /// Class number, a single leading digit ("1".."7")
    #[serde(deserialize_with = "string_or_number")]
    pub numero: String,
    pub nom: String,
}

impl AccountClass {
    pub fn new(id: ClassId, numero: impl Into<String>, nom: impl Into<String>) -> Self {
        Self {
            id,
            numero: numero.into(),
            nom: nom.into(),
        }
    }
}

/// Reference to another resource by id, as nested in backend payloads
/// (`classe: {id, ...}`, `parent: {id, ...}`, `compte: {id}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdRef {
    pub id: i64,
}

/// An account of the chart of accounts.
///
/// The backend sends the class and the parent either as flat ids
/// (`classeId`, `parentId`) or as nested objects (`classe`, `parent`);
/// both shapes deserialize into the same flat representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AccountWire")]
pub struct Account {
    pub id: AccountId,
    pub numero: String,
    pub nom: String,
    pub classe_id: Option<ClassId>,
    pub parent_id: Option<AccountId>,
}

impl Account {
    /// Create a new account
    pub fn new(
        id: AccountId,
        numero: impl Into<String>,
        nom: impl Into<String>,
        classe_id: Option<ClassId>,
        parent_id: Option<AccountId>,
    ) -> Self {
        Self {
            id,
            numero: numero.into(),
            nom: nom.into(),
            classe_id,
            parent_id,
        }
    }

    /// Whether this account sits at the top of its class
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountWire {
    id: AccountId,
    #[serde(deserialize_with = "string_or_number")]
    numero: String,
    nom: String,
    #[serde(default)]
    classe_id: Option<ClassId>,
    #[serde(default)]
    classe: Option<IdRef>,
    #[serde(default)]
    parent_id: Option<AccountId>,
    #[serde(default)]
    parent: Option<IdRef>,
}

impl From<AccountWire> for Account {
    fn from(wire: AccountWire) -> Self {
        Self {
            id: wire.id,
            numero: wire.numero,
            nom: wire.nom,
            classe_id: wire.classe_id.or(wire.classe.map(|c| c.id)),
            parent_id: wire.parent_id.or(wire.parent.map(|p| p.id)),
        }
    }
}

/// Account fields submitted on create and update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    pub numero: String,
    pub nom: String,
    pub classe_id: Option<ClassId>,
    pub parent_id: Option<AccountId>,
}

impl AccountInput {
    pub fn new(numero: impl Into<String>, nom: impl Into<String>) -> Self {
        Self {
            numero: numero.into(),
            nom: nom.into(),
            classe_id: None,
            parent_id: None,
        }
    }

    /// Set the owning class
    pub fn in_class(mut self, classe_id: ClassId) -> Self {
        self.classe_id = Some(classe_id);
        self
    }

    /// Set the parent account
    pub fn under(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Input that reproduces an existing account, used as a starting point for edits
    pub fn from_account(account: &Account) -> Self {
        Self {
            numero: account.numero.clone(),
            nom: account.nom.clone(),
            classe_id: account.classe_id,
            parent_id: account.parent_id,
        }
    }
}

/// Publication status of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Draft entry ("Brouillon")
    #[serde(rename = "Brouillon")]
    Draft,
    /// Published entry ("Publier")
    #[serde(rename = "Publier")]
    Published,
}

impl EntryStatus {
    /// Label used on the wire and in the UI
    pub fn label(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "Brouillon",
            EntryStatus::Published => "Publier",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Side of a journal line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineSide {
    Debit,
    Credit,
}

impl fmt::Display for LineSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSide::Debit => f.write_str("debit"),
            LineSide::Credit => f.write_str("credit"),
        }
    }
}

/// Field of a journal line that validation can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineField {
    Description,
    Account,
    Amount,
}

impl fmt::Display for LineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineField::Description => f.write_str("description"),
            LineField::Account => f.write_str("account"),
            LineField::Amount => f.write_str("amount"),
        }
    }
}

/// Header field of a journal entry that validation can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryField {
    Reference,
    Status,
    Date,
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryField::Reference => f.write_str("reference"),
            EntryField::Status => f.write_str("status"),
            EntryField::Date => f.write_str("date"),
        }
    }
}

/// One line of a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub description: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub debit: BigDecimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub credit: BigDecimal,
    /// Account the line is posted to
    #[serde(rename = "compte")]
    pub account: IdRef,
}

impl JournalLine {
    /// Create a debit line
    pub fn debit(description: impl Into<String>, account_id: AccountId, amount: BigDecimal) -> Self {
        Self {
            id: None,
            description: description.into(),
            debit: amount,
            credit: BigDecimal::from(0),
            account: IdRef { id: account_id },
        }
    }

    /// Create a credit line
    pub fn credit(description: impl Into<String>, account_id: AccountId, amount: BigDecimal) -> Self {
        Self {
            id: None,
            description: description.into(),
            debit: BigDecimal::from(0),
            credit: amount,
            account: IdRef { id: account_id },
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account.id
    }

    /// Side carrying the amount; `None` when neither side is positive
    pub fn side(&self) -> Option<LineSide> {
        let zero = BigDecimal::from(0);
        if self.debit > zero {
            Some(LineSide::Debit)
        } else if self.credit > zero {
            Some(LineSide::Credit)
        } else {
            None
        }
    }
}

/// Journal entry (écriture comptable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    /// Entry number, e.g. "AG-2024-12"; assigned on first save when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<String>,
    pub reference: String,
    pub statut: EntryStatus,
    pub date: NaiveDate,
    #[serde(rename = "lignes", default)]
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    /// Sum of the debit column
    pub fn total_debit(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit).sum()
    }

    /// Sum of the credit column
    pub fn total_credit(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit).sum()
    }

    /// Whether debits and credits agree within `tolerance`
    pub fn is_balanced(&self, tolerance: &BigDecimal) -> bool {
        (self.total_debit() - self.total_credit()).abs() < *tolerance
    }
}

/// Kind of third party a ledger record can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Client,
    Fournisseur,
}

/// One posted line of the general ledger (grand livre), already joined with
/// account and third-party names by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    /// Raw posting timestamp as sent by the backend; may be missing or malformed
    #[serde(default)]
    pub date_ecriture: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub compte_numero: Option<String>,
    #[serde(default)]
    pub compte_name: Option<String>,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub debit: BigDecimal,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub credit: BigDecimal,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub fournisseur_name: Option<String>,
    #[serde(default)]
    pub article_name: Option<String>,
}

impl LedgerRecord {
    /// Client name, ignoring blanks and the "-" placeholder
    pub fn client(&self) -> Option<&str> {
        present(self.client_name.as_deref())
    }

    /// Supplier name, ignoring blanks and the "-" placeholder
    pub fn fournisseur(&self) -> Option<&str> {
        present(self.fournisseur_name.as_deref())
    }

    /// Article name, ignoring blanks and the "-" placeholder
    pub fn article(&self) -> Option<&str> {
        present(self.article_name.as_deref())
    }

    /// Party name for the given kind
    pub fn party(&self, kind: PartyKind) -> Option<&str> {
        match kind {
            PartyKind::Client => self.client(),
            PartyKind::Fournisseur => self.fournisseur(),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-")
}

/// Errors that can occur in the chart of accounts and the journal
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{}", duplicate_message(.numero, .nom))]
    DuplicateAccount {
        numero: Option<String>,
        nom: Option<String>,
    },
    #[error("Invalid account number '{numero}': it must start with '{expected_prefix}'{}", longer_clause(.strictly_longer))]
    InvalidNumberFormat {
        numero: String,
        expected_prefix: String,
        strictly_longer: bool,
    },
    #[error("Account {parent_id} cannot become the parent of account {account_id}: it is the account itself or one of its descendants")]
    CyclicParent {
        account_id: AccountId,
        parent_id: AccountId,
    },
    #[error("Entry is not balanced: total debit = {total_debit}, total credit = {total_credit}")]
    UnbalancedEntry {
        total_debit: BigDecimal,
        total_credit: BigDecimal,
    },
    #[error("The {field} of {side} line {} is missing or invalid", .line_index + 1)]
    IncompleteLine {
        side: LineSide,
        line_index: usize,
        field: LineField,
    },
    #[error("The entry {0} cannot be empty")]
    MissingField(EntryField),
    #[error("The entry must contain at least one {0} line")]
    MissingSide(LineSide),
    #[error("Invalid line {}: {reason}", .line_index + 1)]
    InvalidLine { line_index: usize, reason: String },
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("Accounting class not found: {0}")]
    ClassNotFound(String),
    #[error("Journal entry not found: {0}")]
    EntryNotFound(EntryId),
    #[error("Deleting account {account_id} also deletes {} sub-account(s); confirmation required", .affected.len().saturating_sub(1))]
    ConfirmationRequired {
        account_id: AccountId,
        /// The account itself followed by every descendant
        affected: Vec<AccountId>,
    },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

fn duplicate_message(numero: &Option<String>, nom: &Option<String>) -> String {
    match (numero, nom) {
        (Some(numero), Some(nom)) => format!(
            "An account with number {} and name {} already exists",
            numero, nom
        ),
        (Some(numero), None) => format!("An account with number {} already exists", numero),
        (None, Some(nom)) => format!("An account named \"{}\" already exists", nom),
        (None, None) => "Duplicate account".to_string(),
    }
}

fn longer_clause(strictly_longer: &bool) -> &'static str {
    if *strictly_longer {
        " and be longer than it"
    } else {
        ""
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BigDecimal>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_accepts_flat_and_nested_references() {
        let flat: Account = serde_json::from_str(
            r#"{"id": 2, "numero": "10", "nom": "Capital", "classeId": 1, "parentId": 1}"#,
        )
        .unwrap();
        let nested: Account = serde_json::from_str(
            r#"{"id": 2, "numero": "10", "nom": "Capital",
                "classe": {"id": 1, "numero": "1", "nom": "Capitaux"},
                "parent": {"id": 1, "numero": "1"}}"#,
        )
        .unwrap();

        assert_eq!(flat, nested);
        assert_eq!(flat.classe_id, Some(1));
        assert_eq!(flat.parent_id, Some(1));
    }

    #[test]
    fn test_root_account_without_parent() {
        let account: Account =
            serde_json::from_str(r#"{"id": 1, "numero": "1", "nom": "Capitaux", "parent": null}"#)
                .unwrap();
        assert!(account.is_root());
        assert_eq!(account.classe_id, None);
    }

    #[test]
    fn test_class_number_may_be_numeric() {
        let class: AccountClass =
            serde_json::from_str(r#"{"id": 4, "numero": 4, "nom": "Tiers"}"#).unwrap();
        assert_eq!(class.numero, "4");
    }

    #[test]
    fn test_entry_status_wire_labels() {
        assert_eq!(
            serde_json::to_string(&EntryStatus::Draft).unwrap(),
            "\"Brouillon\""
        );
        let status: EntryStatus = serde_json::from_str("\"Publier\"").unwrap();
        assert_eq!(status, EntryStatus::Published);
    }

    #[test]
    fn test_journal_entry_wire_shape() {
        let entry = JournalEntry {
            id: None,
            num: None,
            reference: "FAC-001".to_string(),
            statut: EntryStatus::Draft,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            lines: vec![JournalLine::debit("Sale", 7, BigDecimal::from(100))],
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["reference"], "FAC-001");
        assert_eq!(json["statut"], "Brouillon");
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["lignes"][0]["compte"]["id"], 7);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_ledger_record_placeholders_are_absent() {
        let record: LedgerRecord = serde_json::from_str(
            r#"{"reference": "R1", "clientName": "-", "fournisseurName": "  ",
                "articleName": "Stylo", "debit": null, "credit": "12.5"}"#,
        )
        .unwrap();

        assert_eq!(record.client(), None);
        assert_eq!(record.fournisseur(), None);
        assert_eq!(record.article(), Some("Stylo"));
        assert_eq!(record.debit, BigDecimal::from(0));
        assert_eq!(record.credit, "12.5".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn test_duplicate_error_names_offending_fields() {
        let both = LedgerError::DuplicateAccount {
            numero: Some("10".to_string()),
            nom: Some("Capital".to_string()),
        };
        assert_eq!(
            both.to_string(),
            "An account with number 10 and name Capital already exists"
        );

        let numero_only = LedgerError::DuplicateAccount {
            numero: Some("10".to_string()),
            nom: None,
        };
        assert_eq!(
            numero_only.to_string(),
            "An account with number 10 already exists"
        );
    }

    #[test]
    fn test_incomplete_line_message_is_one_based() {
        let error = LedgerError::IncompleteLine {
            side: LineSide::Credit,
            line_index: 0,
            field: LineField::Account,
        };
        assert_eq!(
            error.to_string(),
            "The account of credit line 1 is missing or invalid"
        );
    }
}
