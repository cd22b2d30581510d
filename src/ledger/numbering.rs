//! Account numbering rules: prefix validation, number suggestion, parent
//! detection and duplicate detection.
//!
//! Account numbers are strings. A sub-account's number extends its parent's
//! number ("10" under "1", "101" under "10"); a root account's number starts
//! with its class number. Everything here is a pure function over the
//! accounts the caller already holds.

use crate::types::*;

/// The prefix an account number is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberPrefix<'a> {
    /// Number of the parent account; the child number must be strictly longer
    Parent(&'a str),
    /// Number of the owning class, for accounts without a parent
    Class(&'a str),
}

impl<'a> NumberPrefix<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            NumberPrefix::Parent(prefix) | NumberPrefix::Class(prefix) => prefix,
        }
    }

    /// Whether a number equal to the prefix is rejected
    pub fn requires_longer(&self) -> bool {
        matches!(self, NumberPrefix::Parent(_))
    }

    /// The error reported when `numero` does not satisfy this prefix
    pub fn violation(&self, numero: &str) -> LedgerError {
        LedgerError::InvalidNumberFormat {
            numero: numero.to_string(),
            expected_prefix: self.as_str().to_string(),
            strictly_longer: self.requires_longer(),
        }
    }
}

/// Check `numero` against a parent or class prefix.
///
/// Only the string shape is checked; whether the suffix is made of digits is
/// left to the account validator.
pub fn validate_format(numero: &str, prefix: NumberPrefix<'_>) -> bool {
    if numero.is_empty() {
        return false;
    }

    match prefix {
        NumberPrefix::Parent(parent) => {
            numero.starts_with(parent) && numero.chars().count() > parent.chars().count()
        }
        NumberPrefix::Class(class) => numero.starts_with(class),
    }
}

/// Suggest the next free number under `parent`, or among the root accounts
/// of `class` when there is no parent.
///
/// Siblings contribute their suffix after the prefix when that suffix is
/// purely numeric; other suffixes are ignored. The suggestion is the prefix
/// followed by `max(suffix) + 1`, or by `1` when no sibling qualifies.
/// Returns `None` when neither a parent nor a class is given.
pub fn suggest_next_numero(
    parent: Option<&Account>,
    class: Option<&AccountClass>,
    existing: &[Account],
) -> Option<String> {
    if let Some(parent) = parent {
        let siblings = existing
            .iter()
            .filter(|a| a.parent_id == Some(parent.id))
            .map(|a| a.numero.as_str());
        let next = next_suffix(&parent.numero, siblings);
        return Some(format!("{}{}", parent.numero, next));
    }

    let class = class?;
    let roots = existing
        .iter()
        .filter(|a| a.parent_id.is_none() && a.classe_id == Some(class.id))
        .map(|a| a.numero.as_str());
    let next = next_suffix(&class.numero, roots);
    Some(format!("{}{}", class.numero, next))
}

fn next_suffix<'a>(prefix: &str, numeros: impl Iterator<Item = &'a str>) -> u128 {
    numeros
        .filter_map(|numero| numero.get(prefix.len()..))
        .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u128>().ok())
        .max()
        .and_then(|max| max.checked_add(1))
        .unwrap_or(1)
}

/// Find the closest existing ancestor for `numero`: the account with the
/// longest number that is a strict prefix of it.
///
/// When several candidates share the maximal length, the first one in
/// `existing` order wins.
pub fn find_most_appropriate_parent<'a>(
    numero: &str,
    existing: &'a [Account],
) -> Option<&'a Account> {
    let mut best: Option<&'a Account> = None;

    for account in existing {
        if account.numero == numero || !numero.starts_with(&account.numero) {
            continue;
        }
        let longer = best.is_none_or(|b| account.numero.len() > b.numero.len());
        if longer {
            best = Some(account);
        }
    }

    best
}

/// Outcome of a duplicate check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DuplicateCheck {
    /// Another account already uses this number
    pub numero: bool,
    /// Another account already uses this name (case-insensitive)
    pub nom: bool,
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        self.numero || self.nom
    }

    /// Turn a positive check into the matching error
    pub fn into_error(self, numero: &str, nom: &str) -> Option<LedgerError> {
        if !self.is_duplicate() {
            return None;
        }
        Some(LedgerError::DuplicateAccount {
            numero: self.numero.then(|| numero.to_string()),
            nom: self.nom.then(|| nom.to_string()),
        })
    }
}

/// Check `numero` (exact) and `nom` (case-insensitive) against the existing
/// accounts, ignoring the account being edited.
pub fn check_duplicate(
    numero: &str,
    nom: &str,
    existing: &[Account],
    exclude_id: Option<AccountId>,
) -> DuplicateCheck {
    let nom = nom.to_lowercase();
    let mut check = DuplicateCheck::default();

    for account in existing.iter().filter(|a| Some(a.id) != exclude_id) {
        check.numero |= account.numero == numero;
        check.nom |= account.nom.to_lowercase() == nom;
    }

    check
}
