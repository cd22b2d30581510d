//! Balances per third party and per account

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ledger::tree::natural_cmp;
use crate::types::*;

/// Which balances to keep, by sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceType {
    #[default]
    All,
    /// Balance greater than or equal to zero
    Positive,
    /// Balance below zero
    Negative,
}

impl BalanceType {
    fn accepts(&self, balance: &BigDecimal) -> bool {
        let zero = BigDecimal::from(0);
        match self {
            BalanceType::All => true,
            BalanceType::Positive => *balance >= zero,
            BalanceType::Negative => *balance < zero,
        }
    }
}

/// Filters applied to aggregated party balances; unset bounds are ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceFilters {
    pub balance_type: BalanceType,
    pub min_credit: Option<BigDecimal>,
    pub max_debit: Option<BigDecimal>,
    pub min_balance: Option<BigDecimal>,
    pub max_balance: Option<BigDecimal>,
    /// Case-insensitive substring of the party name
    pub search: Option<String>,
}

impl BalanceFilters {
    fn accepts(&self, row: &PartyBalance, needle: Option<&str>) -> bool {
        self.min_credit.as_ref().is_none_or(|min| row.credit >= *min)
            && self.max_debit.as_ref().is_none_or(|max| row.debit <= *max)
            && self.min_balance.as_ref().is_none_or(|min| row.balance >= *min)
            && self.max_balance.as_ref().is_none_or(|max| row.balance <= *max)
            && needle.is_none_or(|n| row.name.to_lowercase().contains(n))
            && self.balance_type.accepts(&row.balance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyBalance {
    pub name: String,
    pub credit: BigDecimal,
    pub debit: BigDecimal,
    /// `credit - debit`
    pub balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceTotals {
    pub credit: BigDecimal,
    pub debit: BigDecimal,
    pub balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyBalanceReport {
    pub kind: PartyKind,
    pub rows: Vec<PartyBalance>,
    /// Sums over `rows`, after filtering
    pub totals: BalanceTotals,
}

/// Group records by client or supplier name and sum both columns.
///
/// Records without a name for `kind` do not take part. Rows are sorted by
/// name and the totals cover the filtered rows only.
pub fn aggregate_by_party(records: &[LedgerRecord], kind: PartyKind, filters: &BalanceFilters) -> PartyBalanceReport {
    let mut groups: BTreeMap<&str, (BigDecimal, BigDecimal)> = BTreeMap::new();
    for record in records {
        if let Some(name) = record.party(kind) {
            let (credit, debit) = groups.entry(name).or_default();
            *credit += &record.credit;
            *debit += &record.debit;
        }
    }

    let needle = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<PartyBalance> = groups
        .into_iter()
        .map(|(name, (credit, debit))| PartyBalance {
            name: name.to_string(),
            balance: &credit - &debit,
            credit,
            debit,
        })
        .filter(|row| filters.accepts(row, needle.as_deref()))
        .collect();
    rows.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut totals = BalanceTotals::default();
    for row in &rows {
        totals.credit += &row.credit;
        totals.debit += &row.debit;
        totals.balance += &row.balance;
    }

    PartyBalanceReport { kind, rows, totals }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub compte_numero: String,
    pub compte_name: Option<String>,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// `debit - credit`
    pub solde: BigDecimal,
}

/// Trial balance per account number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub rows: Vec<AccountBalance>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub is_balanced: bool,
}

/// Sum debit and credit per account number, in account number order.
/// Records without an account number are counted under "-".
pub fn aggregate_by_account(records: &[LedgerRecord]) -> TrialBalance {
    let mut groups: BTreeMap<&str, AccountBalance> = BTreeMap::new();
    for record in records {
        let numero = record.compte_numero.as_deref().unwrap_or("-");
        let row = groups.entry(numero).or_insert_with(|| AccountBalance {
            compte_numero: numero.to_string(),
            compte_name: record.compte_name.clone(),
            debit: BigDecimal::from(0),
            credit: BigDecimal::from(0),
            solde: BigDecimal::from(0),
        });
        row.debit += &record.debit;
        row.credit += &record.credit;
    }

    let mut rows: Vec<AccountBalance> = groups.into_values().collect();
    rows.sort_by(|a, b| natural_cmp(&a.compte_numero, &b.compte_numero));

    let mut total_debit = BigDecimal::from(0);
    let mut total_credit = BigDecimal::from(0);
    for row in rows.iter_mut() {
        row.solde = &row.debit - &row.credit;
        total_debit += &row.debit;
        total_credit += &row.credit;
    }
    let is_balanced = total_debit == total_credit;

    TrialBalance {
        rows,
        total_debit,
        total_credit,
        is_balanced,
    }
}
