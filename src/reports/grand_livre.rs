//! General ledger (grand livre) listing

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::*;

/// Shown instead of a date when the record carries none
pub const DATE_UNSPECIFIED: &str = "Date non spécifiée";
/// Shown instead of a date that cannot be parsed
pub const DATE_INVALID: &str = "Date invalide";

/// Origin of a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Client,
    Fournisseur,
    Comptable,
}

impl RecordKind {
    pub fn of(record: &LedgerRecord) -> Self {
        if record.client().is_some() {
            RecordKind::Client
        } else if record.fournisseur().is_some() {
            RecordKind::Fournisseur
        } else {
            RecordKind::Comptable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Client => "Client",
            RecordKind::Fournisseur => "Fournisseur",
            RecordKind::Comptable => "Comptable",
        }
    }
}

/// Third party of a record, or "-" for purely accounting records
pub fn tiers(record: &LedgerRecord) -> &str {
    record
        .client()
        .or_else(|| record.fournisseur())
        .unwrap_or("-")
}

/// Parse the backend timestamp. Accepts ISO date-times with or without
/// fractional seconds or offset, and bare dates.
pub fn parse_record_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Date as displayed in the listing, `DD/MM/YYYY HH:mm`
pub fn display_date(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => DATE_UNSPECIFIED.to_string(),
        Some(raw) => parse_record_date(raw)
            .map(|d| d.format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| DATE_INVALID.to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilters {
    /// Case-insensitive text matched against reference, account number,
    /// account name, party names and article name
    pub search: Option<String>,
    /// Order by posting date, undated records last; otherwise keep the
    /// backend order
    pub chronological: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub credit: BigDecimal,
    pub debit: BigDecimal,
    /// `credit - debit`
    pub difference: BigDecimal,
}

impl LedgerTotals {
    pub fn of<'a>(records: impl IntoIterator<Item = &'a LedgerRecord>) -> Self {
        let mut credit = BigDecimal::from(0);
        let mut debit = BigDecimal::from(0);
        for record in records {
            credit += &record.credit;
            debit += &record.debit;
        }
        let difference = &credit - &debit;

        Self {
            credit,
            debit,
            difference,
        }
    }
}

/// Filtered ledger records with footer totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerListing<'a> {
    pub records: Vec<&'a LedgerRecord>,
    pub totals: LedgerTotals,
}

impl<'a> LedgerListing<'a> {
    pub fn page(&self, page: usize, per_page: usize) -> Page<'_, &'a LedgerRecord> {
        paginate(&self.records, page, per_page)
    }
}

/// Filter the ledger. Records are never dropped for a missing or invalid
/// date; see [`display_date`].
pub fn list_ledger<'a>(records: &'a [LedgerRecord], filters: &LedgerFilters) -> LedgerListing<'a> {
    let needle = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut selected: Vec<&LedgerRecord> = records
        .iter()
        .filter(|r| needle.as_deref().is_none_or(|n| matches_search(r, n)))
        .collect();

    if filters.chronological {
        selected.sort_by(|a, b| compare_dates(a, b));
    }

    let totals = LedgerTotals::of(selected.iter().copied());
    LedgerListing {
        records: selected,
        totals,
    }
}

fn matches_search(record: &LedgerRecord, needle: &str) -> bool {
    [
        record.reference.as_deref(),
        record.compte_numero.as_deref(),
        record.compte_name.as_deref(),
        record.client(),
        record.fournisseur(),
        record.article(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

fn compare_dates(a: &LedgerRecord, b: &LedgerRecord) -> Ordering {
    let date = |r: &LedgerRecord| r.date_ecriture.as_deref().and_then(parse_record_date);
    match (date(a), date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based page number actually returned
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice out a 1-based page; out-of-range pages are clamped and there is
/// always at least one (possibly empty) page.
pub fn paginate<T>(items: &[T], page: usize, per_page: usize) -> Page<'_, T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * per_page).min(items.len());
    let end = (start + per_page).min(items.len());

    Page {
        items: &items[start..end],
        page,
        total_pages,
        total_items: items.len(),
    }
}
