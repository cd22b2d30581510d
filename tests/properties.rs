//! Property tests for numbering, hierarchy, journal balance and party totals

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use plan_comptable_core::{
    aggregate_by_party, build_hierarchy, find_most_appropriate_parent, suggest_next_numero,
    validate_format, Account, BalanceFilters, EntryStatus, JournalEntryDraft,
    JournalEntryValidator, LedgerError, LedgerRecord, NumberPrefix, PartyKind,
};
use proptest::prelude::*;
use std::collections::HashMap;

/// Grow a chart from root "1": each choice picks an existing account and
/// appends the next digit to its number, up to nine children per account.
fn grow_chart(choices: &[usize]) -> Vec<Account> {
    let mut accounts = vec![Account::new(1, "1", "Racine", Some(1), None)];
    let mut child_count: HashMap<i64, u32> = HashMap::new();

    for &choice in choices {
        let parent = accounts[choice % accounts.len()].clone();
        let count = child_count.entry(parent.id).or_default();
        if *count >= 9 {
            continue;
        }
        *count += 1;

        let id = accounts.len() as i64 + 1;
        let numero = format!("{}{}", parent.numero, count);
        accounts.push(Account::new(id, numero.clone(), format!("Compte {}", numero), Some(1), Some(parent.id)));
    }

    accounts
}

fn cents(value: i64) -> BigDecimal {
    BigDecimal::from(value) / BigDecimal::from(100)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
}

proptest! {
    #[test]
    fn flattened_children_follow_their_parent_one_level_deeper(
        choices in prop::collection::vec(0usize..64, 0..40)
    ) {
        let accounts = grow_chart(&choices);
        let tree = build_hierarchy(&accounts, None);
        let flat = tree.flatten();

        prop_assert_eq!(flat.len(), accounts.len());

        let mut seen: HashMap<i64, (usize, usize)> = HashMap::new();
        for (position, item) in flat.iter().enumerate() {
            match item.account.parent_id {
                None => prop_assert_eq!(item.level, 0),
                Some(parent_id) => {
                    let &(parent_position, parent_level) = seen
                        .get(&parent_id)
                        .expect("parent listed before child");
                    prop_assert!(parent_position < position);
                    prop_assert_eq!(item.level, parent_level + 1);
                }
            }
            seen.insert(item.account.id, (position, item.level));
        }
    }

    #[test]
    fn suggestion_extends_parent_and_is_stable(
        choices in prop::collection::vec(0usize..64, 0..40),
        pick in 0usize..64
    ) {
        let accounts = grow_chart(&choices);
        let parent = &accounts[pick % accounts.len()];

        let first = suggest_next_numero(Some(parent), None, &accounts).unwrap();
        let second = suggest_next_numero(Some(parent), None, &accounts).unwrap();
        prop_assert_eq!(&first, &second);

        prop_assert!(validate_format(&first, NumberPrefix::Parent(&parent.numero)));
        let taken = accounts
            .iter()
            .filter(|a| a.parent_id == Some(parent.id))
            .any(|a| a.numero == first);
        prop_assert!(!taken);
    }

    #[test]
    fn detected_parent_is_longest_strict_prefix(
        choices in prop::collection::vec(0usize..64, 0..40),
        suffix in "[0-9]{1,3}",
        pick in 0usize..64
    ) {
        let accounts = grow_chart(&choices);
        let numero = format!("{}{}", accounts[pick % accounts.len()].numero, suffix);

        let parent = find_most_appropriate_parent(&numero, &accounts).unwrap();
        prop_assert!(numero.starts_with(&parent.numero));
        prop_assert!(parent.numero.len() < numero.len());
        for account in &accounts {
            if account.numero != numero && numero.starts_with(&account.numero) {
                prop_assert!(account.numero.len() <= parent.numero.len());
            }
        }
    }

    #[test]
    fn child_numbers_must_extend_the_parent(
        parent in "[1-9][0-9]{0,3}",
        numero in "[0-9]{0,6}"
    ) {
        let accepted = validate_format(&numero, NumberPrefix::Parent(&parent));
        prop_assert_eq!(
            accepted,
            numero.starts_with(&parent) && numero.len() > parent.len()
        );
    }

    #[test]
    fn only_balanced_drafts_are_accepted(
        debits in prop::collection::vec(1i64..1_000_000, 1..6),
        credits in prop::collection::vec(1i64..1_000_000, 1..6),
        mirror in any::<bool>()
    ) {
        let credits = if mirror { debits.clone() } else { credits };

        let mut draft = JournalEntryDraft::new("PROP-1", EntryStatus::Draft, day());
        for amount in &debits {
            draft = draft.debit("Débit", 1, cents(*amount));
        }
        for amount in &credits {
            draft = draft.credit("Crédit", 2, cents(*amount));
        }

        let balanced = debits.iter().sum::<i64>() == credits.iter().sum::<i64>();
        match JournalEntryValidator::default().validate(draft) {
            Ok(validated) => {
                prop_assert!(balanced);
                let entry = validated.entry();
                prop_assert_eq!(entry.total_debit(), entry.total_credit());
            }
            Err(LedgerError::UnbalancedEntry { .. }) => prop_assert!(!balanced),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn party_totals_equal_row_sums(
        rows in prop::collection::vec(
            (prop::option::of(prop::sample::select(vec!["Alpha", "beta", "Gamma"])), 0i64..10_000, 0i64..10_000),
            0..30
        )
    ) {
        let records: Vec<LedgerRecord> = rows
            .iter()
            .map(|(name, credit, debit)| LedgerRecord {
                client_name: name.map(str::to_string),
                credit: cents(*credit),
                debit: cents(*debit),
                ..Default::default()
            })
            .collect();

        let report = aggregate_by_party(&records, PartyKind::Client, &BalanceFilters::default());

        let credit: BigDecimal = report.rows.iter().map(|r| &r.credit).sum();
        let debit: BigDecimal = report.rows.iter().map(|r| &r.debit).sum();
        prop_assert_eq!(&report.totals.credit, &credit);
        prop_assert_eq!(&report.totals.debit, &debit);
        prop_assert_eq!(&report.totals.balance, &(&credit - &debit));

        let named_credit: i64 = rows.iter().filter(|r| r.0.is_some()).map(|r| r.1).sum();
        prop_assert_eq!(credit, cents(named_credit));
        for row in &report.rows {
            prop_assert_eq!(&row.balance, &(&row.credit - &row.debit));
        }
    }
}
