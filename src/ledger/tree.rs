//! Conversion between the flat account list and the account hierarchy.
//!
//! Two tree-building strategies exist side by side and must stay separate:
//!
//! - [`build_hierarchy`] feeds the on-screen chart. A child must have exactly
//!   one more character than its parent, start with the parent's number and
//!   declare that parent. Siblings are ordered by plain string comparison, so
//!   "10" sorts before "2".
//! - [`build_hierarchy_for_export`] feeds the spreadsheet export. It follows
//!   declared parent links only, promotes accounts with a missing parent to
//!   roots and orders siblings with numeric collation, so "2" sorts before "10".
//!
//! Trees are stored as index lists into the borrowed account slice.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::types::*;

/// Account hierarchy borrowed from a flat account slice
#[derive(Debug, Clone)]
pub struct AccountTree<'a> {
    accounts: &'a [Account],
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

/// An account together with its depth in the hierarchy (roots are level 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlatAccount<'a> {
    pub account: &'a Account,
    pub level: usize,
}

/// Nested view of a tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountNode<'a> {
    pub account: &'a Account,
    pub children: Vec<AccountNode<'a>>,
}

impl<'a> AccountTree<'a> {
    fn empty(accounts: &'a [Account]) -> Self {
        Self {
            accounts,
            children: vec![Vec::new(); accounts.len()],
            roots: Vec::new(),
        }
    }

    /// Root accounts in display order
    pub fn roots(&self) -> impl Iterator<Item = &'a Account> + '_ {
        self.roots.iter().map(|&i| &self.accounts[i])
    }

    /// Direct children of the account with the given id, in display order
    pub fn children_of(&self, id: AccountId) -> Vec<&'a Account> {
        self.accounts
            .iter()
            .position(|a| a.id == id)
            .map(|i| self.children[i].iter().map(|&c| &self.accounts[c]).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Nested representation, e.g. for JSON consumers
    pub fn nodes(&self) -> Vec<AccountNode<'a>> {
        self.roots.iter().map(|&i| self.node(i)).collect()
    }

    fn node(&self, index: usize) -> AccountNode<'a> {
        AccountNode {
            account: &self.accounts[index],
            children: self.children[index].iter().map(|&c| self.node(c)).collect(),
        }
    }

    /// Depth-first listing, parents before children, preserving sibling order
    pub fn flatten(&self) -> Vec<FlatAccount<'a>> {
        self.walk(self.roots.iter().rev().map(|&i| (i, 0)).collect())
    }

    /// Depth-first listing of the account with the given id and everything
    /// below it; the account itself is level 0. Empty when the id is unknown.
    pub fn subtree(&self, id: AccountId) -> Vec<FlatAccount<'a>> {
        match self.accounts.iter().position(|a| a.id == id) {
            Some(index) => self.walk(vec![(index, 0)]),
            None => Vec::new(),
        }
    }

    fn walk(&self, mut stack: Vec<(usize, usize)>) -> Vec<FlatAccount<'a>> {
        let mut result = Vec::with_capacity(self.accounts.len());
        let mut visited = vec![false; self.accounts.len()];

        while let Some((index, level)) = stack.pop() {
            // parent links from storage may loop
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            result.push(FlatAccount {
                account: &self.accounts[index],
                level,
            });
            stack.extend(self.children[index].iter().rev().map(|&c| (c, level + 1)));
        }

        result
    }
}

/// Build the display hierarchy, optionally restricted to the roots of one class.
pub fn build_hierarchy(accounts: &[Account], class_filter: Option<ClassId>) -> AccountTree<'_> {
    let mut tree = AccountTree::empty(accounts);

    tree.roots = accounts
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_root())
        .filter(|(_, a)| class_filter.is_none_or(|class| a.classe_id == Some(class)))
        .map(|(i, _)| i)
        .collect();
    tree.roots
        .sort_by(|&a, &b| accounts[a].numero.cmp(&accounts[b].numero));

    let roots = tree.roots.clone();
    for root in roots {
        attach_children(&mut tree, root);
    }

    tree
}

fn attach_children(tree: &mut AccountTree<'_>, parent: usize) {
    let accounts = tree.accounts;
    let parent_account = &accounts[parent];
    let expected_len = parent_account.numero.chars().count() + 1;

    let mut children: Vec<usize> = accounts
        .iter()
        .enumerate()
        .filter(|(_, a)| {
            a.numero.chars().count() == expected_len
                && a.numero.starts_with(&parent_account.numero)
                && a.parent_id == Some(parent_account.id)
        })
        .map(|(i, _)| i)
        .collect();
    children.sort_by(|&a, &b| accounts[a].numero.cmp(&accounts[b].numero));

    tree.children[parent] = children.clone();
    // numbers grow by one character per level, so this terminates
    for child in children {
        attach_children(tree, child);
    }
}

/// Build the export hierarchy over every class from declared parent links.
pub fn build_hierarchy_for_export(accounts: &[Account]) -> AccountTree<'_> {
    let mut tree = AccountTree::empty(accounts);
    let index_by_id: HashMap<AccountId, usize> =
        accounts.iter().enumerate().map(|(i, a)| (a.id, i)).collect();

    for (index, account) in accounts.iter().enumerate() {
        let parent = account
            .parent_id
            .filter(|&p| p != account.id)
            .and_then(|p| index_by_id.get(&p).copied());
        match parent {
            Some(parent) => tree.children[parent].push(index),
            None => tree.roots.push(index),
        }
    }

    let by_number = |a: &usize, b: &usize| natural_cmp(&accounts[*a].numero, &accounts[*b].numero);
    tree.roots.sort_by(by_number);
    for children in tree.children.iter_mut() {
        children.sort_by(by_number);
    }

    tree
}

/// Flatten a tree; see [`AccountTree::flatten`]
pub fn flatten<'a>(tree: &AccountTree<'a>) -> Vec<FlatAccount<'a>> {
    tree.flatten()
}

/// Ids of every account whose parent chain reaches `account_id`, excluding
/// `account_id` itself.
pub fn find_descendant_ids(account_id: AccountId, accounts: &[Account]) -> BTreeSet<AccountId> {
    let mut result = BTreeSet::new();
    collect_descendants(account_id, accounts, &mut result);
    result.remove(&account_id);
    result
}

fn collect_descendants(parent_id: AccountId, accounts: &[Account], result: &mut BTreeSet<AccountId>) {
    for child in accounts.iter().filter(|a| a.parent_id == Some(parent_id)) {
        // already seen means a cycle in the stored data
        if result.insert(child.id) {
            collect_descendants(child.id, accounts, result);
        }
    }
}

/// Compare two strings the way a numeric-aware collator does: runs of digits
/// compare by value, other runs compare case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks { rest: a };
    let mut right = Chunks { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_chunks(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.starts_with(|c: char| c.is_ascii_digit());
    let y_digits = y.starts_with(|c: char| c.is_ascii_digit());

    match (x_digits, y_digits) {
        (true, true) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => x.to_lowercase().cmp(&y.to_lowercase()),
    }
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}
