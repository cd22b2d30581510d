//! Chart of accounts management

use tracing::{debug, info, warn};

use crate::ledger::numbering::{self, NumberPrefix};
use crate::ledger::tree::{self, AccountTree, FlatAccount};
use crate::traits::*;
use crate::types::*;

/// Service for handling chart of accounts operations.
///
/// It is the only writer of accounts: every mutation is validated against
/// the current snapshot before the storage is called, and the snapshot is
/// only updated once the storage call succeeded.
pub struct ChartOfAccountsService<S: AccountRepository> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
    classes: Vec<AccountClass>,
    accounts: Vec<Account>,
}

impl<S: AccountRepository> ChartOfAccountsService<S> {
    /// Create a new service with the default validator and an empty snapshot
    pub fn new(storage: S) -> Self {
        Self::with_validator(storage, Box::new(DefaultAccountValidator))
    }

    /// Create a new service with a custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self {
            storage,
            validator,
            classes: Vec::new(),
            accounts: Vec::new(),
        }
    }

    /// Reload classes and accounts from storage
    pub async fn refresh(&mut self) -> LedgerResult<()> {
        let classes = self.storage.list_classes().await?;
        let accounts = self.storage.list_accounts().await?;
        debug!(
            classes = classes.len(),
            accounts = accounts.len(),
            "Loaded chart of accounts"
        );
        self.classes = classes;
        self.accounts = accounts;
        Ok(())
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn classes(&self) -> &[AccountClass] {
        &self.classes
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Get an account by id, returning an error if not found
    pub fn account_required(&self, id: AccountId) -> LedgerResult<&Account> {
        self.account(id).ok_or(LedgerError::AccountNotFound(id))
    }

    pub fn account_by_numero(&self, numero: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.numero == numero)
    }

    pub fn class(&self, id: ClassId) -> Option<&AccountClass> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn class_by_numero(&self, numero: &str) -> Option<&AccountClass> {
        self.classes.iter().find(|c| c.numero == numero)
    }

    /// Display hierarchy, optionally restricted to one class
    pub fn hierarchy(&self, class_filter: Option<ClassId>) -> AccountTree<'_> {
        tree::build_hierarchy(&self.accounts, class_filter)
    }

    /// Display hierarchy flattened with levels
    pub fn flattened(&self, class_filter: Option<ClassId>) -> Vec<FlatAccount<'_>> {
        self.hierarchy(class_filter).flatten()
    }

    /// Suggest the next free number under a parent, or among the roots of a class
    pub fn suggest_next_numero(
        &self,
        parent_id: Option<AccountId>,
        class_id: Option<ClassId>,
    ) -> LedgerResult<Option<String>> {
        let parent = parent_id.map(|id| self.account_required(id)).transpose()?;
        let class = match class_id {
            Some(id) => Some(
                self.class(id)
                    .ok_or_else(|| LedgerError::ClassNotFound(id.to_string()))?,
            ),
            None => None,
        };
        Ok(numbering::suggest_next_numero(parent, class, &self.accounts))
    }

    /// Closest existing ancestor for a number being typed
    pub fn find_most_appropriate_parent(&self, numero: &str) -> Option<&Account> {
        numbering::find_most_appropriate_parent(numero, &self.accounts)
    }

    /// Accounts that may be chosen as parent: every account when creating,
    /// everything but the account and its subtree when editing.
    pub fn potential_parents(&self, editing: Option<AccountId>) -> Vec<&Account> {
        match editing {
            None => self.accounts.iter().collect(),
            Some(id) => {
                let excluded = tree::find_descendant_ids(id, &self.accounts);
                self.accounts
                    .iter()
                    .filter(|a| a.id != id && !excluded.contains(&a.id))
                    .collect()
            }
        }
    }

    /// Create a new account
    pub async fn create_account(&mut self, input: AccountInput) -> LedgerResult<Account> {
        let input = self.prepare(input, None)?;

        let account = self.storage.create_account(&input).await.map_err(|e| {
            warn!(numero = %input.numero, error = %e, "Failed to create account");
            e
        })?;

        info!(
            id = account.id,
            numero = %account.numero,
            parent_id = ?account.parent_id,
            "Created account"
        );
        self.accounts.push(account.clone());
        Ok(account)
    }

    /// Update an existing account, allowing renumbering and reparenting
    pub async fn update_account(&mut self, id: AccountId, input: AccountInput) -> LedgerResult<Account> {
        self.account_required(id)?;

        if let Some(parent_id) = input.parent_id {
            if parent_id == id || tree::find_descendant_ids(id, &self.accounts).contains(&parent_id) {
                warn!(id, parent_id, "Rejected cyclic reparenting");
                return Err(LedgerError::CyclicParent {
                    account_id: id,
                    parent_id,
                });
            }
        }

        let input = self.prepare(input, Some(id))?;
        self.check_sub_accounts(id, &input)?;

        let account = self.storage.update_account(id, &input).await.map_err(|e| {
            warn!(id, error = %e, "Failed to update account");
            e
        })?;

        info!(id, numero = %account.numero, "Updated account");
        if let Some(slot) = self.accounts.iter_mut().find(|a| a.id == id) {
            *slot = account.clone();
        }
        Ok(account)
    }

    /// The account followed by every account deleting it would remove.
    ///
    /// Accounts are listed depth-first along declared parent links, each
    /// parent before its children and siblings in numeric order.
    pub fn deletion_preview(&self, id: AccountId) -> LedgerResult<Vec<&Account>> {
        self.account_required(id)?;
        Ok(tree::build_hierarchy_for_export(&self.accounts)
            .subtree(id)
            .into_iter()
            .map(|flat| flat.account)
            .collect())
    }

    /// Delete an account and its whole subtree.
    ///
    /// Without `confirmed` nothing is deleted and the affected ids are
    /// returned in a [`LedgerError::ConfirmationRequired`]. Returns the ids
    /// that were removed.
    pub async fn delete_account(&mut self, id: AccountId, confirmed: bool) -> LedgerResult<Vec<AccountId>> {
        let affected: Vec<AccountId> = self
            .deletion_preview(id)?
            .into_iter()
            .map(|a| a.id)
            .collect();

        if !confirmed {
            return Err(LedgerError::ConfirmationRequired {
                account_id: id,
                affected,
            });
        }

        self.storage.delete_account(id).await.map_err(|e| {
            warn!(id, error = %e, "Failed to delete account");
            e
        })?;

        info!(id, removed = affected.len(), "Deleted account subtree");
        self.accounts.retain(|a| !affected.contains(&a.id));
        Ok(affected)
    }

    /// Sub-accounts must still extend the number of an edited account and
    /// share its class.
    fn check_sub_accounts(&self, id: AccountId, input: &AccountInput) -> LedgerResult<()> {
        let prefix = NumberPrefix::Parent(&input.numero);
        let orphaned = self
            .accounts
            .iter()
            .filter(|a| a.parent_id == Some(id))
            .find(|child| !numbering::validate_format(&child.numero, prefix));
        if let Some(child) = orphaned {
            warn!(id, numero = %input.numero, child = %child.numero, "Rejected renumbering");
            return Err(prefix.violation(&child.numero));
        }

        let current = self.account_required(id)?;
        if current.classe_id != input.classe_id {
            let descendants = tree::find_descendant_ids(id, &self.accounts);
            if let Some(child) = self.accounts.iter().find(|a| descendants.contains(&a.id)) {
                warn!(id, child = %child.numero, "Rejected class change");
                return Err(LedgerError::Validation(format!(
                    "Account {} cannot change class while sub-account {} belongs to it",
                    current.numero, child.numero
                )));
            }
        }

        Ok(())
    }

    /// Run every check shared by create and update, resolving the class.
    ///
    /// Order: field validator, duplicates, parent lookup, class resolution,
    /// numbering format.
    fn prepare(&self, mut input: AccountInput, editing: Option<AccountId>) -> LedgerResult<AccountInput> {
        input.numero = input.numero.trim().to_string();
        input.nom = input.nom.trim().to_string();

        self.validator.validate_account(&input)?;

        let duplicates = numbering::check_duplicate(&input.numero, &input.nom, &self.accounts, editing);
        if let Some(error) = duplicates.into_error(&input.numero, &input.nom) {
            warn!(numero = %input.numero, nom = %input.nom, "Rejected duplicate account");
            return Err(error);
        }

        let parent = input
            .parent_id
            .map(|id| self.account_required(id))
            .transpose()?;

        let classe_id = match (input.classe_id, parent) {
            (Some(class), Some(parent)) if parent.classe_id.is_some_and(|p| p != class) => {
                return Err(LedgerError::Validation(format!(
                    "Account {} must belong to the class of its parent {}",
                    input.numero, parent.numero
                )));
            }
            (Some(class), _) => class,
            (None, Some(parent)) => parent.classe_id.ok_or_else(|| {
                LedgerError::Validation(format!("Parent account {} has no class", parent.numero))
            })?,
            (None, None) => {
                return Err(LedgerError::Validation(
                    "A root account requires a class".to_string(),
                ))
            }
        };
        let class = self
            .class(classe_id)
            .ok_or_else(|| LedgerError::ClassNotFound(classe_id.to_string()))?;
        input.classe_id = Some(classe_id);

        let prefix = match parent {
            Some(parent) => NumberPrefix::Parent(&parent.numero),
            None => NumberPrefix::Class(&class.numero),
        };
        if !numbering::validate_format(&input.numero, prefix) {
            warn!(numero = %input.numero, prefix = prefix.as_str(), "Rejected account number");
            return Err(prefix.violation(&input.numero));
        }

        Ok(input)
    }
}
