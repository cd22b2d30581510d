//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

const MAX_ACCOUNT_NUMBER_LEN: usize = 20;
const MAX_ACCOUNT_NAME_LEN: usize = 500;
const MAX_REFERENCE_LEN: usize = 100;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an account number is present and fits the backend column
pub fn validate_account_number(numero: &str) -> LedgerResult<()> {
    if numero.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account number cannot be empty".to_string(),
        ));
    }

    if numero.chars().count() > MAX_ACCOUNT_NUMBER_LEN {
        return Err(LedgerError::Validation(format!(
            "Account number cannot exceed {} characters",
            MAX_ACCOUNT_NUMBER_LEN
        )));
    }

    Ok(())
}

/// Validate that an account number only contains digits
pub fn validate_digits_only(numero: &str) -> LedgerResult<()> {
    if numero.is_empty() || !numero.chars().all(|c| c.is_ascii_digit()) {
        return Err(LedgerError::Validation(format!(
            "Invalid account number '{}': only digits are allowed",
            numero
        )));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_ACCOUNT_NAME_LEN {
        return Err(LedgerError::Validation(format!(
            "Account name cannot exceed {} characters",
            MAX_ACCOUNT_NAME_LEN
        )));
    }

    Ok(())
}

/// Validate the length of a journal entry reference
pub fn validate_reference_length(reference: &str) -> LedgerResult<()> {
    if reference.chars().count() > MAX_REFERENCE_LEN {
        return Err(LedgerError::Validation(format!(
            "Entry reference cannot exceed {} characters",
            MAX_REFERENCE_LEN
        )));
    }

    Ok(())
}

/// Account validator that also requires digits-only account numbers,
/// matching the rule enforced by the backend.
pub struct DigitsOnlyAccountValidator;

impl AccountValidator for DigitsOnlyAccountValidator {
    fn validate_account(&self, account: &AccountInput) -> LedgerResult<()> {
        DefaultAccountValidator.validate_account(account)?;
        validate_digits_only(&account.numero)
    }
}
