//! Account lifecycle: opening accounts and assigning account numbers.
//!
//! # Account Numbers
//!
//! `no_rekening` is the decimal row id left-padded with zeros to a fixed
//! width (12 by default). Ids are unique, so numbers are too, as long as
//! the id fits in the width. An id that does not fit is an error; it is
//! never truncated.

use tracing::Span;

use super::roll_back;
use crate::{
    error::{AppError, MAX_NAME_LEN, MAX_NIK_LEN, MAX_NO_HP_LEN, ValidationError},
    models::account::{Account, CreateAccountRequest, NewAccount},
    store::{AccountKey, LedgerStore},
};

/// Format `id` as an account number of exactly `width` digits.
pub fn account_number(id: i64, width: usize) -> Result<String, AppError> {
    let digits = id.to_string();
    if id < 0 || digits.len() > width {
        return Err(AppError::AccountNumberOverflow { id, width });
    }
    Ok(format!("{digits:0>width$}"))
}

/// Creates accounts and enforces nik / no_hp uniqueness.
#[derive(Debug, Clone)]
pub struct AccountService<S> {
    store: S,
    account_number_width: usize,
    span: Span,
}

impl<S: LedgerStore> AccountService<S> {
    pub fn new(store: S, account_number_width: usize, span: Span) -> Self {
        Self {
            store,
            account_number_width,
            span,
        }
    }

    /// Open a new account with a zero balance.
    ///
    /// # Process
    ///
    /// 1. Reject empty name, nik or no_hp (whitespace only counts as empty),
    ///    or one longer than its column
    /// 2. Reject a nik or no_hp that already belongs to an account
    /// 3. Insert the account, derive its number from the assigned id and
    ///    store the number, all in one transaction
    ///
    /// # Errors
    ///
    /// - `Validation`: a field is empty or too long
    /// - `DuplicateNationalId` / `DuplicatePhoneNumber`: uniqueness conflict,
    ///   whether caught by the pre-check or by the store's constraint
    /// - `AccountNumberOverflow`: the id is wider than the account number
    /// - `Store`: database failure
    pub async fn create_account(&self, request: CreateAccountRequest) -> Result<Account, AppError> {
        let account = validate(request)?;

        if self
            .store
            .find_account(AccountKey::Nik(&account.nik))
            .await?
            .is_some()
        {
            tracing::info!(parent: &self.span, "Rejected account with existing nik");
            return Err(AppError::DuplicateNationalId);
        }

        if self
            .store
            .find_account(AccountKey::NoHp(&account.no_hp))
            .await?
            .is_some()
        {
            tracing::info!(parent: &self.span, "Rejected account with existing no_hp");
            return Err(AppError::DuplicatePhoneNumber);
        }

        let mut tx = self.store.begin().await?;
        match self.insert(&mut tx, account).await {
            Ok(account) => {
                self.store.commit(tx).await?;
                tracing::info!(
                    parent: &self.span,
                    account_id = account.id,
                    no_rekening = account.no_rekening.as_deref().unwrap_or_default(),
                    "Account created"
                );
                Ok(account)
            }
            Err(err) => {
                if err.is_infrastructure() {
                    tracing::error!(parent: &self.span, error = %err, "Error creating account");
                }
                roll_back(&self.store, tx, &self.span).await;
                Err(err)
            }
        }
    }

    async fn insert(&self, tx: &mut S::Tx, account: NewAccount) -> Result<Account, AppError> {
        let mut account = self
            .store
            .create_account(Some(&mut *tx), account)
            .await
            .map_err(AppError::from_unique)?;

        let no_rekening = account_number(account.id, self.account_number_width)?;
        self.store
            .set_account_number(Some(&mut *tx), account.id, &no_rekening)
            .await?;

        account.no_rekening = Some(no_rekening);
        Ok(account)
    }
}

fn validate(request: CreateAccountRequest) -> Result<NewAccount, ValidationError> {
    let name = request.name.trim();
    let nik = request.nik.trim();
    let no_hp = request.no_hp.trim();

    if name.is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if nik.is_empty() {
        return Err(ValidationError::NikEmpty);
    }
    if no_hp.is_empty() {
        return Err(ValidationError::NoHpEmpty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if nik.chars().count() > MAX_NIK_LEN {
        return Err(ValidationError::NikTooLong);
    }
    if no_hp.chars().count() > MAX_NO_HP_LEN {
        return Err(ValidationError::NoHpTooLong);
    }

    Ok(NewAccount {
        name: name.to_string(),
        nik: nik.to_string(),
        no_hp: no_hp.to_string(),
    })
}
