//! Read-only lookups: balance, account details and mutation history.
//!
//! Nothing here opens a transaction or caches; every call reads the latest
//! committed state.

use tracing::Span;

use crate::{
    error::AppError,
    models::{
        account::{Account, SaldoResponse},
        mutation::Mutation,
    },
    store::{AccountKey, LedgerStore},
};

#[derive(Debug, Clone)]
pub struct QueryService<S> {
    store: S,
    span: Span,
}

impl<S: LedgerStore> QueryService<S> {
    pub fn new(store: S, span: Span) -> Self {
        Self { store, span }
    }

    /// Account by number, or `AccountNotFound`.
    pub async fn get_account(&self, no_rekening: &str) -> Result<Account, AppError> {
        self.store
            .find_account(AccountKey::AccountNumber(no_rekening))
            .await
            .inspect_err(|err| {
                tracing::error!(parent: &self.span, %no_rekening, error = %err, "Error getting account by no rekening");
            })?
            .ok_or_else(|| AppError::AccountNotFound {
                no_rekening: no_rekening.to_string(),
            })
    }

    pub async fn get_balance(&self, no_rekening: &str) -> Result<SaldoResponse, AppError> {
        let account = self.get_account(no_rekening).await?;

        Ok(SaldoResponse {
            no_rekening: no_rekening.to_string(),
            saldo: account.saldo,
        })
    }

    /// Mutations of the account, newest first.
    pub async fn list_mutations(&self, no_rekening: &str) -> Result<Vec<Mutation>, AppError> {
        let account = self.get_account(no_rekening).await?;

        let mutations = self
            .store
            .list_mutations(account.id)
            .await
            .inspect_err(|err| {
                tracing::error!(parent: &self.span, %no_rekening, error = %err, "Error getting mutations");
            })?;
        Ok(mutations)
    }
}
