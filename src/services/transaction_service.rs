//! Transaction service - credit (tabung) and debit (tarik).
//!
//! # Protocol
//!
//! Every operation runs as one database transaction:
//!
//! 1. Validate the request
//! 2. Begin the transaction
//! 3. Load and lock the account by `no_rekening`
//! 4. For debits, check the balance covers the nominal; for credits,
//!    check the new balance still fits in an `i64`
//! 5. Adjust the balance
//! 6. Record the mutation
//! 7. Commit
//!
//! A failure after step 2 rolls back and returns the original cause. The
//! handle is owned by this module for its whole life, so a panic or a
//! dropped future also rolls back (dropping an uncommitted handle does).
//!
//! # Concurrency
//!
//! The row lock taken in step 3 serializes debits and credits on the same
//! account. There is no application-level locking and nothing is retried.

use std::fmt;

use tracing::Span;

use super::roll_back;
use crate::{
    error::{AppError, ValidationError},
    models::mutation::{Mutation, MutationType, NewMutation},
    store::LedgerStore,
};

/// Progress of one credit or debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Started,
    AccountLoaded,
    Validated,
    BalanceUpdated,
    MutationRecorded,
    Committed,
    RolledBack,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Started => "started",
            Stage::AccountLoaded => "account_loaded",
            Stage::Validated => "validated",
            Stage::BalanceUpdated => "balance_updated",
            Stage::MutationRecorded => "mutation_recorded",
            Stage::Committed => "committed",
            Stage::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Outcome of a committed credit or debit.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub no_rekening: String,

    /// Balance after the mutation
    pub saldo: i64,

    pub mutation: Mutation,
}

#[derive(Debug, Clone)]
pub struct TransactionService<S> {
    store: S,
    span: Span,
}

impl<S: LedgerStore> TransactionService<S> {
    pub fn new(store: S, span: Span) -> Self {
        Self { store, span }
    }

    /// Add `nominal` to the account's balance.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty `no_rekening` or `nominal <= 0`
    /// - `AccountNotFound`: no account with that number
    /// - `SaldoOverflow`: the new balance would not fit in an `i64`
    /// - `Store`: database failure (the transaction is rolled back)
    pub async fn credit(
        &self,
        no_rekening: &str,
        nominal: i64,
        reference: &str,
    ) -> Result<Receipt, AppError> {
        self.execute(MutationType::Credit, no_rekening, nominal, reference)
            .await
    }

    /// Remove `nominal` from the account's balance.
    ///
    /// # Errors
    ///
    /// Same as [`credit`](Self::credit), plus `InsufficientFunds` when the
    /// balance is lower than `nominal`. Nothing is written in that case.
    pub async fn debit(
        &self,
        no_rekening: &str,
        nominal: i64,
        reference: &str,
    ) -> Result<Receipt, AppError> {
        self.execute(MutationType::Debit, no_rekening, nominal, reference)
            .await
    }

    async fn execute(
        &self,
        kind: MutationType,
        no_rekening: &str,
        nominal: i64,
        reference: &str,
    ) -> Result<Receipt, AppError> {
        let no_rekening = no_rekening.trim();
        if no_rekening.is_empty() {
            return Err(ValidationError::NoRekeningEmpty.into());
        }
        if nominal <= 0 {
            return Err(ValidationError::NominalNotPositive.into());
        }

        let mut tx = self.store.begin().await.inspect_err(|err| {
            tracing::error!(parent: &self.span, %kind, error = %err, "Error starting transaction");
        })?;

        let mut stage = Stage::Started;
        let outcome = self
            .apply(&mut tx, &mut stage, kind, no_rekening, nominal, reference)
            .await;

        match outcome {
            Ok(receipt) => {
                if let Err(err) = self.store.commit(tx).await {
                    tracing::error!(
                        parent: &self.span,
                        %kind,
                        %no_rekening,
                        failed_at = %stage,
                        stage = %Stage::RolledBack,
                        error = %err,
                        "Error committing transaction"
                    );
                    return Err(err.into());
                }

                tracing::info!(
                    parent: &self.span,
                    %kind,
                    %no_rekening,
                    nominal,
                    saldo = receipt.saldo,
                    stage = %Stage::Committed,
                    "Mutation committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                if err.is_infrastructure() {
                    tracing::error!(
                        parent: &self.span,
                        %kind,
                        %no_rekening,
                        failed_at = %stage,
                        stage = %Stage::RolledBack,
                        error = %err,
                        "Error applying mutation"
                    );
                } else {
                    tracing::info!(
                        parent: &self.span,
                        %kind,
                        %no_rekening,
                        failed_at = %stage,
                        stage = %Stage::RolledBack,
                        reason = %err,
                        "Mutation rejected"
                    );
                }

                roll_back(&self.store, tx, &self.span).await;
                Err(err)
            }
        }
    }

    /// Steps 3 to 6. Advances `stage` as each step completes.
    async fn apply(
        &self,
        tx: &mut S::Tx,
        stage: &mut Stage,
        kind: MutationType,
        no_rekening: &str,
        nominal: i64,
        reference: &str,
    ) -> Result<Receipt, AppError> {
        let account = self
            .store
            .lock_account(&mut *tx, no_rekening)
            .await?
            .ok_or_else(|| AppError::AccountNotFound {
                no_rekening: no_rekening.to_string(),
            })?;
        *stage = Stage::AccountLoaded;

        if kind == MutationType::Debit && account.saldo < nominal {
            return Err(AppError::InsufficientFunds {
                saldo: account.saldo,
                nominal,
            });
        }
        if kind == MutationType::Credit && account.saldo.checked_add(nominal).is_none() {
            return Err(AppError::SaldoOverflow {
                saldo: account.saldo,
                nominal,
            });
        }
        *stage = Stage::Validated;

        let saldo = self
            .store
            .adjust_balance(Some(&mut *tx), account.id, kind.signed(nominal))
            .await?;
        *stage = Stage::BalanceUpdated;

        let mutation = self
            .store
            .record_mutation(
                Some(&mut *tx),
                NewMutation {
                    account_id: account.id,
                    nominal,
                    mutation_type: kind,
                    reference: reference.to_string(),
                },
            )
            .await?;
        *stage = Stage::MutationRecorded;

        Ok(Receipt {
            no_rekening: no_rekening.to_string(),
            saldo,
            mutation,
        })
    }
}
