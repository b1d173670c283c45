//! Ledger store: persistence for accounts and mutations.
//!
//! [`LedgerStore`] is the seam between the services and the database. The
//! production implementation is [`PgLedgerStore`]; tests use an in-memory
//! store that can be told to fail at any step.
//!
//! Operations that write take an optional transaction handle. With `Some`
//! the write joins that transaction, with `None` it runs standalone against
//! the pool.
//!
//! Dropping a transaction handle without committing it rolls it back, so a
//! handle acquired with [`LedgerStore::begin`] is released on every exit
//! path, panics included.

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgLedgerStore;

use async_trait::async_trait;

use crate::models::{
    account::{Account, NewAccount},
    mutation::{Mutation, NewMutation},
};

/// Column an account can be looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKey<'a> {
    AccountNumber(&'a str),
    Nik(&'a str),
    NoHp(&'a str),
}

impl AccountKey<'_> {
    pub fn column(&self) -> &'static str {
        match self {
            AccountKey::AccountNumber(_) => "no_rekening",
            AccountKey::Nik(_) => "nik",
            AccountKey::NoHp(_) => "no_hp",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            AccountKey::AccountNumber(v) | AccountKey::Nik(v) | AccountKey::NoHp(v) => v,
        }
    }
}

/// Unique account column that rejected an insert or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Nik,
    NoHp,
    NoRekening,
}

impl UniqueField {
    pub fn column(self) -> &'static str {
        match self {
            UniqueField::Nik => "nik",
            UniqueField::NoHp => "no_hp",
            UniqueField::NoRekening => "no_rekening",
        }
    }
}

/// Failures reported by a [`LedgerStore`].
///
/// "Not found" is never an error here; lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A transaction (or connection) could not be started.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A read query failed.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("unique constraint violated on {}", field.column())]
    UniqueViolation { field: UniqueField },

    #[error("account insert failed: {0}")]
    InsertFailed(#[source] sqlx::Error),

    #[error("balance update failed: {0}")]
    UpdateFailed(#[source] sqlx::Error),

    #[error("mutation insert failed: {0}")]
    RecordFailed(#[source] sqlx::Error),

    /// Commit or rollback failed.
    #[error("transaction error: {0}")]
    Transaction(#[source] sqlx::Error),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "CREATE_TRANSACTION_DB_ERROR",
            StoreError::Query(_) => "GET_ACCOUNT_ERROR",
            StoreError::UniqueViolation { .. } | StoreError::InsertFailed(_) => {
                "CREATE_ACCOUNT_ERROR"
            }
            StoreError::UpdateFailed(_) => "UPDATE_SALDO_ERROR",
            StoreError::RecordFailed(_) => "CREATE_MUTATION_ERROR",
            StoreError::Transaction(_) => "COMMIT_TRANSACTION_DB_ERROR",
        }
    }
}

/// Atomic read/write primitives over accounts and mutations.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Transaction handle. Dropping it uncommitted rolls it back.
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Committed account matching `key`, outside of any transaction.
    async fn find_account(&self, key: AccountKey<'_>) -> Result<Option<Account>, StoreError>;

    /// Account by number, read inside `tx` with a row lock held until the
    /// transaction ends.
    async fn lock_account(
        &self,
        tx: &mut Self::Tx,
        no_rekening: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Insert an account with a zero balance; the store assigns id and
    /// timestamps.
    async fn create_account(
        &self,
        tx: Option<&mut Self::Tx>,
        account: NewAccount,
    ) -> Result<Account, StoreError>;

    async fn set_account_number(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: i64,
        no_rekening: &str,
    ) -> Result<(), StoreError>;

    /// `saldo := saldo + delta`. Returns the new balance.
    ///
    /// Does not check that the result is non-negative; callers validate
    /// before adjusting.
    async fn adjust_balance(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: i64,
        delta: i64,
    ) -> Result<i64, StoreError>;

    async fn record_mutation(
        &self,
        tx: Option<&mut Self::Tx>,
        mutation: NewMutation,
    ) -> Result<Mutation, StoreError>;

    /// Mutations of one account, newest first.
    async fn list_mutations(&self, account_id: i64) -> Result<Vec<Mutation>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
