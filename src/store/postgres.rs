//! PostgreSQL-backed ledger store.
//!
//! ## Error Mapping
//!
//! | Operation | SQLx failure | StoreError |
//! |-----------|--------------|------------|
//! | `begin`, `ping` | any | `Unavailable` |
//! | lookups, `list_mutations` | any | `Query` |
//! | account insert / number update | unique violation (`23505`) | `UniqueViolation` |
//! | account insert / number update | other | `InsertFailed` |
//! | `adjust_balance` | any, or no row updated | `UpdateFailed` |
//! | `record_mutation` | any | `RecordFailed` |
//! | `commit`, `rollback` | any | `Transaction` |

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::Span;

use super::{AccountKey, LedgerStore, StoreError, UniqueField};
use crate::{
    db::DbPool,
    models::{
        account::{Account, NewAccount},
        mutation::{Mutation, NewMutation},
    },
};

const ACCOUNT_COLUMNS: &str =
    "id, name, nik, no_hp, no_rekening, saldo, created_at, updated_at";

const MUTATION_COLUMNS: &str = "id, account_id, nominal, type, reference, created_at";

/// Ledger store over a PostgreSQL pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: DbPool,
    span: Span,
}

impl PgLedgerStore {
    /// `span` is the parent of every event this store logs.
    pub fn new(pool: DbPool, span: Span) -> Self {
        Self { pool, span }
    }

    fn fail(&self, operation: &'static str, err: &sqlx::Error) {
        tracing::error!(parent: &self.span, operation, error = %err, "Ledger store operation failed");
    }
}

/// Map an insert/update on `accounts` to `UniqueViolation` when a unique
/// constraint rejected it.
fn map_account_write(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("accounts_nik_key") => UniqueField::Nik,
                Some("accounts_no_hp_key") => UniqueField::NoHp,
                _ => UniqueField::NoRekening,
            };
            return StoreError::UniqueViolation { field };
        }
    }
    StoreError::InsertFailed(err)
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.pool.begin().await.map_err(|err| {
            self.fail("begin", &err);
            StoreError::Unavailable(err)
        })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        // A failed commit drops the handle, which queues a rollback
        tx.commit().await.map_err(|err| {
            self.fail("commit", &err);
            StoreError::Transaction(err)
        })
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.rollback().await.map_err(|err| {
            self.fail("rollback", &err);
            StoreError::Transaction(err)
        })
    }

    async fn find_account(&self, key: AccountKey<'_>) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {} = $1",
            key.column()
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(key.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                self.fail("find_account", &err);
                StoreError::Query(err)
            })
    }

    async fn lock_account(
        &self,
        tx: &mut Self::Tx,
        no_rekening: &str,
    ) -> Result<Option<Account>, StoreError> {
        // FOR UPDATE keeps concurrent debits on this row serialized until commit
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE no_rekening = $1 FOR UPDATE");

        sqlx::query_as::<_, Account>(&sql)
            .bind(no_rekening)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|err| {
                self.fail("lock_account", &err);
                StoreError::Query(err)
            })
    }

    async fn create_account(
        &self,
        tx: Option<&mut Self::Tx>,
        account: NewAccount,
    ) -> Result<Account, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO accounts (name, nik, no_hp, saldo)
            VALUES ($1, $2, $3, 0)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let query = sqlx::query_as::<_, Account>(&sql)
            .bind(account.name)
            .bind(account.nik)
            .bind(account.no_hp);

        let result = match tx {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        };

        result.map_err(|err| {
            self.fail("create_account", &err);
            map_account_write(err)
        })
    }

    async fn set_account_number(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: i64,
        no_rekening: &str,
    ) -> Result<(), StoreError> {
        let query = sqlx::query(
            r#"
            UPDATE accounts
            SET no_rekening = $1,
                updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(no_rekening)
        .bind(account_id);

        let result = match tx {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        };

        match result {
            Ok(done) if done.rows_affected() == 1 => Ok(()),
            Ok(_) => {
                let err = sqlx::Error::RowNotFound;
                self.fail("set_account_number", &err);
                Err(StoreError::InsertFailed(err))
            }
            Err(err) => {
                self.fail("set_account_number", &err);
                Err(map_account_write(err))
            }
        }
    }

    async fn adjust_balance(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: i64,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let query = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE accounts
            SET saldo = saldo + $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING saldo
            "#,
        )
        .bind(delta)
        .bind(account_id);

        let result = match tx {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        };

        result
            .and_then(|saldo| saldo.ok_or(sqlx::Error::RowNotFound))
            .map_err(|err| {
                self.fail("adjust_balance", &err);
                StoreError::UpdateFailed(err)
            })
    }

    async fn record_mutation(
        &self,
        tx: Option<&mut Self::Tx>,
        mutation: NewMutation,
    ) -> Result<Mutation, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO mutations (account_id, nominal, type, reference)
            VALUES ($1, $2, $3, $4)
            RETURNING {MUTATION_COLUMNS}
            "#
        );

        let query = sqlx::query_as::<_, Mutation>(&sql)
            .bind(mutation.account_id)
            .bind(mutation.nominal)
            .bind(mutation.mutation_type)
            .bind(mutation.reference);

        let result = match tx {
            Some(tx) => query.fetch_one(&mut **tx).await,
            None => query.fetch_one(&self.pool).await,
        };

        result.map_err(|err| {
            self.fail("record_mutation", &err);
            StoreError::RecordFailed(err)
        })
    }

    async fn list_mutations(&self, account_id: i64) -> Result<Vec<Mutation>, StoreError> {
        let sql = format!(
            "SELECT {MUTATION_COLUMNS} FROM mutations WHERE account_id = $1 ORDER BY created_at DESC, id"
        );

        sqlx::query_as::<_, Mutation>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                self.fail("list_mutations", &err);
                StoreError::Query(err)
            })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|err| {
                self.fail("ping", &err);
                StoreError::Unavailable(err)
            })
    }
}
