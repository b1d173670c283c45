//! In-memory ledger store for tests.
//!
//! Writes made inside a transaction are journaled on the handle and applied
//! only on commit, so a dropped or rolled back handle leaves no trace. Any
//! operation can be made to fail with [`MemoryLedgerStore::fail_at`].

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{AccountKey, LedgerStore, StoreError, UniqueField};
use crate::{
    error::{MAX_NAME_LEN, MAX_NIK_LEN, MAX_NO_HP_LEN},
    models::{
        account::{Account, NewAccount},
        mutation::{Mutation, NewMutation},
    },
};

/// Operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    FindAccount,
    LockAccount,
    CreateAccount,
    SetAccountNumber,
    AdjustBalance,
    RecordMutation,
    Commit,
    Rollback,
}

#[derive(Debug, Clone)]
enum Op {
    Insert(Account),
    SetNumber { account_id: i64, no_rekening: String },
    Adjust { account_id: i64, delta: i64 },
    Record(Mutation),
}

#[derive(Debug, Default)]
struct Ledger {
    accounts: BTreeMap<i64, Account>,
    mutations: Vec<Mutation>,
}

impl Ledger {
    fn apply(&mut self, op: Op) {
        match op {
            Op::Insert(account) => {
                self.accounts.insert(account.id, account);
            }
            Op::SetNumber {
                account_id,
                no_rekening,
            } => {
                // Only ever set in the creating transaction, so updated_at stays put
                if let Some(account) = self.accounts.get_mut(&account_id) {
                    account.no_rekening = Some(no_rekening);
                }
            }
            Op::Adjust { account_id, delta } => {
                if let Some(account) = self.accounts.get_mut(&account_id) {
                    account.saldo += delta;
                    account.updated_at = Utc::now();
                }
            }
            Op::Record(mutation) => self.mutations.push(mutation),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    ledger: Ledger,
    next_account_id: i64,
    faults: HashSet<FailPoint>,
    commits: usize,
    rollbacks: usize,
}

/// Transaction handle of [`MemoryLedgerStore`].
#[derive(Debug, Default)]
pub struct MemoryTx {
    ops: Vec<Op>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Mutex<Inner>>,
}

fn injected(point: FailPoint) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected failure at {point:?}"))
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    /// Make every later call of `point` fail until [`heal`](Self::heal).
    pub fn fail_at(&self, point: FailPoint) {
        self.lock().faults.insert(point);
    }

    pub fn heal(&self) {
        self.lock().faults.clear();
    }

    /// Start the id sequence after `id`.
    pub fn set_next_account_id(&self, id: i64) {
        self.lock().next_account_id = id;
    }

    pub fn account_count(&self) -> usize {
        self.lock().ledger.accounts.len()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().ledger.mutations.len()
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    fn check(inner: &Inner, point: FailPoint) -> Result<(), sqlx::Error> {
        if inner.faults.contains(&point) {
            Err(injected(point))
        } else {
            Ok(())
        }
    }

    /// Committed ledger with the writes journaled in `tx` applied on top.
    fn view(inner: &Inner, tx: Option<&MemoryTx>) -> Ledger {
        let mut ledger = Ledger {
            accounts: inner.ledger.accounts.clone(),
            mutations: inner.ledger.mutations.clone(),
        };
        for op in tx.iter().flat_map(|tx| tx.ops.iter()) {
            ledger.apply(op.clone());
        }
        ledger
    }

    /// Journal `op` in `tx`, or apply it right away when standalone.
    fn write(inner: &mut Inner, tx: Option<&mut MemoryTx>, op: Op) {
        match tx {
            Some(tx) => tx.ops.push(op),
            None => inner.ledger.apply(op),
        }
    }
}

fn unique_conflict(ledger: &Ledger, candidate: &Account) -> Option<UniqueField> {
    ledger.accounts.values().find_map(|existing| {
        if existing.nik == candidate.nik {
            Some(UniqueField::Nik)
        } else if existing.no_hp == candidate.no_hp {
            Some(UniqueField::NoHp)
        } else {
            None
        }
    })
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let inner = self.lock();
        Self::check(&inner, FailPoint::Begin).map_err(StoreError::Unavailable)?;
        Ok(MemoryTx::default())
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check(&inner, FailPoint::Commit).map_err(StoreError::Transaction)?;
        for op in tx.ops {
            inner.ledger.apply(op);
        }
        inner.commits += 1;
        Ok(())
    }

    async fn rollback(&self, _tx: Self::Tx) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.rollbacks += 1;
        Self::check(&inner, FailPoint::Rollback).map_err(StoreError::Transaction)
    }

    async fn find_account(&self, key: AccountKey<'_>) -> Result<Option<Account>, StoreError> {
        let inner = self.lock();
        Self::check(&inner, FailPoint::FindAccount).map_err(StoreError::Query)?;

        let found = inner.ledger.accounts.values().find(|account| match key {
            AccountKey::AccountNumber(v) => account.no_rekening.as_deref() == Some(v),
            AccountKey::Nik(v) => account.nik == v,
            AccountKey::NoHp(v) => account.no_hp == v,
        });
        Ok(found.cloned())
    }

    async fn lock_account(
        &self,
        tx: &mut Self::Tx,
        no_rekening: &str,
    ) -> Result<Option<Account>, StoreError> {
        let inner = self.lock();
        Self::check(&inner, FailPoint::LockAccount).map_err(StoreError::Query)?;

        let ledger = Self::view(&inner, Some(&*tx));
        Ok(ledger
            .accounts
            .into_values()
            .find(|account| account.no_rekening.as_deref() == Some(no_rekening)))
    }

    async fn create_account(
        &self,
        tx: Option<&mut Self::Tx>,
        account: NewAccount,
    ) -> Result<Account, StoreError> {
        let mut inner = self.lock();
        Self::check(&inner, FailPoint::CreateAccount).map_err(StoreError::InsertFailed)?;

        // Mirrors the VARCHAR widths of the accounts table
        if account.name.chars().count() > MAX_NAME_LEN
            || account.nik.chars().count() > MAX_NIK_LEN
            || account.no_hp.chars().count() > MAX_NO_HP_LEN
        {
            return Err(StoreError::InsertFailed(sqlx::Error::Protocol(
                "value too long for type character varying".to_string(),
            )));
        }

        let now = Utc::now();
        let candidate = Account {
            id: inner.next_account_id + 1,
            name: account.name,
            nik: account.nik,
            no_hp: account.no_hp,
            no_rekening: None,
            saldo: 0,
            created_at: now,
            updated_at: now,
        };

        let ledger = Self::view(&inner, tx.as_deref());
        if let Some(field) = unique_conflict(&ledger, &candidate) {
            return Err(StoreError::UniqueViolation { field });
        }

        // Ids are consumed even if the transaction rolls back, like a sequence
        inner.next_account_id = candidate.id;
        Self::write(&mut inner, tx, Op::Insert(candidate.clone()));
        Ok(candidate)
    }

    async fn set_account_number(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: i64,
        no_rekening: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        Self::check(&inner, FailPoint::SetAccountNumber).map_err(StoreError::InsertFailed)?;

        let ledger = Self::view(&inner, tx.as_deref());
        if !ledger.accounts.contains_key(&account_id) {
            return Err(StoreError::InsertFailed(sqlx::Error::RowNotFound));
        }
        let taken = ledger.accounts.values().any(|account| {
            account.id != account_id && account.no_rekening.as_deref() == Some(no_rekening)
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                field: UniqueField::NoRekening,
            });
        }

        Self::write(
            &mut inner,
            tx,
            Op::SetNumber {
                account_id,
                no_rekening: no_rekening.to_string(),
            },
        );
        Ok(())
    }

    async fn adjust_balance(
        &self,
        tx: Option<&mut Self::Tx>,
        account_id: i64,
        delta: i64,
    ) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        Self::check(&inner, FailPoint::AdjustBalance).map_err(StoreError::UpdateFailed)?;

        let ledger = Self::view(&inner, tx.as_deref());
        let current = ledger
            .accounts
            .get(&account_id)
            .map(|account| account.saldo)
            .ok_or(StoreError::UpdateFailed(sqlx::Error::RowNotFound))?;

        // Mirrors the saldo CHECK constraint and BIGINT range of the table
        let saldo = current
            .checked_add(delta)
            .filter(|saldo| *saldo >= 0)
            .ok_or_else(|| {
                StoreError::UpdateFailed(sqlx::Error::Protocol(
                    "saldo out of range".to_string(),
                ))
            })?;

        Self::write(&mut inner, tx, Op::Adjust { account_id, delta });
        Ok(saldo)
    }

    async fn record_mutation(
        &self,
        tx: Option<&mut Self::Tx>,
        mutation: NewMutation,
    ) -> Result<Mutation, StoreError> {
        let mut inner = self.lock();
        Self::check(&inner, FailPoint::RecordMutation).map_err(StoreError::RecordFailed)?;

        let ledger = Self::view(&inner, tx.as_deref());
        if !ledger.accounts.contains_key(&mutation.account_id) {
            return Err(StoreError::RecordFailed(sqlx::Error::RowNotFound));
        }

        let recorded = Mutation {
            id: Uuid::new_v4(),
            account_id: mutation.account_id,
            nominal: mutation.nominal,
            mutation_type: mutation.mutation_type,
            reference: mutation.reference,
            created_at: Utc::now(),
        };
        Self::write(&mut inner, tx, Op::Record(recorded.clone()));
        Ok(recorded)
    }

    async fn list_mutations(&self, account_id: i64) -> Result<Vec<Mutation>, StoreError> {
        let inner = self.lock();
        Self::check(&inner, FailPoint::FindAccount).map_err(StoreError::Query)?;

        // Insertion order is chronological; newest first
        Ok(inner
            .ledger
            .mutations
            .iter()
            .rev()
            .filter(|mutation| mutation.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let inner = self.lock();
        Self::check(&inner, FailPoint::Begin).map_err(StoreError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mutation::MutationType;

    fn new_account(nik: &str, no_hp: &str) -> NewAccount {
        NewAccount {
            name: "Ana".to_string(),
            nik: nik.to_string(),
            no_hp: no_hp.to_string(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_writes() {
        let store = MemoryLedgerStore::new();
        let account = store
            .create_account(None, new_account("111", "0812"))
            .await
            .unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            store
                .adjust_balance(Some(&mut tx), account.id, 500)
                .await
                .unwrap();
            store
                .record_mutation(
                    Some(&mut tx),
                    NewMutation {
                        account_id: account.id,
                        nominal: 500,
                        mutation_type: MutationType::Credit,
                        reference: String::new(),
                    },
                )
                .await
                .unwrap();
        }

        let stored = store
            .find_account(AccountKey::Nik("111"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.saldo, 0);
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn over_long_columns_fail_like_the_table() {
        let store = MemoryLedgerStore::new();

        let err = store
            .create_account(None, new_account(&"1".repeat(MAX_NIK_LEN + 1), "0812"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InsertFailed(_)));
        assert_eq!(store.account_count(), 0);
    }

    #[tokio::test]
    async fn transaction_reads_its_own_writes() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        let account = store
            .create_account(Some(&mut tx), new_account("111", "0812"))
            .await
            .unwrap();
        store
            .set_account_number(Some(&mut tx), account.id, "000000000001")
            .await
            .unwrap();

        let locked = store.lock_account(&mut tx, "000000000001").await.unwrap();
        assert_eq!(locked.map(|a| a.id), Some(account.id));
        assert!(
            store
                .find_account(AccountKey::AccountNumber("000000000001"))
                .await
                .unwrap()
                .is_none()
        );

        store.commit(tx).await.unwrap();
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_nik_and_no_hp_are_rejected() {
        let store = MemoryLedgerStore::new();
        store
            .create_account(None, new_account("111", "0812"))
            .await
            .unwrap();

        let nik = store
            .create_account(None, new_account("111", "0999"))
            .await
            .unwrap_err();
        let no_hp = store
            .create_account(None, new_account("222", "0812"))
            .await
            .unwrap_err();

        assert!(matches!(
            nik,
            StoreError::UniqueViolation {
                field: UniqueField::Nik
            }
        ));
        assert!(matches!(
            no_hp,
            StoreError::UniqueViolation {
                field: UniqueField::NoHp
            }
        ));
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn standalone_adjustment_applies_immediately() {
        let store = MemoryLedgerStore::new();
        let account = store
            .create_account(None, new_account("111", "0812"))
            .await
            .unwrap();

        let saldo = store.adjust_balance(None, account.id, 700).await.unwrap();
        assert_eq!(saldo, 700);
        let saldo = store.adjust_balance(None, account.id, -200).await.unwrap();
        assert_eq!(saldo, 500);
    }

    #[tokio::test]
    async fn fail_points_surface_store_errors() {
        let store = MemoryLedgerStore::new();
        store.fail_at(FailPoint::Begin);
        assert!(matches!(
            store.begin().await.unwrap_err(),
            StoreError::Unavailable(_)
        ));

        store.heal();
        assert!(store.begin().await.is_ok());
    }
}
