//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: Database entity representing an account holder
//! - `NewAccount`: Insert payload handed to the ledger store
//! - `CreateAccountRequest`: Request body for `POST /api/account/daftar`
//! - `SaldoResponse`: Response body for balance inquiries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. `nik`, `no_hp` and `no_rekening` are each
/// unique.
///
/// # Balance Storage
///
/// `saldo` is stored as `i64` in the smallest currency unit, never as a
/// float. It must be >= 0 after every committed mutation (also enforced by
/// a CHECK constraint).
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Internal row identifier assigned by the store
    pub id: i64,

    /// Account holder's display name
    pub name: String,

    /// National identity number
    pub nik: String,

    /// Phone number
    pub no_hp: String,

    /// Externally visible account number, zero padded and derived from `id`
    ///
    /// Only `None` inside the transaction that creates the account.
    pub no_rekening: Option<String>,

    /// Current balance
    pub saldo: i64,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of last balance update
    pub updated_at: DateTime<Utc>,
}

/// Values needed to insert an account. The store assigns everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub nik: String,
    pub no_hp: String,
}

/// Request body for creating a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Ana",
///   "nik": "3174000000000001",
///   "no_hp": "081200000000"
/// }
/// ```
///
/// Missing fields deserialize as empty strings so that the service can name
/// the offending field in its validation error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub nik: String,

    #[serde(default)]
    pub no_hp: String,
}

/// Response body for `GET /api/account/saldo/{no_rekening}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaldoResponse {
    pub no_rekening: String,
    pub saldo: i64,
}
