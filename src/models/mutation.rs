//! Mutation (ledger entry) models and transaction request/response types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a balance change.
///
/// Stored in the `mutation_type` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "mutation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    /// Deposit (tabung)
    Credit,
    /// Withdrawal (tarik)
    Debit,
}

impl MutationType {
    /// Sign applied to the nominal when adjusting the balance.
    pub fn signed(self, nominal: i64) -> i64 {
        match self {
            MutationType::Credit => nominal,
            MutationType::Debit => -nominal,
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationType::Credit => f.write_str("credit"),
            MutationType::Debit => f.write_str("debit"),
        }
    }
}

/// Represents a row in the append-only `mutations` table.
///
/// Each committed balance change has exactly one mutation with the same
/// magnitude. Rows are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Mutation {
    pub id: Uuid,

    /// Owning account (`accounts.id`)
    pub account_id: i64,

    /// Magnitude of the change, always positive
    pub nominal: i64,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub mutation_type: MutationType,

    /// Free text supplied by the caller, may be empty
    pub reference: String,

    pub created_at: DateTime<Utc>,
}

/// Insert payload for a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMutation {
    pub account_id: i64,
    pub nominal: i64,
    pub mutation_type: MutationType,
    pub reference: String,
}

/// Request body for `POST /api/account/tabung` and `POST /api/account/tarik`.
///
/// # JSON Example
///
/// ```json
/// {
///   "no_rekening": "000000000001",
///   "nominal": 50000,
///   "reference": "setor tunai"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct TransactionRequest {
    #[serde(default)]
    pub no_rekening: String,

    #[serde(default)]
    pub nominal: i64,

    #[serde(default)]
    pub reference: String,
}

/// Response body for a successful credit or debit.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub message: &'static str,
    pub no_rekening: String,

    /// Balance after the mutation was committed
    pub saldo: i64,

    pub mutation: Mutation,
}
