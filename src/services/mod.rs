//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! Each one owns a ledger store handle and a `tracing::Span` given at
//! construction; everything a service logs is emitted under that span.

pub mod account_service;
pub mod query_service;
pub mod transaction_service;

use tracing::Span;

use crate::store::LedgerStore;

/// Roll back `tx` after a failed unit of work.
///
/// Best effort: a rollback failure is logged and otherwise ignored so it
/// never replaces the error that caused the rollback.
pub(crate) async fn roll_back<S: LedgerStore>(store: &S, tx: S::Tx, span: &Span) {
    if let Err(err) = store.rollback(tx).await {
        tracing::error!(parent: span, error = %err, "Error rolling back transaction");
    }
}
