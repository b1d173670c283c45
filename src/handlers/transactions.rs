//! Transaction HTTP handlers.
//!
//! - POST /api/account/tabung - Credit (deposit)
//! - POST /api/account/tarik - Debit (withdraw)

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    app::AppState,
    error::{AppError, RequestKind},
    models::mutation::{TransactionRequest, TransactionResponse},
    services::transaction_service::Receipt,
    store::LedgerStore,
};

fn parse(
    kind: RequestKind,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<TransactionRequest, AppError> {
    payload.map(|Json(request)| request).map_err(|rejection| {
        tracing::warn!(error = %rejection, "Error binding transaction request");
        AppError::MalformedRequest {
            kind,
            detail: rejection.body_text(),
        }
    })
}

fn respond(message: &'static str, receipt: Receipt) -> Json<TransactionResponse> {
    Json(TransactionResponse {
        message,
        no_rekening: receipt.no_rekening,
        saldo: receipt.saldo,
        mutation: receipt.mutation,
    })
}

/// Credit an account (tabung).
///
/// # Request Body
///
/// ```json
/// { "no_rekening": "000000000001", "nominal": 50000, "reference": "setor tunai" }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "message": "menabung successful",
///   "no_rekening": "000000000001",
///   "saldo": 50000,
///   "mutation": { "id": "…", "account_id": 1, "nominal": 50000, "type": "credit", … }
/// }
/// ```
pub async fn credit<S: LedgerStore + Clone>(
    State(state): State<AppState<S>>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let request = parse(RequestKind::Credit, payload)?;

    let receipt = state
        .transactions
        .credit(&request.no_rekening, request.nominal, &request.reference)
        .await?;

    Ok(respond("menabung successful", receipt))
}

/// Debit an account (tarik).
///
/// # Validation
///
/// - Account must exist
/// - Balance must cover `nominal`; otherwise 400 `ACCOUNT_INSUFFICIENT_SALDO`
pub async fn debit<S: LedgerStore + Clone>(
    State(state): State<AppState<S>>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, AppError> {
    let request = parse(RequestKind::Debit, payload)?;

    let receipt = state
        .transactions
        .debit(&request.no_rekening, request.nominal, &request.reference)
        .await?;

    Ok(respond("penarikan saldo successful", receipt))
}
