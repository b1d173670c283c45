//! Account HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/account/daftar - Open a new account
//! - GET /api/account/saldo/{no_rekening} - Balance inquiry
//! - GET /api/account/mutasi/{no_rekening} - Mutation history
//! - GET /api/account/{no_rekening} - Account details

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    app::AppState,
    error::{AppError, RequestKind},
    models::{
        account::{Account, CreateAccountRequest, SaldoResponse},
        mutation::Mutation,
    },
    store::LedgerStore,
};

/// Open a new account.
///
/// # Request Body
///
/// ```json
/// { "name": "Ana", "nik": "111", "no_hp": "0812" }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the created account, `saldo` 0 and a
///   generated `no_rekening`
/// - **Error (400)**: empty field, malformed body, nik or no_hp taken
/// - **Error (500)**: database error
pub async fn create_account<S: LedgerStore + Clone>(
    State(state): State<AppState<S>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Error param request");
        AppError::MalformedRequest {
            kind: RequestKind::CreateAccount,
            detail: rejection.body_text(),
        }
    })?;

    let account = state.accounts.create_account(request).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Balance of one account.
///
/// # Response (200 OK)
///
/// ```json
/// { "no_rekening": "000000000001", "saldo": 30000 }
/// ```
pub async fn get_saldo<S: LedgerStore + Clone>(
    State(state): State<AppState<S>>,
    Path(no_rekening): Path<String>,
) -> Result<Json<SaldoResponse>, AppError> {
    let saldo = state.queries.get_balance(&no_rekening).await?;
    Ok(Json(saldo))
}

/// Mutations of one account, newest first.
pub async fn list_mutations<S: LedgerStore + Clone>(
    State(state): State<AppState<S>>,
    Path(no_rekening): Path<String>,
) -> Result<Json<Vec<Mutation>>, AppError> {
    let mutations = state.queries.list_mutations(&no_rekening).await?;
    Ok(Json(mutations))
}

pub async fn get_account<S: LedgerStore + Clone>(
    State(state): State<AppState<S>>,
    Path(no_rekening): Path<String>,
) -> Result<Json<Account>, AppError> {
    let account = state.queries.get_account(&no_rekening).await?;
    Ok(Json(account))
}
