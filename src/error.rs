//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::store::{StoreError, UniqueField};

/// Column widths of `accounts.name`, `accounts.nik` and `accounts.no_hp`.
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_NIK_LEN: usize = 32;
pub const MAX_NO_HP_LEN: usize = 32;

/// A request field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Parameter Account name is empty")]
    NameEmpty,

    #[error("Parameter Account NIK is empty")]
    NikEmpty,

    #[error("Parameter Account No Hp is empty")]
    NoHpEmpty,

    #[error("Param No rekening empty")]
    NoRekeningEmpty,

    #[error("Param nominal must be greater than 0")]
    NominalNotPositive,

    #[error("Parameter Account name is longer than 255 characters")]
    NameTooLong,

    #[error("Parameter Account NIK is longer than 32 characters")]
    NikTooLong,

    #[error("Parameter Account No Hp is longer than 32 characters")]
    NoHpTooLong,
}

impl ValidationError {
    pub fn code(self) -> &'static str {
        match self {
            ValidationError::NameEmpty => "ACCOUNT_NAME_EMPTY",
            ValidationError::NikEmpty => "ACCOUNT_NIK_EMPTY",
            ValidationError::NoHpEmpty => "ACCOUNT_NO_HP_EMPTY",
            ValidationError::NoRekeningEmpty => "ACCOUNT_PARAM_NO_REKENING_EMPTY",
            ValidationError::NominalNotPositive => "ACCOUNT_PARAM_NOMINAL_LESS_THAN_ZERO",
            ValidationError::NameTooLong => "ACCOUNT_NAME_TOO_LONG",
            ValidationError::NikTooLong => "ACCOUNT_NIK_TOO_LONG",
            ValidationError::NoHpTooLong => "ACCOUNT_NO_HP_TOO_LONG",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            ValidationError::NameEmpty | ValidationError::NameTooLong => "name",
            ValidationError::NikEmpty | ValidationError::NikTooLong => "nik",
            ValidationError::NoHpEmpty | ValidationError::NoHpTooLong => "no_hp",
            ValidationError::NoRekeningEmpty => "no_rekening",
            ValidationError::NominalNotPositive => "nominal",
        }
    }
}

/// Which request body could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    CreateAccount,
    Credit,
    Debit,
}

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation Errors**: a required field is missing or invalid
/// - **Business Rule Errors**: duplicates, unknown account, insufficient funds
/// - **Infrastructure Errors**: anything the ledger store reports
///
/// Every variant has a machine readable [`code`](AppError::code), the
/// offending [`field`](AppError::field) and an optional typed
/// [`object`](AppError::object) with structured context.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// JSON body could not be deserialized.
    #[error("Invalid request body: {detail}")]
    MalformedRequest { kind: RequestKind, detail: String },

    #[error("Account with NIK is already exist")]
    DuplicateNationalId,

    #[error("Account with No HP is already exist")]
    DuplicatePhoneNumber,

    #[error("Account with No Rekening not found")]
    AccountNotFound { no_rekening: String },

    #[error("Saldo not enough / Insufficient balance")]
    InsufficientFunds { saldo: i64, nominal: i64 },

    /// Crediting `nominal` would take the balance past `i64::MAX`.
    #[error("Saldo would exceed the maximum balance")]
    SaldoOverflow { saldo: i64, nominal: i64 },

    /// The assigned id has more digits than an account number may hold.
    #[error("Account id {id} does not fit in a {width} digit account number")]
    AccountNumberOverflow { id: i64, width: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(err) => err.code(),
            AppError::MalformedRequest { kind, .. } => match kind {
                RequestKind::CreateAccount => "ACCOUNT_CREATE_INVALID_REQUEST",
                RequestKind::Credit => "CREDIT_INVALID_REQUEST",
                RequestKind::Debit => "DEBIT_INVALID_REQUEST",
            },
            AppError::DuplicateNationalId => "ACCOUNT_WITH_NIK_IS_EXIST",
            AppError::DuplicatePhoneNumber => "ACCOUNT_WITH_NO_HP_IS_EXIST",
            AppError::AccountNotFound { .. } => "ACCOUNT_WITH_NO_REK_NOT_FOUND",
            AppError::InsufficientFunds { .. } => "ACCOUNT_INSUFFICIENT_SALDO",
            AppError::SaldoOverflow { .. } => "ACCOUNT_SALDO_OVERFLOW",
            AppError::AccountNumberOverflow { .. } => "CREATE_ACCOUNT_ERROR",
            AppError::Store(err) => err.code(),
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            AppError::Validation(err) => err.field(),
            AppError::MalformedRequest { kind, .. } => match kind {
                RequestKind::CreateAccount => "name, nik, no_hp",
                RequestKind::Credit | RequestKind::Debit => "no_rekening, nominal",
            },
            AppError::DuplicateNationalId => "nik",
            AppError::DuplicatePhoneNumber => "no_hp",
            AppError::AccountNotFound { .. } => "no_rekening",
            AppError::InsufficientFunds { .. } | AppError::SaldoOverflow { .. } => "nominal",
            AppError::AccountNumberOverflow { .. } => "no_rekening",
            AppError::Store(StoreError::UniqueViolation { field }) => field.column(),
            AppError::Store(_) => "",
        }
    }

    /// Structured context for the client, if the variant carries any.
    pub fn object(&self) -> Option<Value> {
        match self {
            AppError::AccountNotFound { no_rekening } => Some(json!({ "no_rekening": no_rekening })),
            AppError::InsufficientFunds { saldo, nominal }
            | AppError::SaldoOverflow { saldo, nominal } => {
                Some(json!({ "saldo": saldo, "nominal": nominal }))
            }
            _ => None,
        }
    }

    /// True for failures of the service itself rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Store(_) | AppError::AccountNumberOverflow { .. }
        )
    }

    pub fn status(&self) -> StatusCode {
        if self.is_infrastructure() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    /// Translate a store uniqueness failure into the matching business error.
    pub(crate) fn from_unique(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation {
                field: UniqueField::Nik,
            } => AppError::DuplicateNationalId,
            StoreError::UniqueViolation {
                field: UniqueField::NoHp,
            } => AppError::DuplicatePhoneNumber,
            other => AppError::Store(other),
        }
    }
}

/// Build the `{"remark": {...}}` envelope used for every error response.
pub fn remark(
    status: StatusCode,
    code: &str,
    message: &str,
    field: &str,
    object: Option<Value>,
) -> Response {
    let body = Json(json!({
        "remark": {
            "message": message,
            "code": code,
            "field": field,
            "object": object,
        }
    }));

    (status, body).into_response()
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "remark": {
///     "message": "Saldo not enough / Insufficient balance",
///     "code": "ACCOUNT_INSUFFICIENT_SALDO",
///     "field": "nominal",
///     "object": { "saldo": 30000, "nominal": 999999 }
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - Validation and business rule errors → 400 Bad Request
/// - Store failures → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_infrastructure() {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        remark(
            self.status(),
            self.code(),
            &message,
            self.field(),
            self.object(),
        )
    }
}
