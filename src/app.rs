//! Router construction and shared handler state.

use std::any::Any;

use axum::{
    Router,
    http::{HeaderName, StatusCode},
    response::Response,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    error::remark,
    handlers,
    services::{
        account_service::AccountService, query_service::QueryService,
        transaction_service::TransactionService,
    },
    store::LedgerStore,
};

/// State shared with every handler via `State` extraction.
#[derive(Debug, Clone)]
pub struct AppState<S> {
    pub accounts: AccountService<S>,
    pub transactions: TransactionService<S>,
    pub queries: QueryService<S>,
    pub store: S,
}

impl<S: LedgerStore + Clone> AppState<S> {
    /// Wire every service to `store`, each under its own span.
    pub fn new(store: S, account_number_width: usize) -> Self {
        Self {
            accounts: AccountService::new(
                store.clone(),
                account_number_width,
                tracing::info_span!("account_service"),
            ),
            transactions: TransactionService::new(
                store.clone(),
                tracing::info_span!("transaction_service"),
            ),
            queries: QueryService::new(store.clone(), tracing::info_span!("query_service")),
            store,
        }
    }
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    remark(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred",
        "",
        None,
    )
}

/// Build the HTTP router.
///
/// # Routes
///
/// - `POST /api/account/daftar` - open an account
/// - `POST /api/account/tabung` - credit
/// - `POST /api/account/tarik` - debit
/// - `GET /api/account/saldo/{no_rekening}` - balance
/// - `GET /api/account/mutasi/{no_rekening}` - mutation history
/// - `GET /api/account/{no_rekening}` - account details
/// - `GET /health` - liveness
pub fn build_app<S: LedgerStore + Clone>(state: AppState<S>) -> Router {
    let request_id = HeaderName::from_static("x-request-id");

    let api = Router::new()
        .route("/daftar", post(handlers::accounts::create_account::<S>))
        .route("/tabung", post(handlers::transactions::credit::<S>))
        .route("/tarik", post(handlers::transactions::debit::<S>))
        .route("/saldo/{no_rekening}", get(handlers::accounts::get_saldo::<S>))
        .route(
            "/mutasi/{no_rekening}",
            get(handlers::accounts::list_mutations::<S>),
        )
        .route("/{no_rekening}", get(handlers::accounts::get_account::<S>));

    Router::new()
        .route("/health", get(handlers::health::health_check::<S>))
        .nest("/api/account", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}
