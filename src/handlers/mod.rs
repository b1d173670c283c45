//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params)
//! 2. Calls a service from the shared `AppState`
//! 3. Returns HTTP response (JSON, status code)
//!
//! Handlers are generic over the ledger store so tests can drive the real
//! router against an in-memory store.

/// Account management endpoints
pub mod accounts;
/// Service health endpoint
pub mod health;
/// Credit and debit endpoints
pub mod transactions;
