//! REST API for the points service.
//!
//! Endpoints:
//! - `GET /points`: total balance across payers
//! - `GET /points/BalanceDetail`: balance per payer
//! - `GET /points/ledger/{payer}`: a payer's unconsumed entries
//! - `POST /points/add`: record one transaction
//! - `POST /points/addMultiple`: record a batch of transactions
//! - `POST /points/Spend`: spend from the oldest credits first
//! - `GET /health`: health check

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::ledger::{
    DebitRecord, LedgerEntry, LedgerError, Points, SpendPolicy, Timestamp, Transaction,
};
use crate::service::PointsService;

pub const ADDED_MESSAGE: &str = "Successfully Added";
pub const INVALID_TRANSACTION_MESSAGE: &str = "Invalid transaction data";
pub const INVALID_SPEND_MESSAGE: &str = "Invalid spend amount";

/// Build the axum router (separated for testing).
pub fn router(service: PointsService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/points", get(total_balance))
        .route("/points/BalanceDetail", get(balance_detail))
        .route("/points/ledger/:payer", get(payer_ledger))
        .route("/points/add", post(add))
        .route("/points/addMultiple", post(add_multiple))
        .route("/points/Spend", post(spend))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

// ============================================================================
// Wire types
// ============================================================================

/// Transaction as posted by clients. A missing payer is rejected by the
/// ledger the same way an empty one is.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRequest {
    #[serde(default)]
    pub payer: Option<String>,
    pub points: Points,
    pub timestamp: Timestamp,
}

impl From<TransactionRequest> for Transaction {
    fn from(request: TransactionRequest) -> Self {
        Transaction::new(request.payer.unwrap_or_default(), request.points, request.timestamp)
    }
}

/// Spend amount, either a bare integer or `{"points": n}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum SpendRequest {
    Amount(Points),
    Body { points: Points },
}

impl SpendRequest {
    pub fn points(self) -> Points {
        match self {
            SpendRequest::Amount(points) | SpendRequest::Body { points } => points,
        }
    }
}

/// Error response: status plus a plain-text message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidTransaction(_) => Self::bad_request(INVALID_TRANSACTION_MESSAGE),
            LedgerError::InvalidSpend(points) => {
                Self::bad_request(format!("{INVALID_SPEND_MESSAGE}: {points}"))
            }
            LedgerError::BalanceOverflow { .. } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: err.to_string(),
            },
            LedgerError::InsufficientBalance { .. } => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn total_balance(State(service): State<PointsService>) -> Json<Points> {
    Json(service.total_balance().await)
}

async fn balance_detail(State(service): State<PointsService>) -> Json<BTreeMap<String, Points>> {
    Json(service.balance_detail().await)
}

async fn payer_ledger(
    State(service): State<PointsService>,
    Path(payer): Path<String>,
) -> Result<Json<Vec<LedgerEntry>>, StatusCode> {
    service
        .ledger(&payer)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn add(
    State(service): State<PointsService>,
    payload: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "malformed transaction body");
        ApiError::bad_request(INVALID_TRANSACTION_MESSAGE)
    })?;
    service.add(request.into()).await?;
    Ok(ADDED_MESSAGE)
}

async fn add_multiple(
    State(service): State<PointsService>,
    payload: Result<Json<Vec<TransactionRequest>>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(requests) = payload.map_err(|rejection| {
        debug!(error = %rejection, "malformed transaction batch");
        ApiError::bad_request(INVALID_TRANSACTION_MESSAGE)
    })?;
    let transactions = requests.into_iter().map(Transaction::from).collect();
    service.add_multiple(transactions).await?;
    Ok(ADDED_MESSAGE)
}

/// A short pool is not an error under the partial policy: the caller gets
/// the debits that were drawn and compares them against the request.
async fn spend(
    State(service): State<PointsService>,
    payload: Result<Json<SpendRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<DebitRecord>>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "malformed spend body");
        ApiError::bad_request(INVALID_SPEND_MESSAGE)
    })?;

    match service.spend(request.points()).await {
        Ok(debits) => Ok((StatusCode::OK, Json(debits))),
        Err(LedgerError::InsufficientBalance { debits, .. }) => {
            let status = match service.spend_policy().await {
                SpendPolicy::Partial => StatusCode::OK,
                SpendPolicy::AllOrNothing => StatusCode::CONFLICT,
            };
            Ok((status, Json(debits)))
        }
        Err(err) => Err(err.into()),
    }
}
