use crate::domain::transaction::{LogEntry, Transaction};
use crate::error::{GatewayError, Result};
use crate::service::payment_service::error_response;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub transaction: Transaction,
    pub logs: Vec<LogEntry>,
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i64>,
) -> Response {
    match load(&state, transaction_id).await {
        Ok(view) => (axum::http::StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn load(state: &AppState, transaction_id: i64) -> Result<TransactionView> {
    let store = &state.payment_service.resolver.store;
    let transaction = store
        .find(transaction_id)
        .await?
        .ok_or(GatewayError::NotFoundTransaction)?;
    let logs = store.logs(transaction_id).await?;
    Ok(TransactionView { transaction, logs })
}
