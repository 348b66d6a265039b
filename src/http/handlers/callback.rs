use crate::domain::callback::CallbackParams;
use crate::service::payment_service::err;
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Form, Json};
use std::collections::HashMap;

pub async fn callback_get(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    complete(state, CallbackParams::new(query)).await
}

/// Banks that post back send their fields in the form body while our own
/// `transaction_id` stays in the query string.
pub async fn callback_post(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let params = CallbackParams::new(query).merge(CallbackParams::new(form));
    complete(state, params).await
}

async fn complete(state: AppState, params: CallbackParams) -> axum::response::Response {
    match state.payment_service.complete(params).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "payment verification failed");
            let (status, body) = err(&e);
            (status, Json(body)).into_response()
        }
    }
}
