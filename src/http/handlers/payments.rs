use crate::domain::payment::CreatePaymentRequest;
use crate::service::payment_service::err;
use crate::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse};
use axum::Json;

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
}

pub async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    match state.payment_service.start(req, client_ip(&headers)).await {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let (status, body) = err(&e);
            (status, Json(body)).into_response()
        }
    }
}

/// Same as `create_payment` but answers with the auto-submitting form that
/// forwards the browser to the bank.
pub async fn redirect_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    match state.payment_service.start(req, client_ip(&headers)).await {
        Ok(resp) => (axum::http::StatusCode::OK, Html(resp.redirect.to_html())).into_response(),
        Err(e) => {
            let (status, body) = err(&e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}
