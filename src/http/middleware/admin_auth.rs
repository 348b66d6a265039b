use crate::error::GatewayError;
use crate::service::payment_service::error_response;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

pub const INTERNAL_API_KEY_HEADER: &str = "X-Internal-Api-Key";

/// Guards transaction lookups, which expose card digits and bank references.
/// An empty configured key locks the routes instead of opening them.
pub async fn require_internal_api_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(INTERNAL_API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());
    let header_present = provided.is_some();
    let authorized = !expected.is_empty() && provided == Some(expected.as_str());

    if !authorized {
        tracing::warn!(path = %request.uri().path(), header_present, "internal api key rejected");
        return error_response(&GatewayError::Unauthorized);
    }

    next.run(request).await
}
