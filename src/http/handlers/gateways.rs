use crate::domain::transaction::PortName;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GatewayView {
    pub gateway: PortName,
    pub redirect_method: &'static str,
}

pub async fn list_gateways(State(state): State<AppState>) -> impl IntoResponse {
    let resp: Vec<GatewayView> = state
        .payment_service
        .resolver
        .supported_ports()
        .iter()
        .map(|p| GatewayView {
            gateway: *p,
            redirect_method: match p {
                PortName::Saman | PortName::AsanPardakht => "POST",
                PortName::Payline | PortName::Zarinpal => "GET",
            },
        })
        .collect();
    (axum::http::StatusCode::OK, Json(resp))
}
