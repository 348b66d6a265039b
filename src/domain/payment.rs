use crate::domain::transaction::{PortName, TransactionStatus};
use crate::gateways::RedirectTarget;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatePaymentRequest {
    pub gateway: String,
    /// Rials.
    pub amount: i64,
    pub callback_url: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentResponse {
    pub transaction_id: i64,
    pub gateway: PortName,
    pub ref_id: Option<String>,
    pub redirect: RedirectTarget,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    pub transaction_id: i64,
    pub gateway: PortName,
    pub status: TransactionStatus,
    pub ref_id: Option<String>,
    pub tracking_code: Option<String>,
    pub card_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
