use crate::domain::callback::CallbackParams;
use crate::domain::payment::{
    CreatePaymentRequest, CreatePaymentResponse, ErrorEnvelope, ErrorPayload, VerifyPaymentResponse,
};
use crate::domain::transaction::TransactionStatus;
use crate::error::{GatewayError, Result};
use crate::gateways::Port;
use crate::resolver::GatewayResolver;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Clone)]
pub struct PaymentService {
    pub resolver: GatewayResolver,
}

impl PaymentService {
    /// Opens a payment session with the requested bank and returns where
    /// to send the user.
    pub async fn start(
        &self,
        req: CreatePaymentRequest,
        client_ip: Option<String>,
    ) -> Result<CreatePaymentResponse> {
        if req.amount <= 0 {
            return Err(GatewayError::InvalidAmount(req.amount));
        }

        let mut port = self.resolver.make(&req.gateway)?;
        port.set(req.amount);
        port.set_client_ip(client_ip);
        if let Some(url) = req.callback_url {
            port.set_callback(url);
        }
        if let Some(description) = req.description {
            port.set_description(description);
        }
        if let Some(email) = req.email {
            port.set_email(email);
        }
        if let Some(mobile) = req.mobile {
            port.set_mobile(mobile);
        }

        port.ready().await?;
        let redirect = port.redirect()?;
        let transaction_id = port.transaction_id().ok_or(GatewayError::NotFoundTransaction)?;

        tracing::info!(
            gateway = %port.port_name(),
            transaction_id,
            "payment session opened"
        );

        Ok(CreatePaymentResponse {
            transaction_id,
            gateway: port.port_name(),
            ref_id: port.ref_id().map(str::to_string),
            redirect,
        })
    }

    /// Handles the bank's redirect back to us.
    pub async fn complete(&self, params: CallbackParams) -> Result<VerifyPaymentResponse> {
        let port = self.resolver.verify(&params).await?;
        Ok(verified(port.as_ref()))
    }
}

fn verified(port: &dyn Port) -> VerifyPaymentResponse {
    VerifyPaymentResponse {
        transaction_id: port.transaction_id().unwrap_or_default(),
        gateway: port.port_name(),
        status: TransactionStatus::Succeed,
        ref_id: port.ref_id().map(str::to_string),
        tracking_code: port.tracking_code().map(str::to_string),
        card_number: port.card_number().map(str::to_string),
    }
}

pub fn error_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidRequest | GatewayError::InvalidAmount(_) | GatewayError::Config(_) => {
            StatusCode::BAD_REQUEST
        }
        GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
        GatewayError::NotFoundTransaction | GatewayError::PortNotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::Retry => StatusCode::CONFLICT,
        GatewayError::Bank { .. } | GatewayError::Cipher(_) => StatusCode::UNPROCESSABLE_ENTITY,
        GatewayError::SoapFault(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Transport(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn err(error: &GatewayError) -> (StatusCode, ErrorEnvelope) {
    let details = match error {
        GatewayError::Storage(e) => Some(format!("{e:#}")),
        _ => None,
    };
    (
        error_status(error),
        ErrorEnvelope {
            error: ErrorPayload {
                code: error.code(),
                message: error.to_string(),
                details,
            },
        },
    )
}

pub fn error_response(error: &GatewayError) -> Response {
    let (status, body) = err(error);
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::PortName;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(error_status(&GatewayError::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(error_status(&GatewayError::InvalidAmount(0)), StatusCode::BAD_REQUEST);
        assert_eq!(error_status(&GatewayError::Retry), StatusCode::CONFLICT);
        assert_eq!(
            error_status(&GatewayError::bank(PortName::Saman, "-18", "bad ip")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let (status, body) = err(&GatewayError::PortNotFound("mellat".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error.code, "GATEWAY_NOT_FOUND");
    }
}
