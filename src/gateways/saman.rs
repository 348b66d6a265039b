use crate::config::GatewaysConfig;
use crate::domain::callback::CallbackParams;
use crate::domain::transaction::{PortName, Transaction};
use crate::error::Result;
use crate::gateways::lifecycle::PortState;
use crate::gateways::soap::SoapClient;
use crate::gateways::{Port, RedirectTarget};
use crate::repo::transactions_repo::TransactionStore;
use std::sync::Arc;

const SOAP_NAMESPACE: &str = "urn:Foo";

/// Saman Electronic Payment (SEP). The session is opened by the browser form
/// itself; the server side only verifies and, on amount mismatch, reverses.
pub struct SamanGateway {
    state: PortState,
}

impl SamanGateway {
    pub fn new(
        config: Arc<GatewaysConfig>,
        store: Arc<dyn TransactionStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            state: PortState::new(PortName::Saman, config, store, client),
        }
    }

    fn soap(&self) -> SoapClient {
        SoapClient {
            endpoint: self.state.config.saman.soap_url.clone(),
            namespace: SOAP_NAMESPACE.to_string(),
            timeout_ms: self.state.config.timeout_ms,
            client: self.state.client.clone(),
        }
    }

    async fn user_payment(&mut self, params: &CallbackParams) -> Result<()> {
        self.state.ref_id = params.get("RefNum").map(str::to_string);
        self.state.tracking_code = params
            .get("TRACENO")
            .or_else(|| params.get("ResNum"))
            .map(str::to_string);
        let state = params.get("State").unwrap_or_default();

        if state == "OK" {
            return Ok(());
        }

        let code = params.get("StateCode").unwrap_or(state);
        Err(self.state.fail(code, error_message(state)).await)
    }

    async fn verify_payment(&mut self) -> Result<()> {
        let Some(ref_num) = self.state.ref_id.clone() else {
            return Err(self.state.fail("-7", error_message("-7")).await);
        };
        let merchant = self.state.config.saman.merchant.clone();
        let soap = self.soap();

        let response = match soap
            .call(
                "VerifyTransaction",
                &[("String1", ref_num.clone()), ("String2", merchant.clone())],
            )
            .await
        {
            Ok(r) => r,
            Err(e) => return Err(self.state.fail_with("SoapFault", e).await),
        };

        let paid = response
            .field("result")
            .or_else(|| response.field("VerifyTransactionResult"))
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v as i64);
        let Some(paid) = paid else {
            return Err(self.state.fail("-1", error_message("-1")).await);
        };

        if paid == self.state.amount {
            self.state.transaction_succeed().await?;
            return Ok(());
        }

        if paid <= 0 {
            let code = paid.to_string();
            return Err(self.state.fail(code.clone(), error_message(&code)).await);
        }

        tracing::warn!(
            transaction_id = ?self.state.transaction_id,
            paid,
            expected = self.state.amount,
            "saman amount mismatch, reversing"
        );
        let reversed = match soap
            .call(
                "ReverseTransaction",
                &[
                    ("String1", ref_num),
                    ("String2", merchant),
                    ("Password", self.state.config.saman.password.clone()),
                    ("Amount", paid.to_string()),
                ],
            )
            .await
        {
            Ok(r) => r,
            Err(e) => return Err(self.state.fail_with("SoapFault", e).await),
        };

        let code = reversed
            .field("result")
            .or_else(|| reversed.field("ReverseTransactionResult"))
            .unwrap_or_else(|| "-1".to_string());
        let message = if code == "1" {
            "Paid amount did not match the order; the payment was reversed."
        } else {
            error_message(&code)
        };
        Err(self.state.fail(code, message).await)
    }
}

#[async_trait::async_trait]
impl Port for SamanGateway {
    fn state(&self) -> &PortState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PortState {
        &mut self.state
    }

    async fn ready(&mut self) -> Result<()> {
        self.state.new_transaction().await?;
        Ok(())
    }

    fn redirect(&self) -> Result<RedirectTarget> {
        Ok(RedirectTarget::post(
            self.gateway_url()?,
            self.redirect_parameters()?,
        ))
    }

    async fn verify(&mut self, transaction: &Transaction, params: &CallbackParams) -> Result<()> {
        self.state.load(transaction);
        self.user_payment(params).await?;
        self.verify_payment().await
    }

    fn callback(&self) -> Result<String> {
        self.state
            .callback_with_id(&self.state.config.saman.callback_url)
    }

    fn gateway_url(&self) -> Result<String> {
        Ok(self.state.config.saman.gate_url.clone())
    }

    fn redirect_parameters(&self) -> Result<Vec<(String, String)>> {
        Ok(vec![
            ("Amount".to_string(), self.state.amount.to_string()),
            ("MID".to_string(), self.state.config.saman.merchant.clone()),
            ("ResNum".to_string(), self.state.transaction_id()?.to_string()),
            ("RedirectURL".to_string(), self.callback()?),
        ])
    }
}

/// Messages for callback `State` values and verify/reverse result codes.
pub fn error_message(code: &str) -> &'static str {
    match code {
        "Canceled By User" => "The payment was cancelled by the user.",
        "Invalid Amount" => "The reversal amount exceeds the original amount.",
        "Invalid Transaction" => "The reversal request does not match an original transaction.",
        "Invalid Card Number" => "The card number is invalid.",
        "No Such Issuer" => "The card issuer does not exist.",
        "Expired Card Pick Up" => "The card has expired.",
        "Allowable PIN Tries Exceeded Pick Up" => "The PIN was entered incorrectly too many times.",
        "Incorrect PIN" => "The PIN is incorrect.",
        "Exceeds Withdrawal Amount Limit" => "The amount exceeds the withdrawal limit.",
        "Transaction Cannot Be Completed" => "The transaction cannot be completed.",
        "Response Received Too Late" => "The transaction timed out at the bank.",
        "Suspected Fraud Pick Up" => "CVV2 or expiry date is incorrect.",
        "No Sufficient Funds" => "Insufficient funds.",
        "Issuer Down Slm" => "The card issuer's system is unavailable.",
        "TME Error" => "Unknown bank error.",
        "-1" => "Error while processing the submitted data.",
        "-3" => "Inputs contain invalid characters.",
        "-4" => "Merchant authentication failed.",
        "-6" => "The receipt was already fully reversed or the 30 minute window has passed.",
        "-7" => "The digital receipt is empty.",
        "-8" => "Input exceeds the allowed length.",
        "-9" => "The reversal amount contains invalid characters.",
        "-10" => "The digital receipt is not valid base64.",
        "-11" => "Input is shorter than the allowed length.",
        "-12" => "The reversal amount is negative.",
        "-13" => "The partial reversal exceeds the remaining amount of the receipt.",
        "-14" => "No such transaction is defined.",
        "-15" => "The reversal amount is fractional.",
        "-16" => "Internal bank system error.",
        "-17" => "Partial reversal is not allowed.",
        "-18" => "The merchant IP address is not valid.",
        _ => "Unknown Saman error.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_states_and_codes() {
        assert_eq!(error_message("Canceled By User"), "The payment was cancelled by the user.");
        assert_eq!(error_message("-18"), "The merchant IP address is not valid.");
        assert_eq!(error_message("-99"), "Unknown Saman error.");
    }
}
