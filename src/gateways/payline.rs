use crate::config::GatewaysConfig;
use crate::domain::callback::CallbackParams;
use crate::domain::transaction::{PortName, Transaction};
use crate::error::{GatewayError, Result};
use crate::gateways::lifecycle::{PortState, TRANSACTION_SUCCEED_TEXT};
use crate::gateways::{Port, RedirectTarget};
use crate::repo::transactions_repo::TransactionStore;
use std::sync::Arc;
use std::time::Duration;

pub struct PaylineGateway {
    state: PortState,
}

impl PaylineGateway {
    pub fn new(
        config: Arc<GatewaysConfig>,
        store: Arc<dyn TransactionStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            state: PortState::new(PortName::Payline, config, store, client),
        }
    }

    async fn post_form(&self, url: &str, fields: &[(&str, String)]) -> Result<String> {
        let resp = self
            .state
            .client
            .post(url)
            .form(fields)
            .timeout(Duration::from_millis(self.state.config.timeout_ms))
            .send()
            .await?;
        Ok(resp.text().await?.trim().to_string())
    }

    async fn send_pay_request(&mut self) -> Result<()> {
        self.state.new_transaction().await?;

        // Payline expects the callback URL-encoded once more inside the form body.
        let redirect: String =
            url::form_urlencoded::byte_serialize(self.callback()?.as_bytes()).collect();
        let fields = [
            ("api", self.state.config.payline.api.clone()),
            ("amount", self.state.amount.to_string()),
            ("redirect", redirect),
        ];

        let send_url = self.state.config.payline.send_url.clone();
        let response = match self.post_form(&send_url, &fields).await {
            Ok(body) => body,
            Err(e) => return Err(self.state.fail_with("HttpError", e).await),
        };

        match response.parse::<i64>() {
            Ok(ref_id) if ref_id > 0 => {
                self.state.ref_id = Some(response);
                self.state.transaction_set_ref_id().await
            }
            _ => {
                let message = send_error_message(&response);
                Err(self.state.fail(response, message).await)
            }
        }
    }

    async fn user_payment(&mut self, params: &CallbackParams) -> Result<()> {
        let trans_id = params.get("trans_id").unwrap_or_default();
        match trans_id.parse::<i64>() {
            Ok(n) if n > 0 => {
                self.state.tracking_code = Some(trans_id.to_string());
                Ok(())
            }
            _ => Err(self.state.fail("-4", receive_error_message("-4")).await),
        }
    }

    async fn verify_payment(&mut self) -> Result<()> {
        let fields = [
            ("api", self.state.config.payline.api.clone()),
            ("id_get", self.state.ref_id.clone().unwrap_or_default()),
            ("trans_id", self.state.tracking_code.clone().unwrap_or_default()),
        ];

        let verify_url = self.state.config.payline.verify_url.clone();
        let response = match self.post_form(&verify_url, &fields).await {
            Ok(body) => body,
            Err(e) => return Err(self.state.fail_with("HttpError", e).await),
        };

        if response == "1" {
            self.state.transaction_succeed().await?;
            self.state.new_log(response, TRANSACTION_SUCCEED_TEXT).await?;
            return Ok(());
        }

        let message = receive_error_message(&response);
        Err(self.state.fail(response, message).await)
    }
}

#[async_trait::async_trait]
impl Port for PaylineGateway {
    fn state(&self) -> &PortState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PortState {
        &mut self.state
    }

    async fn ready(&mut self) -> Result<()> {
        self.send_pay_request().await
    }

    fn redirect(&self) -> Result<RedirectTarget> {
        Ok(RedirectTarget::get(self.gateway_url()?))
    }

    async fn verify(&mut self, transaction: &Transaction, params: &CallbackParams) -> Result<()> {
        self.state.load(transaction);
        self.user_payment(params).await?;
        self.verify_payment().await
    }

    fn callback(&self) -> Result<String> {
        self.state
            .callback_with_id(&self.state.config.payline.callback_url)
    }

    fn gateway_url(&self) -> Result<String> {
        let ref_id = self
            .state
            .ref_id
            .as_deref()
            .ok_or_else(|| GatewayError::Config("payline session has no ref id; call ready() first".to_string()))?;
        Ok(format!("{}{}", self.state.config.payline.gate_url, ref_id))
    }

    fn redirect_parameters(&self) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

pub fn send_error_message(code: &str) -> &'static str {
    match code {
        "-1" => "The api key does not match the one registered with Payline.",
        "-2" => "Amount is not numeric or is below 1000 Rials.",
        "-3" => "The redirect address is empty.",
        "-4" => "No gateway matches the submitted data, or it is pending approval.",
        _ => "Unknown Payline error.",
    }
}

pub fn receive_error_message(code: &str) -> &'static str {
    match code {
        "-1" => "The api key does not match the one registered with Payline.",
        "-2" => "The submitted trans_id is not valid.",
        "-3" => "The submitted id_get is not valid.",
        "-4" => "No such transaction exists or it was not successful.",
        _ => "Unknown Payline error.",
    }
}
