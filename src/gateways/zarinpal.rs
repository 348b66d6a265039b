use crate::config::GatewaysConfig;
use crate::domain::callback::CallbackParams;
use crate::domain::transaction::{PortName, Transaction};
use crate::error::{GatewayError, Result};
use crate::gateways::lifecycle::{PortState, TRANSACTION_SUCCEED_TEXT};
use crate::gateways::soap::SoapClient;
use crate::gateways::{Port, RedirectTarget};
use crate::repo::transactions_repo::TransactionStore;
use std::sync::Arc;

const SOAP_NAMESPACE: &str = "http://zarinpal.com/";
const STATUS_OK: &str = "100";

const GERMANY_SERVER: &str = "https://de.zarinpal.com/pg/services/WebGate/service";
const IRAN_SERVER: &str = "https://ir.zarinpal.com/pg/services/WebGate/service";
const SANDBOX_SERVER: &str = "https://sandbox.zarinpal.com/pg/services/WebGate/service";

const GATE_URL: &str = "https://www.zarinpal.com/pg/StartPay/";
const SANDBOX_GATE_URL: &str = "https://sandbox.zarinpal.com/pg/StartPay/";

pub struct ZarinpalGateway {
    state: PortState,
}

impl ZarinpalGateway {
    pub fn new(
        config: Arc<GatewaysConfig>,
        store: Arc<dyn TransactionStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            state: PortState::new(PortName::Zarinpal, config, store, client),
        }
    }

    fn server_url(&self) -> String {
        let cfg = &self.state.config.zarinpal;
        if let Some(url) = &cfg.soap_url {
            return url.clone();
        }
        match cfg.server.as_str() {
            "iran" => IRAN_SERVER,
            "test" => SANDBOX_SERVER,
            _ => GERMANY_SERVER,
        }
        .to_string()
    }

    fn soap(&self) -> SoapClient {
        SoapClient {
            endpoint: self.server_url(),
            namespace: SOAP_NAMESPACE.to_string(),
            timeout_ms: self.state.config.timeout_ms,
            client: self.state.client.clone(),
        }
    }

    async fn send_pay_request(&mut self) -> Result<()> {
        self.state.new_transaction().await?;

        let cfg = &self.state.config.zarinpal;
        let payer = &self.state.payer;
        let fields = [
            ("MerchantID", cfg.merchant_id.clone()),
            ("Amount", self.state.amount.to_string()),
            (
                "Description",
                payer.description.clone().unwrap_or_else(|| cfg.description.clone()),
            ),
            ("Email", payer.email.clone().unwrap_or_else(|| cfg.email.clone())),
            ("Mobile", payer.mobile.clone().unwrap_or_else(|| cfg.mobile.clone())),
            ("CallbackURL", self.callback()?),
        ];

        let response = match self.soap().call("PaymentRequest", &fields).await {
            Ok(r) => r,
            Err(e) => return Err(self.state.fail_with("SoapFault", e).await),
        };

        let status = response.field("Status").unwrap_or_default();
        if status != STATUS_OK {
            let message = error_message(&status);
            return Err(self.state.fail(status, message).await);
        }

        self.state.ref_id = response.field("Authority");
        self.state.transaction_set_ref_id().await
    }

    async fn user_payment(&mut self, params: &CallbackParams) -> Result<()> {
        if let Some(authority) = params.get("Authority") {
            if self.state.ref_id.is_none() {
                self.state.ref_id = Some(authority.to_string());
            }
        }

        if params.get("Status") == Some("OK") {
            return Ok(());
        }
        Err(self.state.fail("-22", error_message("-22")).await)
    }

    async fn verify_payment(&mut self) -> Result<()> {
        let fields = [
            ("MerchantID", self.state.config.zarinpal.merchant_id.clone()),
            ("Authority", self.state.ref_id.clone().unwrap_or_default()),
            ("Amount", self.state.amount.to_string()),
        ];

        let response = match self.soap().call("PaymentVerification", &fields).await {
            Ok(r) => r,
            Err(e) => return Err(self.state.fail_with("SoapFault", e).await),
        };

        let status = response.field("Status").unwrap_or_default();
        if status != STATUS_OK {
            let message = error_message(&status);
            return Err(self.state.fail(status, message).await);
        }

        self.state.tracking_code = response.field("RefID");
        self.state.transaction_succeed().await?;
        self.state.new_log(status, TRANSACTION_SUCCEED_TEXT).await
    }
}

#[async_trait::async_trait]
impl Port for ZarinpalGateway {
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
            .callback_with_id(&self.state.config.zarinpal.callback_url)
    }

    fn gateway_url(&self) -> Result<String> {
        let authority = self.state.ref_id.as_deref().ok_or_else(|| {
            GatewayError::Config("zarinpal session has no authority; call ready() first".to_string())
        })?;
        let cfg = &self.state.config.zarinpal;
        Ok(if cfg.server == "test" {
            format!("{SANDBOX_GATE_URL}{authority}")
        } else if cfg.kind == "zarin-gate" {
            format!("{GATE_URL}{authority}/ZarinGate")
        } else {
            format!("{GATE_URL}{authority}")
        })
    }

    fn redirect_parameters(&self) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

pub fn error_message(code: &str) -> &'static str {
    match code {
        "-1" => "The submitted information is incomplete.",
        "-2" => "The IP address or merchant code is not valid.",
        "-3" => "The minimum payable amount is 1000 Rials.",
        "-4" => "The merchant level must be at least silver for this operation.",
        "-11" => "The request was not found.",
        "-21" => "No financial operation was found for this transaction.",
        "-22" => "The transaction was not successful.",
        "-33" => "The transaction amount does not match the paid amount.",
        "-54" => "The request has been archived.",
        "100" => "The operation completed successfully.",
        "101" => "The payment succeeded but was already verified earlier.",
        _ => "Unknown Zarinpal error.",
    }
}
