use crate::config::GatewaysConfig;
use crate::crypto::PayloadCipher;
use crate::domain::callback::CallbackParams;
use crate::domain::transaction::{PortName, Transaction};
use crate::error::{GatewayError, Result};
use crate::gateways::lifecycle::{PortState, TRANSACTION_SUCCEED_TEXT};
use crate::gateways::soap::SoapClient;
use crate::gateways::{Port, RedirectTarget};
use crate::repo::transactions_repo::TransactionStore;
use std::sync::Arc;

const SOAP_NAMESPACE: &str = "http://tempuri.org/";
const SERVICE_PURCHASE: u8 = 1;
const VERIFICATION_OK: &str = "500";
const RECONCILIATION_OK: &str = "600";

/// Decrypted `ReturningParams` posted back by the payment page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturningParams {
    pub amount: String,
    pub sale_order_id: String,
    pub ref_id: String,
    pub res_code: String,
    pub res_message: String,
    pub pay_gate_tran_id: String,
    pub rrn: String,
    pub last_four_digit_of_pan: String,
}

impl ReturningParams {
    pub fn parse(decrypted: &str) -> Option<Self> {
        let parts: Vec<&str> = decrypted.split(',').collect();
        if parts.len() < 8 {
            return None;
        }
        Some(Self {
            amount: parts[0].to_string(),
            sale_order_id: parts[1].to_string(),
            ref_id: parts[2].to_string(),
            res_code: parts[3].to_string(),
            res_message: parts[4].to_string(),
            pay_gate_tran_id: parts[5].to_string(),
            rrn: parts[6].to_string(),
            last_four_digit_of_pan: parts[7].to_string(),
        })
    }
}

pub struct AsanPardakhtGateway {
    state: PortState,
}

impl AsanPardakhtGateway {
    pub fn new(
        config: Arc<GatewaysConfig>,
        store: Arc<dyn TransactionStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            state: PortState::new(PortName::AsanPardakht, config, store, client),
        }
    }

    fn cipher(&self) -> Result<PayloadCipher> {
        let cfg = &self.state.config.asan_pardakht;
        PayloadCipher::from_base64(&cfg.key, &cfg.iv)
    }

    fn soap(&self, endpoint: &str) -> SoapClient {
        SoapClient {
            endpoint: endpoint.to_string(),
            namespace: SOAP_NAMESPACE.to_string(),
            timeout_ms: self.state.config.timeout_ms,
            client: self.state.client.clone(),
        }
    }

    /// Checks the host-info service answers before opening a session.
    async fn test_ip(&self) -> Result<()> {
        let soap = self.soap(&self.state.config.asan_pardakht.host_info_url);
        let response = soap
            .call("GetHostInfo", &[])
            .await
            .map_err(|_| GatewayError::bank(PortName::AsanPardakht, "-999", error_message("-999")))?;
        match response.field("GetHostInfoResult") {
            Some(info) if !info.is_empty() => Ok(()),
            _ => Err(GatewayError::bank(
                PortName::AsanPardakht,
                "-993",
                error_message("-993"),
            )),
        }
    }

    async fn send_pay_request(&mut self) -> Result<()> {
        let cipher = self.cipher()?;
        let order_id = self.state.new_transaction().await?;

        let cfg = self.state.config.asan_pardakht.clone();
        let date = self
            .state
            .config
            .timezone
            .format(chrono::Utc::now(), "%Y%m%d %H%M%S");
        let raw_request = format!(
            "{SERVICE_PURCHASE},{},{},{order_id},{},{date},,{},0",
            cfg.username,
            cfg.password,
            self.state.amount,
            self.callback()?
        );

        let soap = self.soap(&cfg.merchant_services_url);
        let response = match soap
            .call(
                "RequestOperation",
                &[
                    ("merchantConfigurationID", cfg.merchant_config_id.clone()),
                    ("encryptedRequest", cipher.encrypt(&raw_request)),
                ],
            )
            .await
        {
            Ok(r) => r,
            Err(e) => return Err(self.state.fail_with("SoapFault", e).await),
        };

        let result = response.field("RequestOperationResult").unwrap_or_default();
        match result.split_once(',') {
            Some(("0", token)) if !token.is_empty() => {
                self.state.ref_id = Some(token.to_string());
                self.state.transaction_set_ref_id().await
            }
            _ => {
                let code = result.split(',').next().unwrap_or_default().to_string();
                let message = error_message(&code);
                Err(self.state.fail(code, message).await)
            }
        }
    }

    async fn verify_payment(&mut self, params: &CallbackParams) -> Result<()> {
        let cipher = self.cipher()?;
        let decrypted = match params.get("ReturningParams").map(|p| cipher.decrypt(p)) {
            Some(Ok(plain)) => plain,
            Some(Err(e)) => return Err(self.state.fail_with("CipherError", e).await),
            None => return Err(GatewayError::InvalidRequest),
        };
        let Some(returned) = ReturningParams::parse(&decrypted) else {
            return Err(self.state.fail("-998", error_message("-998")).await);
        };

        if returned.res_code != "0" && returned.res_code != "00" {
            let message = if returned.res_message.is_empty() {
                error_message("-998").to_string()
            } else {
                returned.res_message.clone()
            };
            return Err(self.state.fail("-998", message).await);
        }

        let cfg = self.state.config.asan_pardakht.clone();
        let credentials = cipher.encrypt(&format!("{},{}", cfg.username, cfg.password));
        let call_params = [
            ("merchantConfigurationID", cfg.merchant_config_id.clone()),
            ("encryptedCredentials", credentials),
            ("payGateTranID", returned.pay_gate_tran_id.clone()),
        ];
        let soap = self.soap(&cfg.merchant_services_url);

        let verification = match soap.call("RequestVerification", &call_params).await {
            Ok(r) => r.field("RequestVerificationResult"),
            Err(_) => None,
        };
        match verification.as_deref() {
            Some(VERIFICATION_OK) => {}
            Some(code) => return Err(self.state.fail(code, error_message(code)).await),
            None => return Err(self.state.fail("-997", error_message("-997")).await),
        }

        let reconciliation = match soap.call("RequestReconciliation", &call_params).await {
            Ok(r) => r.field("RequestReconciliationResult"),
            Err(_) => None,
        };
        match reconciliation.as_deref() {
            Some(RECONCILIATION_OK) => {}
            Some(code) => return Err(self.state.fail(code, error_message(code)).await),
            None => return Err(self.state.fail("-996", error_message("-996")).await),
        }

        if returned.amount.parse::<i64>().ok() != Some(self.state.amount) {
            return Err(self.state.fail("-995", error_message("-995")).await);
        }

        if self.state.ref_id.as_deref() != Some(returned.ref_id.as_str()) {
            return Err(self.state.fail("-994", error_message("-994")).await);
        }

        self.state.tracking_code = Some(returned.rrn);
        self.state.card_number = Some(returned.last_four_digit_of_pan);
        self.state.transaction_succeed().await?;
        self.state.new_log(RECONCILIATION_OK, TRANSACTION_SUCCEED_TEXT).await
    }
}

#[async_trait::async_trait]
impl Port for AsanPardakhtGateway {
    fn state(&self) -> &PortState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PortState {
        &mut self.state
    }

    async fn ready(&mut self) -> Result<()> {
        self.test_ip().await?;
        self.send_pay_request().await
    }

    fn redirect(&self) -> Result<RedirectTarget> {
        Ok(RedirectTarget::post(
            self.gateway_url()?,
            self.redirect_parameters()?,
        ))
    }

    async fn verify(&mut self, transaction: &Transaction, params: &CallbackParams) -> Result<()> {
        self.state.load(transaction);
        self.verify_payment(params).await
    }

    fn callback(&self) -> Result<String> {
        self.state
            .callback_with_id(&self.state.config.asan_pardakht.callback_url)
    }

    fn gateway_url(&self) -> Result<String> {
        Ok(self.state.config.asan_pardakht.gate_url.clone())
    }

    fn redirect_parameters(&self) -> Result<Vec<(String, String)>> {
        let ref_id = self.state.ref_id.clone().ok_or_else(|| {
            GatewayError::Config("asan pardakht session has no ref id; call ready() first".to_string())
        })?;
        Ok(vec![("RefId".to_string(), ref_id)])
    }
}

pub fn error_message(code: &str) -> &'static str {
    match code {
        "-999" => "The AsanPardakht web service could not be reached.",
        "-998" => "The payment was not approved by the bank.",
        "-997" => "The verification request could not be sent.",
        "-996" => "The settlement request could not be sent.",
        "-995" => "The paid amount does not match the transaction amount.",
        "-994" => "The returned reference id does not match the transaction.",
        "-993" => "Host information could not be retrieved.",
        "301" => "The merchant configuration is invalid.",
        "302" => "The encryption key is invalid.",
        "303" => "The requested operation is invalid.",
        "304" => "The merchant is not allowed to use this service.",
        "305" => "The request was sent from an unregistered IP address.",
        "306" => "The request could not be decrypted.",
        "307" => "The callback address is invalid.",
        "308" => "The order id is duplicated.",
        "309" => "The amount is invalid.",
        "501" => "The transaction was already verified.",
        "502" => "The transaction was not found for verification.",
        "503" => "The transaction is not in a verifiable state.",
        "504" => "Verification failed.",
        "505" => "Verification timed out; the amount will be refunded.",
        "601" => "The transaction was already settled.",
        "602" => "The transaction was not found for settlement.",
        "603" => "The transaction is not in a settleable state.",
        "604" => "Settlement failed.",
        _ => "Unknown AsanPardakht error.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_returning_params() {
        let p = ReturningParams::parse("15000,42,TOKEN,00,ok,9001,123456,4321").unwrap();
        assert_eq!(p.amount, "15000");
        assert_eq!(p.sale_order_id, "42");
        assert_eq!(p.ref_id, "TOKEN");
        assert_eq!(p.pay_gate_tran_id, "9001");
        assert_eq!(p.last_four_digit_of_pan, "4321");
    }

    #[test]
    fn short_returning_params_are_rejected() {
        assert!(ReturningParams::parse("15000,42,TOKEN").is_none());
    }
}
