use crate::config::GatewaysConfig;
use crate::domain::callback::CallbackParams;
use crate::domain::transaction::PortName;
use crate::error::{GatewayError, Result};
use crate::gateways::asan_pardakht::AsanPardakhtGateway;
use crate::gateways::payline::PaylineGateway;
use crate::gateways::saman::SamanGateway;
use crate::gateways::zarinpal::ZarinpalGateway;
use crate::gateways::Port;
use crate::repo::transactions_repo::TransactionStore;
use std::sync::Arc;

/// Builds adapters by name and drives the callback side of a payment.
#[derive(Clone)]
pub struct GatewayResolver {
    pub config: Arc<GatewaysConfig>,
    pub store: Arc<dyn TransactionStore>,
    pub client: reqwest::Client,
}

impl GatewayResolver {
    pub fn new(config: GatewaysConfig, store: Arc<dyn TransactionStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            client: reqwest::Client::new(),
        }
    }

    pub fn supported_ports(&self) -> &'static [PortName] {
        &PortName::ALL
    }

    pub fn make(&self, name: &str) -> Result<Box<dyn Port>> {
        let port: PortName = name
            .parse()
            .map_err(|_| GatewayError::PortNotFound(name.to_string()))?;
        Ok(self.make_port(port))
    }

    pub fn make_port(&self, port: PortName) -> Box<dyn Port> {
        let config = self.config.clone();
        let store = self.store.clone();
        let client = self.client.clone();
        match port {
            PortName::Saman => Box::new(SamanGateway::new(config, store, client)),
            PortName::Payline => Box::new(PaylineGateway::new(config, store, client)),
            PortName::AsanPardakht => Box::new(AsanPardakhtGateway::new(config, store, client)),
            PortName::Zarinpal => Box::new(ZarinpalGateway::new(config, store, client)),
        }
    }

    pub fn saman(&self) -> Box<dyn Port> {
        self.make_port(PortName::Saman)
    }

    pub fn payline(&self) -> Box<dyn Port> {
        self.make_port(PortName::Payline)
    }

    pub fn asan_pardakht(&self) -> Box<dyn Port> {
        self.make_port(PortName::AsanPardakht)
    }

    pub fn zarinpal(&self) -> Box<dyn Port> {
        self.make_port(PortName::Zarinpal)
    }

    /// `transaction_id` is what our callback URLs carry; `iN` is the field
    /// name some banks echo back instead.
    pub fn transaction_id(&self, params: &CallbackParams) -> Result<i64> {
        params
            .get("transaction_id")
            .or_else(|| params.get("iN"))
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or(GatewayError::InvalidRequest)
    }

    /// Loads the transaction named by the callback and lets its adapter
    /// confirm the payment with the bank.
    pub async fn verify(&self, params: &CallbackParams) -> Result<Box<dyn Port>> {
        let id = self.transaction_id(params)?;

        let transaction = self
            .store
            .find(id)
            .await?
            .ok_or(GatewayError::NotFoundTransaction)?;

        if transaction.status.is_final() {
            tracing::warn!(transaction_id = id, status = transaction.status.as_str(), "callback for finalized transaction");
            return Err(GatewayError::Retry);
        }

        let mut port = self.make_port(transaction.port);
        port.verify(&transaction, params).await?;
        Ok(port)
    }
}
