use crate::config::GatewaysConfig;
use crate::domain::transaction::{NewLogEntry, NewTransaction, PortName, Settlement, Transaction};
use crate::error::{GatewayError, Result};
use crate::repo::transactions_repo::TransactionStore;
use std::sync::Arc;

pub const TRANSACTION_SUCCEED_TEXT: &str = "Payment completed successfully.";

/// Optional payer details some banks forward to their payment page.
#[derive(Debug, Clone, Default)]
pub struct PayerInfo {
    pub description: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

/// Transaction bookkeeping shared by every adapter: the persisted row, the
/// audit log and the callback URL.
pub struct PortState {
    pub port: PortName,
    pub config: Arc<GatewaysConfig>,
    pub store: Arc<dyn TransactionStore>,
    pub client: reqwest::Client,
    pub amount: i64,
    pub transaction_id: Option<i64>,
    pub ref_id: Option<String>,
    pub tracking_code: Option<String>,
    pub card_number: Option<String>,
    pub callback_url: Option<String>,
    pub client_ip: Option<String>,
    pub payer: PayerInfo,
}

impl PortState {
    pub fn new(
        port: PortName,
        config: Arc<GatewaysConfig>,
        store: Arc<dyn TransactionStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            port,
            config,
            store,
            client,
            amount: 0,
            transaction_id: None,
            ref_id: None,
            tracking_code: None,
            card_number: None,
            callback_url: None,
            client_ip: None,
            payer: PayerInfo::default(),
        }
    }

    pub fn transaction_id(&self) -> Result<i64> {
        self.transaction_id.ok_or(GatewayError::NotFoundTransaction)
    }

    pub async fn new_transaction(&mut self) -> Result<i64> {
        let id = self
            .store
            .create(NewTransaction {
                port: self.port,
                price: self.amount,
                ip: self.client_ip.clone(),
            })
            .await?;
        tracing::info!(port = %self.port, transaction_id = id, amount = self.amount, "transaction created");
        self.transaction_id = Some(id);
        Ok(id)
    }

    /// Adopts a persisted transaction ahead of verification.
    pub fn load(&mut self, transaction: &Transaction) {
        self.transaction_id = Some(transaction.id);
        self.amount = transaction.price;
        self.ref_id = transaction.ref_id.clone();
        self.client_ip = transaction.ip.clone();
    }

    pub async fn transaction_set_ref_id(&self) -> Result<()> {
        let id = self.transaction_id()?;
        let ref_id = self.ref_id.as_deref().unwrap_or_default();
        self.store.set_ref_id(id, ref_id).await?;
        Ok(())
    }

    pub async fn transaction_succeed(&self) -> Result<()> {
        let id = self.transaction_id()?;
        let settled = self
            .store
            .mark_succeeded(
                id,
                &Settlement {
                    ref_id: self.ref_id.clone(),
                    tracking_code: self.tracking_code.clone(),
                    card_number: self.card_number.clone(),
                },
            )
            .await?;
        if !settled {
            return Err(GatewayError::Retry);
        }
        tracing::info!(port = %self.port, transaction_id = id, "transaction succeeded");
        Ok(())
    }

    /// Already-finalized rows are left untouched.
    pub async fn transaction_failed(&self) -> Result<()> {
        let id = self.transaction_id()?;
        if self.store.mark_failed(id).await? {
            tracing::warn!(port = %self.port, transaction_id = id, "transaction failed");
        }
        Ok(())
    }

    pub async fn new_log(&self, code: impl Into<String>, message: impl Into<String>) -> Result<()> {
        let id = self.transaction_id()?;
        self.store
            .append_log(NewLogEntry {
                transaction_id: id,
                result_code: code.into(),
                result_message: message.into(),
            })
            .await?;
        Ok(())
    }

    /// Marks the transaction failed, records the code and returns the bank
    /// error for the caller to propagate.
    pub async fn fail(&self, code: impl Into<String>, message: impl Into<String>) -> GatewayError {
        let code = code.into();
        let message = message.into();
        if let Err(e) = self.transaction_failed().await {
            return e;
        }
        if let Err(e) = self.new_log(code.clone(), message.clone()).await {
            return e;
        }
        GatewayError::bank(self.port, code, message)
    }

    /// Same as [`fail`](Self::fail) for transport-level errors, which are
    /// logged under their own label and surfaced unchanged.
    pub async fn fail_with(&self, label: &str, err: GatewayError) -> GatewayError {
        if let Err(e) = self.transaction_failed().await {
            return e;
        }
        if let Err(e) = self.new_log(label, err.to_string()).await {
            return e;
        }
        err
    }

    /// The caller-supplied callback URL wins over `configured`; the
    /// transaction id is appended to its query string.
    pub fn callback_with_id(&self, configured: &str) -> Result<String> {
        let base = self.callback_url.as_deref().unwrap_or(configured);
        make_callback(base, &[("transaction_id", self.transaction_id()?.to_string())])
    }
}

pub fn make_callback(url: &str, query: &[(&str, String)]) -> Result<String> {
    let mut parsed = url::Url::parse(url)
        .map_err(|e| GatewayError::Config(format!("invalid callback url `{url}`: {e}")))?;
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !query.iter().any(|(q, _)| *q == k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.extend(query.iter().map(|(k, v)| (k.to_string(), v.clone())));

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    Ok(parsed.to_string())
}
