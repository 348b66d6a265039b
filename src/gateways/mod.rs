use crate::domain::callback::CallbackParams;
use crate::domain::transaction::{PortName, Transaction};
use crate::error::Result;
use serde::Serialize;

pub mod asan_pardakht;
pub mod lifecycle;
pub mod payline;
pub mod saman;
pub mod soap;
pub mod zarinpal;

use lifecycle::PortState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedirectMethod {
    Get,
    Post,
}

/// Where to send the end user after `ready()`.
#[derive(Debug, Clone, Serialize)]
pub struct RedirectTarget {
    pub url: String,
    pub method: RedirectMethod,
    pub params: Vec<(String, String)>,
}

impl RedirectTarget {
    pub fn get(url: String) -> Self {
        Self {
            url,
            method: RedirectMethod::Get,
            params: Vec::new(),
        }
    }

    pub fn post(url: String, params: Vec<(String, String)>) -> Self {
        Self {
            url,
            method: RedirectMethod::Post,
            params,
        }
    }

    /// Self-submitting page that forwards the browser to the bank.
    pub fn to_html(&self) -> String {
        let method = match self.method {
            RedirectMethod::Get => "get",
            RedirectMethod::Post => "post",
        };
        let inputs: String = self
            .params
            .iter()
            .map(|(k, v)| {
                format!(
                    r#"<input type="hidden" name="{}" value="{}">"#,
                    html_escape(k),
                    html_escape(v)
                )
            })
            .collect();
        format!(
            concat!(
                "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Redirecting</title></head>",
                "<body onload=\"document.forms[0].submit()\">",
                "<form action=\"{action}\" method=\"{method}\">{inputs}",
                "<noscript><button type=\"submit\">Continue to payment</button></noscript>",
                "</form></body></html>"
            ),
            action = html_escape(&self.url),
            method = method,
            inputs = inputs
        )
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One bank's payment flow.
///
/// Callers `set` the amount, call `ready` to persist a pending transaction and
/// open a session with the bank, send the user to `redirect`, and finally run
/// `verify` with the parameters the bank posted back.
#[async_trait::async_trait]
pub trait Port: Send + Sync {
    fn state(&self) -> &PortState;
    fn state_mut(&mut self) -> &mut PortState;

    async fn ready(&mut self) -> Result<()>;

    fn redirect(&self) -> Result<RedirectTarget>;

    async fn verify(&mut self, transaction: &Transaction, params: &CallbackParams) -> Result<()>;

    /// Callback URL the bank returns the user to, transaction id included.
    fn callback(&self) -> Result<String>;

    fn gateway_url(&self) -> Result<String>;

    fn redirect_parameters(&self) -> Result<Vec<(String, String)>>;

    fn set(&mut self, amount: i64) {
        self.state_mut().amount = amount;
    }

    fn set_callback(&mut self, url: String) {
        self.state_mut().callback_url = Some(url);
    }

    fn set_client_ip(&mut self, ip: Option<String>) {
        self.state_mut().client_ip = ip;
    }

    fn set_description(&mut self, description: String) {
        self.state_mut().payer.description = Some(description);
    }

    fn set_email(&mut self, email: String) {
        self.state_mut().payer.email = Some(email);
    }

    fn set_mobile(&mut self, mobile: String) {
        self.state_mut().payer.mobile = Some(mobile);
    }

    fn port_name(&self) -> PortName {
        self.state().port
    }

    fn amount(&self) -> i64 {
        self.state().amount
    }

    fn transaction_id(&self) -> Option<i64> {
        self.state().transaction_id
    }

    fn ref_id(&self) -> Option<&str> {
        self.state().ref_id.as_deref()
    }

    fn tracking_code(&self) -> Option<&str> {
        self.state().tracking_code.as_deref()
    }

    fn card_number(&self) -> Option<&str> {
        self.state().card_number.as_deref()
    }
}
