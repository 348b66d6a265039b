use crate::error::{GatewayError, Result};
use std::time::Duration;

/// Minimal SOAP 1.1 client: one envelope per call, results read by element name.
#[derive(Clone)]
pub struct SoapClient {
    pub endpoint: String,
    pub namespace: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub body: String,
}

impl SoapResponse {
    pub fn field(&self, name: &str) -> Option<String> {
        element_text(&self.body, name)
    }
}

impl SoapClient {
    pub async fn call(&self, operation: &str, params: &[(&str, String)]) -> Result<SoapResponse> {
        let envelope = build_envelope(&self.namespace, operation, params);
        let action = format!("{}{}", self.namespace, operation);

        tracing::debug!(endpoint = %self.endpoint, operation, "soap call");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{action}\""))
            .body(envelope)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if let Some(fault) = element_text(&body, "faultstring") {
            return Err(GatewayError::SoapFault(fault));
        }
        if !status.is_success() {
            return Err(GatewayError::SoapFault(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(SoapResponse { body })
    }
}

pub fn build_envelope(namespace: &str, operation: &str, params: &[(&str, String)]) -> String {
    let mut args = String::new();
    for (name, value) in params {
        args.push_str(&format!("<{name}>{}</{name}>", escape(value)));
    }
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
            r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<soap:Body><{op} xmlns="{ns}">{args}</{op}></soap:Body></soap:Envelope>"#
        ),
        op = operation,
        ns = escape(namespace),
        args = args
    )
}

/// Text content of the first element whose local name is `name`.
pub fn element_text(xml: &str, name: &str) -> Option<String> {
    let mut rest = xml;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let tag_end = after.find('>')?;
        let tag = &after[..tag_end];
        let tag_name = tag
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        let local = tag_name.rsplit(':').next().unwrap_or(tag_name);

        if !tag.starts_with('/') && local == name {
            if tag.ends_with('/') {
                return Some(String::new());
            }
            let content = &after[tag_end + 1..];
            let close = content.find("</")?;
            return Some(unescape(&content[..close]));
        }
        rest = &after[tag_end + 1..];
    }
    None
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
