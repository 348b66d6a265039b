#![allow(dead_code)]

use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use shaparak_gateway::config::{
    AsanPardakhtConfig, BankTimezone, GatewaysConfig, PaylineConfig, SamanConfig, ZarinpalConfig,
};
use shaparak_gateway::repo::in_memory::InMemoryTransactionStore;
use shaparak_gateway::resolver::GatewayResolver;
use std::sync::{Arc, Mutex};

/// 32 bytes of key, base64.
pub const ASAN_KEY: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=";
/// 32 bytes of IV, base64.
pub const ASAN_IV: &str = "ICEiIyQlJicoKSorLC0uLzAxMjM0NTY3ODk6Ozw9Pj8=";

pub type Seen = Arc<Mutex<Vec<String>>>;

pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn soap_reply(operation: &str, fields: &[(&str, &str)]) -> String {
    let inner: String = fields
        .iter()
        .map(|(k, v)| format!("<{k}>{v}</{k}>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><{operation}Response>{inner}</{operation}Response></soap:Body></soap:Envelope>"#
    )
}

/// A SOAP endpoint at `/` that answers each operation with a canned reply
/// and records every request body it receives.
pub async fn spawn_soap_bank(replies: Vec<(&'static str, String)>) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let replies = Arc::new(replies);
    let recorder = seen.clone();
    let app = Router::new().route(
        "/",
        post(move |body: String| {
            let recorder = recorder.clone();
            let replies = replies.clone();
            async move {
                recorder.lock().unwrap().push(body.clone());
                match replies
                    .iter()
                    .find(|(op, _)| body.contains(&format!("<{op} ")))
                {
                    Some((_, reply)) => (StatusCode::OK, reply.clone()),
                    None => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "<soap:Envelope><soap:Body><soap:Fault><faultstring>unknown operation</faultstring></soap:Fault></soap:Body></soap:Envelope>".to_string(),
                    ),
                }
            }
        }),
    );
    (spawn(app).await, seen)
}

/// A form endpoint at `/` with a fixed plain-text answer.
pub async fn spawn_form_bank(reply: &'static str) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let app = Router::new().route(
        "/",
        post(move |body: String| {
            let recorder = recorder.clone();
            async move {
                recorder.lock().unwrap().push(body);
                reply
            }
        }),
    );
    (spawn(app).await, seen)
}

pub fn config() -> GatewaysConfig {
    let unused = "http://127.0.0.1:9/unused".to_string();
    GatewaysConfig {
        table: "gateway_transactions".to_string(),
        timezone: BankTimezone::parse("+03:30").unwrap(),
        timeout_ms: 5_000,
        saman: SamanConfig {
            merchant: "10001".to_string(),
            password: "saman-pass".to_string(),
            callback_url: "http://shop.test/callback".to_string(),
            soap_url: unused.clone(),
            gate_url: "https://sep.shaparak.ir/Payment.aspx".to_string(),
        },
        payline: PaylineConfig {
            api: "payline-api".to_string(),
            callback_url: "http://shop.test/callback".to_string(),
            send_url: unused.clone(),
            verify_url: unused.clone(),
            gate_url: "http://payline.ir/payment/gateway-".to_string(),
        },
        asan_pardakht: AsanPardakhtConfig {
            merchant_config_id: "777".to_string(),
            username: "asan-user".to_string(),
            password: "asan-pass".to_string(),
            key: ASAN_KEY.to_string(),
            iv: ASAN_IV.to_string(),
            callback_url: "http://shop.test/callback".to_string(),
            merchant_services_url: unused.clone(),
            host_info_url: unused.clone(),
            gate_url: "https://asan.shaparak.ir".to_string(),
        },
        zarinpal: ZarinpalConfig {
            merchant_id: "zp-merchant".to_string(),
            kind: "normal".to_string(),
            server: "germany".to_string(),
            description: "order".to_string(),
            email: String::new(),
            mobile: String::new(),
            callback_url: "http://shop.test/callback".to_string(),
            soap_url: Some(unused),
        },
    }
}

pub fn resolver(config: GatewaysConfig) -> (GatewayResolver, InMemoryTransactionStore) {
    let store = InMemoryTransactionStore::new();
    (GatewayResolver::new(config, Arc::new(store.clone())), store)
}
