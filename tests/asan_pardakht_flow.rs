mod common;

use shaparak_gateway::crypto::PayloadCipher;
use shaparak_gateway::domain::callback::CallbackParams;
use shaparak_gateway::domain::transaction::TransactionStatus;
use shaparak_gateway::error::GatewayError;
use shaparak_gateway::gateways::soap::element_text;
use shaparak_gateway::gateways::RedirectMethod;
use shaparak_gateway::repo::transactions_repo::TransactionStore;

fn cipher() -> PayloadCipher {
    PayloadCipher::from_base64(common::ASAN_KEY, common::ASAN_IV).unwrap()
}

fn bank_replies(verification: &str, reconciliation: &str) -> Vec<(&'static str, String)> {
    vec![
        (
            "GetHostInfo",
            common::soap_reply("GetHostInfo", &[("GetHostInfoResult", "185.1.2.3")]),
        ),
        (
            "RequestOperation",
            common::soap_reply("RequestOperation", &[("RequestOperationResult", "0,TOKEN-42")]),
        ),
        (
            "RequestVerification",
            common::soap_reply(
                "RequestVerification",
                &[("RequestVerificationResult", verification)],
            ),
        ),
        (
            "RequestReconciliation",
            common::soap_reply(
                "RequestReconciliation",
                &[("RequestReconciliationResult", reconciliation)],
            ),
        ),
    ]
}

async fn setup(
    replies: Vec<(&'static str, String)>,
) -> (
    shaparak_gateway::resolver::GatewayResolver,
    shaparak_gateway::repo::in_memory::InMemoryTransactionStore,
    common::Seen,
) {
    let (url, seen) = common::spawn_soap_bank(replies).await;
    let mut config = common::config();
    config.asan_pardakht.host_info_url = url.clone();
    config.asan_pardakht.merchant_services_url = url;
    let (resolver, store) = common::resolver(config);
    (resolver, store, seen)
}

fn returning(amount: &str, id: i64, ref_id: &str, res_code: &str) -> CallbackParams {
    let plain = format!("{amount},{id},{ref_id},{res_code},ok,9001,RRN-77,4321");
    CallbackParams::default()
        .with("transaction_id", id.to_string())
        .with("ReturningParams", cipher().encrypt(&plain))
}

#[tokio::test]
async fn ready_sends_encrypted_request_and_posts_ref_id() {
    let (resolver, store, seen) = setup(bank_replies("500", "600")).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    port.ready().await.unwrap();
    let id = port.transaction_id().unwrap();

    assert_eq!(port.ref_id(), Some("TOKEN-42"));
    let target = port.redirect().unwrap();
    assert_eq!(target.method, RedirectMethod::Post);
    assert_eq!(target.url, "https://asan.shaparak.ir");
    assert_eq!(target.params, vec![("RefId".to_string(), "TOKEN-42".to_string())]);
    assert_eq!(
        store.find(id).await.unwrap().unwrap().ref_id.as_deref(),
        Some("TOKEN-42")
    );

    let requests = seen.lock().unwrap().clone();
    let operation = requests
        .iter()
        .find(|r| r.contains("<RequestOperation "))
        .unwrap();
    assert!(operation.contains("<merchantConfigurationID>777</merchantConfigurationID>"));
    let encrypted = element_text(operation, "encryptedRequest").unwrap();
    let raw = cipher().decrypt(&encrypted).unwrap();
    let fields: Vec<&str> = raw.split(',').collect();
    assert_eq!(fields.len(), 9);
    let order_id = id.to_string();
    assert_eq!(fields[..5], ["1", "asan-user", "asan-pass", order_id.as_str(), "15000"]);
    assert_eq!(fields[5].len(), "YYYYMMDD HHMMSS".len());
    assert_eq!(fields[6], "");
    assert_eq!(fields[7], format!("http://shop.test/callback?transaction_id={id}"));
    assert_eq!(fields[8], "0");
}

#[tokio::test]
async fn rejected_request_operation_fails_transaction() {
    let replies = vec![
        (
            "GetHostInfo",
            common::soap_reply("GetHostInfo", &[("GetHostInfoResult", "185.1.2.3")]),
        ),
        (
            "RequestOperation",
            common::soap_reply("RequestOperation", &[("RequestOperationResult", "305")]),
        ),
    ];
    let (resolver, store, _) = setup(replies).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    let err = port.ready().await.unwrap_err();
    assert_eq!(err.code(), "ASANPARDAKHT_305");
    let id = port.transaction_id().unwrap();
    assert_eq!(store.find(id).await.unwrap().unwrap().status, TransactionStatus::Failed);
}

#[tokio::test]
async fn unreachable_host_info_aborts_before_creating_transaction() {
    let (resolver, store, _) = setup(Vec::new()).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    let err = port.ready().await.unwrap_err();
    assert_eq!(err.code(), "ASANPARDAKHT_-999");
    assert!(port.transaction_id().is_none());
    assert!(store.find(1).await.unwrap().is_none());
}

#[tokio::test]
async fn verification_and_reconciliation_settle_payment() {
    let (resolver, store, seen) = setup(bank_replies("500", "600")).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    port.ready().await.unwrap();
    let id = port.transaction_id().unwrap();

    let verified = resolver
        .verify(&returning("15000", id, "TOKEN-42", "0"))
        .await
        .unwrap();
    assert_eq!(verified.tracking_code(), Some("RRN-77"));
    assert_eq!(verified.card_number(), Some("4321"));

    let tx = store.find(id).await.unwrap().unwrap();
    assert_eq!(tx.status, TransactionStatus::Succeed);
    assert_eq!(tx.card_number.as_deref(), Some("4321"));

    let requests = seen.lock().unwrap().clone();
    let verification = requests
        .iter()
        .find(|r| r.contains("<RequestVerification "))
        .unwrap();
    assert!(verification.contains("<payGateTranID>9001</payGateTranID>"));
    let credentials = element_text(verification, "encryptedCredentials").unwrap();
    assert_eq!(cipher().decrypt(&credentials).unwrap(), "asan-user,asan-pass");
}

#[tokio::test]
async fn failed_verification_code_is_recorded() {
    let (resolver, store, _) = setup(bank_replies("504", "600")).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    port.ready().await.unwrap();
    let id = port.transaction_id().unwrap();

    let err = resolver
        .verify(&returning("15000", id, "TOKEN-42", "0"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, GatewayError::Bank { ref code, .. } if code == "504"));
    assert_eq!(store.find(id).await.unwrap().unwrap().status, TransactionStatus::Failed);
    assert_eq!(store.logs(id).await.unwrap()[0].result_message, "Verification failed.");
}

#[tokio::test]
async fn amount_mismatch_after_settlement_is_rejected() {
    let (resolver, store, _) = setup(bank_replies("500", "600")).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    port.ready().await.unwrap();
    let id = port.transaction_id().unwrap();

    let err = resolver
        .verify(&returning("9999", id, "TOKEN-42", "0"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), "ASANPARDAKHT_-995");
    assert_eq!(store.find(id).await.unwrap().unwrap().status, TransactionStatus::Failed);
}

#[tokio::test]
async fn declined_payment_is_not_verified_with_bank() {
    let (resolver, store, seen) = setup(bank_replies("500", "600")).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    port.ready().await.unwrap();
    let id = port.transaction_id().unwrap();
    let calls_before = seen.lock().unwrap().len();

    let err = resolver
        .verify(&returning("15000", id, "TOKEN-42", "51"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), "ASANPARDAKHT_-998");
    assert_eq!(seen.lock().unwrap().len(), calls_before);
    assert_eq!(store.find(id).await.unwrap().unwrap().status, TransactionStatus::Failed);
}

#[tokio::test]
async fn soap_fault_on_request_operation_fails_transaction() {
    let replies = vec![(
        "GetHostInfo",
        common::soap_reply("GetHostInfo", &[("GetHostInfoResult", "185.1.2.3")]),
    )];
    let (resolver, store, _) = setup(replies).await;

    let mut port = resolver.asan_pardakht();
    port.set(15_000);
    let err = port.ready().await.unwrap_err();
    assert!(matches!(err, GatewayError::SoapFault(ref m) if m == "unknown operation"));

    let id = port.transaction_id().unwrap();
    assert_eq!(store.find(id).await.unwrap().unwrap().status, TransactionStatus::Failed);
    let logs = store.logs(id).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].result_code, "SoapFault");
}
