//! State machine tests for the settlement processor, run against in-memory
//! repositories with mockito standing in for the registry and the banks.

mod common;

use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use serde_json::json;

use clearing_core::domain::TransactionStatus;
use clearing_core::ports::{AccountRepository, BankRepository, TransactionRepository};

use common::{account, bank, harness, single_with_status, transaction, transaction_created_at};

const JWT_BODY_PATTERN: &str = r#""jwt":"[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+""#;

#[tokio::test]
async fn expired_transaction_is_refunded_and_failed() {
    let h = harness("http://127.0.0.1:1/banks");

    h.accounts.save(&account("100000001", 20)).await.unwrap();
    let tx = transaction_created_at("100000001", "999000002", 100, Utc::now() - Duration::days(4));
    h.transactions.save(&tx).await.unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.picked, 1);
    assert_eq!(summary.failed, 1);

    let failed = single_with_status(&h.transactions, TransactionStatus::Failed).await;
    assert_eq!(failed.status_detail.as_deref(), Some("Expired"));

    let refunded = h.accounts.find_by_number("100000001").await.unwrap();
    assert_eq!(refunded.balance, BigDecimal::from(120));
}

#[tokio::test]
async fn failed_transaction_is_not_refunded_twice() {
    let h = harness("http://127.0.0.1:1/banks");

    h.accounts.save(&account("100000001", 0)).await.unwrap();
    let tx = transaction_created_at("100000001", "999000002", 100, Utc::now() - Duration::days(4));
    h.transactions.save(&tx).await.unwrap();

    h.processor.run_pass().await.unwrap();
    // The transaction is Failed now, so the second pass must not pick it up.
    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.picked, 0);

    let balance = h.accounts.find_by_number("100000001").await.unwrap().balance;
    assert_eq!(balance, BigDecimal::from(100));
}

#[tokio::test]
async fn successful_send_completes_with_receiver_name() {
    let mut bank_server = mockito::Server::new_async().await;
    let send_mock = bank_server
        .mock("POST", "/transactions")
        .match_body(mockito::Matcher::Regex(JWT_BODY_PATTERN.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"receiverName": "Juhan Juurikas"}).to_string())
        .create_async()
        .await;

    let h = harness("http://127.0.0.1:1/banks");
    let url = format!("{}/transactions", bank_server.url());
    h.banks.replace_all(&[bank("352", &url)]).await.unwrap();

    h.transactions
        .save(&transaction("100000001", "352000002", 100))
        .await
        .unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.completed, 1);

    let completed = single_with_status(&h.transactions, TransactionStatus::Completed).await;
    assert_eq!(completed.receiver_name.as_deref(), Some("Juhan Juurikas"));
    assert_eq!(completed.status_detail, None);

    send_mock.assert_async().await;
}

#[tokio::test]
async fn remote_failure_requeues_with_detail_then_retries() {
    let mut bank_server = mockito::Server::new_async().await;
    let failure = bank_server
        .mock("POST", "/transactions")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let h = harness("http://127.0.0.1:1/banks");
    let url = format!("{}/transactions", bank_server.url());
    h.banks.replace_all(&[bank("352", &url)]).await.unwrap();

    h.transactions
        .save(&transaction("100000001", "352000002", 100))
        .await
        .unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.requeued, 1);

    let pending = single_with_status(&h.transactions, TransactionStatus::Pending).await;
    let detail = pending.status_detail.expect("retry detail");
    assert!(detail.contains("500"), "detail should carry the error message, got: {}", detail);
    failure.assert_async().await;

    // Destination recovers; the next pass picks the transaction up again.
    let _success = bank_server
        .mock("POST", "/transactions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"receiverName": "Juhan Juurikas"}).to_string())
        .create_async()
        .await;

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.completed, 1);

    let completed = single_with_status(&h.transactions, TransactionStatus::Completed).await;
    assert_eq!(completed.receiver_name.as_deref(), Some("Juhan Juurikas"));
}

#[tokio::test]
async fn unknown_bank_after_refresh_fails_and_refunds() {
    let mut registry = mockito::Server::new_async().await;
    let refresh = registry
        .mock("GET", "/banks")
        .match_header("Api-Key", "test-api-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([{"bankPrefix": "111", "transactionUrl": "https://one.example/transactions", "name": "One"}])
                .to_string(),
        )
        .create_async()
        .await;

    let h = harness(&format!("{}/banks", registry.url()));
    h.accounts.save(&account("100000001", 0)).await.unwrap();
    h.transactions
        .save(&transaction("100000001", "999000002", 100))
        .await
        .unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.failed, 1);

    let failed = single_with_status(&h.transactions, TransactionStatus::Failed).await;
    assert_eq!(failed.status_detail.as_deref(), Some("Bank 999 does not exist."));

    // Exactly one refund.
    let balance = h.accounts.find_by_number("100000001").await.unwrap().balance;
    assert_eq!(balance, BigDecimal::from(100));

    // The refresh itself installed the registry's list.
    assert!(h.banks.find_by_prefix("111").await.unwrap().is_some());
    refresh.assert_async().await;
}

#[tokio::test]
async fn refresh_failure_requeues_and_keeps_old_directory() {
    let mut registry = mockito::Server::new_async().await;
    let refresh = registry
        .mock("GET", "/banks")
        .with_status(500)
        .with_body("registry down")
        .create_async()
        .await;

    let h = harness(&format!("{}/banks", registry.url()));
    h.banks
        .replace_all(&[bank("111", "https://one.example/transactions")])
        .await
        .unwrap();

    h.transactions
        .save(&transaction("100000001", "999000002", 100))
        .await
        .unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.requeued, 1);

    let pending = single_with_status(&h.transactions, TransactionStatus::Pending).await;
    let detail = pending.status_detail.expect("refresh failure detail");
    assert!(
        detail.starts_with("Central bank refresh failed:"),
        "unexpected detail: {}",
        detail
    );

    // Failure left the previous directory intact, and no refund happened.
    assert!(h.banks.find_by_prefix("111").await.unwrap().is_some());
    assert!(h.accounts.find_by_number("100000001").await.is_err());
    refresh.assert_async().await;
}

#[tokio::test]
async fn refresh_on_miss_finds_newly_registered_bank() {
    let mut bank_server = mockito::Server::new_async().await;
    let url = format!("{}/transactions", bank_server.url());
    let _send = bank_server
        .mock("POST", "/transactions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"receiverName": "Juhan Juurikas"}).to_string())
        .create_async()
        .await;

    let mut registry = mockito::Server::new_async().await;
    let _refresh = registry
        .mock("GET", "/banks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([{"bankPrefix": "352", "transactionUrl": url, "name": "Krooni"}]).to_string())
        .create_async()
        .await;

    let h = harness(&format!("{}/banks", registry.url()));
    h.transactions
        .save(&transaction("100000001", "352000002", 100))
        .await
        .unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn concurrent_refunds_against_one_account_lose_nothing() {
    let h = harness("http://127.0.0.1:1/banks");

    h.accounts.save(&account("100000001", 0)).await.unwrap();
    let old = Utc::now() - Duration::days(4);
    h.transactions
        .save(&transaction_created_at("100000001", "999000002", 100, old))
        .await
        .unwrap();
    h.transactions
        .save(&transaction_created_at("100000001", "888000003", 50, old))
        .await
        .unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.picked, 2);
    assert_eq!(summary.failed, 2);

    let balance = h.accounts.find_by_number("100000001").await.unwrap().balance;
    assert_eq!(balance, BigDecimal::from(150));
}

#[tokio::test]
async fn in_progress_transactions_are_not_picked_up() {
    let h = harness("http://127.0.0.1:1/banks");

    let mut tx = transaction("100000001", "352000002", 100);
    tx.status = TransactionStatus::InProgress;
    h.transactions.save(&tx).await.unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.picked, 0);

    let untouched = single_with_status(&h.transactions, TransactionStatus::InProgress).await;
    assert_eq!(untouched.id, tx.id);
    assert_eq!(untouched.status_detail, None);
}

#[tokio::test]
async fn refund_with_missing_account_still_fails_transaction() {
    let h = harness("http://127.0.0.1:1/banks");

    // No account seeded: the refund lookup fails and is swallowed.
    let tx = transaction_created_at("100000001", "999000002", 100, Utc::now() - Duration::days(4));
    h.transactions.save(&tx).await.unwrap();

    let summary = h.processor.run_pass().await.unwrap();
    assert_eq!(summary.failed, 1);

    let failed = single_with_status(&h.transactions, TransactionStatus::Failed).await;
    assert_eq!(failed.status_detail.as_deref(), Some("Expired"));
}
