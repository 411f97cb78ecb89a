mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use eventpay_api::{
    errors::ServiceError,
    services::gateway::{CheckoutUrlIssuer, PaymentRequest},
};
use serde_json::{json, Value};
use url::Url;

struct StaticIssuer(Value);

#[async_trait]
impl CheckoutUrlIssuer for StaticIssuer {
    async fn create_checkout(&self, _request: &PaymentRequest) -> Result<Value, ServiceError> {
        Ok(self.0.clone())
    }
}

struct BrokenIssuer;

#[async_trait]
impl CheckoutUrlIssuer for BrokenIssuer {
    async fn create_checkout(&self, _request: &PaymentRequest) -> Result<Value, ServiceError> {
        Err(ServiceError::ExternalApiError("issuer down".to_string()))
    }
}

fn transaction_body(order: Value) -> Value {
    json!({
        "externalTransactionId": "tx-987654321",
        "order": order,
    })
}

fn query_map(url: &Url) -> HashMap<String, String> {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

async fn create_transaction(app: &TestApp, body: Value) -> (StatusCode, Value) {
    let response = app
        .request(Method::POST, "/api/v1/payments/transactions", Some(body))
        .await;
    let status = response.status();
    (status, response_json(response).await)
}

#[tokio::test]
async fn fallback_redirect_carries_normalized_fields() {
    let app = TestApp::new().await;

    let (status, body) = create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1001", "totalAmount": "14000" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pluginTransactionId"], "54321");

    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    assert_eq!(redirect.host_str(), Some("gateway.example.com"));

    let params = query_map(&redirect);
    assert_eq!(params["id"], "54321");
    assert_eq!(params["amount"], "140.00");
    assert_eq!(params["description"], "Order Payment");
    assert_eq!(params["lang"], "EN");
    assert_eq!(params["token"], "ABCD-000001");
    assert_eq!(params["selected_method"], "1");
    assert_eq!(params["iframe"], "true");
    assert!(params["expire"].ends_with("1231"));
    assert!(params["accounts"].contains("MB|AAA-111111"));

    let success = Url::parse(&params["success_url"]).unwrap();
    let success_params = query_map(&success);
    assert_eq!(success_params["tid"], "54321");
    assert_eq!(success_params["oid"], "ord-1001");
}

#[tokio::test]
async fn decimal_total_normalizes_to_two_places() {
    let app = TestApp::new().await;

    let (status, body) = create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1", "totalAmount": "99.5" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    assert_eq!(query_map(&redirect)["amount"], "99.50");
}

#[tokio::test]
async fn nested_total_amount_is_read() {
    let app = TestApp::new().await;

    let (status, body) = create_transaction(
        &app,
        transaction_body(json!({
            "id": "ord-1",
            "description": { "totalAmount": 2550 }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    assert_eq!(query_map(&redirect)["amount"], "25.50");
}

#[tokio::test]
async fn buyer_language_is_uppercased() {
    let app = TestApp::new().await;

    let (_, body) = create_transaction(
        &app,
        transaction_body(json!({
            "id": "ord-1",
            "totalAmount": "1000",
            "description": { "buyerInfo": { "buyerLanguage": "pt" } }
        })),
    )
    .await;

    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    assert_eq!(query_map(&redirect)["lang"], "PT");
}

#[tokio::test]
async fn missing_external_transaction_id_declines() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/transactions",
            Some(json!({ "order": { "id": "ord-1", "totalAmount": "1000" } })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("Transaction ID"));
}

#[tokio::test]
async fn unusable_amount_declines() {
    let app = TestApp::new().await;

    let (status, body) = create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1", "totalAmount": "12,50" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "AMOUNT_INVALID");
}

#[tokio::test]
async fn issuer_url_is_used_verbatim() {
    let app = TestApp::with_issuer(Some(Arc::new(StaticIssuer(
        json!({ "url": "https://pay.example.com/session/x1" }),
    ))))
    .await;

    let (status, body) = create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1", "totalAmount": "1000" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["redirectUrl"], "https://pay.example.com/session/x1");
}

#[tokio::test]
async fn issuer_failure_falls_back_to_gateway_url() {
    let app = TestApp::with_issuer(Some(Arc::new(BrokenIssuer))).await;

    let (status, body) = create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1", "totalAmount": "1000" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    assert_eq!(redirect.host_str(), Some("gateway.example.com"));

    let params = query_map(&redirect);
    for key in [
        "token",
        "id",
        "amount",
        "description",
        "expire",
        "lang",
        "success_url",
        "cancel_url",
        "error_url",
        "selected_method",
        "iframe",
        "accounts",
    ] {
        assert!(params.contains_key(key), "missing key {key}");
    }
}

#[tokio::test]
async fn line_items_ride_along_in_the_success_url() {
    let app = TestApp::new().await;
    let ticket_id = "0b8f9a46-6a2d-4c9e-9a3e-1d2f3a4b5c6d";

    let (_, body) = create_transaction(
        &app,
        transaction_body(json!({
            "id": "ord-1",
            "totalAmount": "7000",
            "description": {
                "items": [
                    { "id": ticket_id, "name": "Balcony", "price": "35.00", "quantity": 2 }
                ]
            }
        })),
    )
    .await;

    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    let success = Url::parse(&query_map(&redirect)["success_url"]).unwrap();
    let success_params = query_map(&success);

    assert_eq!(success_params["items[0][Eid]"], ticket_id);
    assert_eq!(success_params["items[0][Ename]"], "Balcony");
    assert_eq!(success_params["items[0][Eprice]"], "35.00");
    assert_eq!(success_params["items[0][Equantity]"], "2");
    // The description was never set, so the sanitized item-name join wins.
    assert_eq!(query_map(&redirect)["description"], "Balcony");
}

#[tokio::test]
async fn gateway_description_is_sanitized() {
    let app = TestApp::new().await;

    let (_, body) = create_transaction(
        &app,
        transaction_body(json!({
            "id": "ord-1",
            "totalAmount": "1000",
            "description": { "text": "Gala <b>Night</b> & Friends: 2026 Edition!!!" }
        })),
    )
    .await;

    let redirect = Url::parse(body["redirectUrl"].as_str().unwrap()).unwrap();
    let description = &query_map(&redirect)["description"];
    assert!(description.chars().count() <= 20, "description too long: {description}");
    assert!(description
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace()));
}

#[tokio::test]
async fn refund_is_acknowledged() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/refunds",
            Some(json!({ "externalTransactionId": "tx-1" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["success"], true);
}

#[tokio::test]
async fn provider_config_mirrors_account_methods() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/payments/provider-config", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let methods: Vec<&str> = body["data"]["paymentMethods"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    assert_eq!(methods, vec!["MB", "CCARD", "MBWAY"]);
}

#[tokio::test]
async fn checkout_leaves_an_audit_trail() {
    let app = TestApp::new().await;

    create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1", "totalAmount": "1000" })),
    )
    .await;

    let phases = app.audit_phases().await;
    assert!(phases.iter().any(|p| p == "checkout_requested"));
    assert!(phases.iter().any(|p| p == "redirect_issued"));
}

#[tokio::test]
async fn declined_checkout_is_audited() {
    let app = TestApp::new().await;

    create_transaction(
        &app,
        transaction_body(json!({ "id": "ord-1", "totalAmount": "nonsense" })),
    )
    .await;

    let phases = app.audit_phases().await;
    assert!(phases.iter().any(|p| p == "transaction_declined"));
    assert!(!phases.iter().any(|p| p == "redirect_issued"));
}
