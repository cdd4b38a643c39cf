//! Card-control surface: transaction ids, status handling and card codes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{card_control, fail, open_request, respond, sealed};
use http::Method;
use vendor_gateway::{
    GatewayError, Interceptor, PreparedCall, ResponseDisposition, VendorSurface, paths,
};
use vendor_http::TransportError;

const BODY: &str = r#"{"cardId":"card-7","ecomEnabled":false}"#;

fn controls_call() -> PreparedCall {
    PreparedCall::new(Method::POST, paths::CARD_CONTROLS, BODY)
}

#[tokio::test]
async fn transaction_id_is_stable_across_attempts_and_stripped() {
    let h = card_control(vec![
        respond(404, ""),
        fail(TransportError::Timeout(std::time::Duration::from_secs(5))),
        sealed(VendorSurface::CardControl, r#"{"cardId":"card-7","status":"UPDATED"}"#),
    ]);

    let response = h.interceptor.execute(controls_call()).await.unwrap();
    assert_eq!(response.disposition, ResponseDisposition::Decrypted);
    assert!(response.headers.get("x-transaction-id").is_none());

    let sent = h.transport.requests();
    assert_eq!(sent.len(), 3);
    let txn = sent[0].headers.get("x-transaction-id").unwrap().clone();
    assert!(uuid::Uuid::parse_str(txn.to_str().unwrap()).is_ok());
    for request in &sent {
        assert_eq!(request.headers.get("x-transaction-id"), Some(&txn));
        assert_eq!(open_request(VendorSurface::CardControl, request), BODY.as_bytes());
    }
}

#[tokio::test]
async fn each_call_gets_its_own_transaction_id() {
    let h = card_control(vec![
        sealed(VendorSurface::CardControl, "{}"),
        sealed(VendorSurface::CardControl, "{}"),
    ]);

    h.interceptor.execute(controls_call()).await.unwrap();
    h.interceptor.execute(controls_call()).await.unwrap();

    let sent = h.transport.requests();
    assert_ne!(
        sent[0].headers.get("x-transaction-id"),
        sent[1].headers.get("x-transaction-id")
    );
}

#[tokio::test]
async fn unexpected_statuses_are_retried() {
    let h = card_control(vec![respond(400, ""), respond(408, ""), respond(503, "")]);

    let err = h.interceptor.execute(controls_call()).await.unwrap_err();
    let GatewayError::AttemptsExhausted { attempts, last } = err else {
        panic!("expected exhaustion");
    };
    assert_eq!(attempts, 3);
    assert!(matches!(*last, GatewayError::UnexpectedStatus { status: 503 }));
}

#[tokio::test]
async fn disabled_card_service_gets_friendly_message() {
    let h = card_control(vec![sealed(
        VendorSurface::CardControl,
        r#"[{"ErrorCode":"CC102","ErrorMessage":"INTL FLAG OFF"},{"ErrorCode":"91"}]"#,
    )]);

    let err = h.interceptor.execute(controls_call()).await.unwrap_err();
    assert!(matches!(err, GatewayError::VendorFatal(_)));
    assert_eq!(
        err.user_message(),
        Some("International usage is not available for this card right now.")
    );
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn empty_error_list_is_success() {
    let h = card_control(vec![sealed(VendorSurface::CardControl, "[]")]);

    let response = h.interceptor.execute(controls_call()).await.unwrap();
    assert_eq!(response.body.as_ref(), b"[]");
}

#[tokio::test]
async fn raw_transient_error_array_is_retried() {
    let h = card_control(vec![
        respond(200, r#"[{"rc":"91","desc":"Issuer inoperative"}]"#),
        sealed(VendorSurface::CardControl, "{}"),
    ]);

    h.interceptor.execute(controls_call()).await.unwrap();
    assert_eq!(h.transport.requests().len(), 2);
}

#[tokio::test]
async fn unauthorized_refreshes_credential() {
    let h = card_control(vec![respond(401, ""), sealed(VendorSurface::CardControl, "{}")]);

    h.interceptor.execute(controls_call()).await.unwrap();
    assert_eq!(h.store.deletes(), 1);
    assert_eq!(common::bearer(&h.transport.requests()[1]), "Bearer tok-2");
}

#[tokio::test]
async fn envelope_sealed_with_fintech_key_does_not_open() {
    let h = card_control(vec![sealed(VendorSurface::Fintech, "{}")]);

    let err = h.interceptor.execute(controls_call()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Cipher(_)));
}
