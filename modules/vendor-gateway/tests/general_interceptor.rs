//! Fintech surface: retry, re-authentication and passthrough behaviour.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{bearer, fail, general, open_request, respond, sealed};
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};
use vendor_gateway::{
    GatewayError, Interceptor, PreparedCall, ResponseDisposition, VendorSurface, paths,
};
use vendor_http::TransportError;

const BODY: &str = r#"{"referenceId":"REF-1"}"#;

fn status_call() -> PreparedCall {
    PreparedCall::new(Method::POST, paths::BENEFICIARY_STATUS, BODY)
}

#[tokio::test]
async fn every_attempt_seals_the_same_plaintext() {
    let h = general(vec![
        fail(TransportError::Connect("reset".into())),
        fail(TransportError::Timeout(std::time::Duration::from_secs(5))),
        sealed(VendorSurface::Fintech, r#"{"status":"ACTIVE"}"#),
    ]);

    let response = h.interceptor.execute(status_call()).await.unwrap();
    assert_eq!(response.disposition, ResponseDisposition::Decrypted);
    assert_eq!(response.body.as_ref(), br#"{"status":"ACTIVE"}"#);

    let sent = h.transport.requests();
    assert_eq!(sent.len(), 3);
    for request in &sent {
        assert_eq!(open_request(VendorSurface::Fintech, request), BODY.as_bytes());
        assert_eq!(request.url, "https://vendor.test/nbfc/v1/upi/beneficiary/status");
        assert!(request.headers.get("x-transaction-id").is_none());
    }
    assert_ne!(sent[0].body, sent[1].body);
    assert_eq!(h.transport.tokens_issued(), 1);
}

#[tokio::test]
async fn internal_headers_added_by_caller_never_reach_vendor() {
    let h = general(vec![sealed(VendorSurface::Fintech, "{}")]);
    let call = PreparedCall::new(Method::POST, paths::BENEFICIARY_STATUS, "{}")
        .with_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_static("user-9"),
        )
        .with_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-1"),
        )
        .with_header(
            HeaderName::from_static("x-app-version"),
            HeaderValue::from_static("4.2.0"),
        )
        .with_header(
            HeaderName::from_static("x-channel"),
            HeaderValue::from_static("mobile"),
        );
    assert_eq!(call.context().user_id.as_deref(), Some("user-9"));

    h.interceptor.execute(call).await.unwrap();

    let sent = h.transport.requests();
    assert_eq!(sent.len(), 1);
    for name in ["x-user-id", "x-request-id", "x-app-version"] {
        assert!(sent[0].headers.get(name).is_none(), "{name} was forwarded");
    }
    assert_eq!(sent[0].headers.get("x-channel").unwrap(), "mobile");
}

#[tokio::test]
async fn transport_failures_exhaust_attempts() {
    let h = general(vec![
        fail(TransportError::Connect("refused".into())),
        fail(TransportError::Connect("refused".into())),
        fail(TransportError::Connect("refused".into())),
    ]);

    let err = h.interceptor.execute(status_call()).await.unwrap_err();
    let GatewayError::AttemptsExhausted { attempts, last } = err else {
        panic!("expected exhaustion, got {err}");
    };
    assert_eq!(attempts, 3);
    assert!(matches!(*last, GatewayError::Transport(TransportError::Connect(_))));
    assert_eq!(h.transport.requests().len(), 3);
}

#[tokio::test]
async fn fatal_vendor_error_stops_after_one_attempt() {
    let h = general(vec![
        sealed(
            VendorSurface::Fintech,
            r#"{"ErrorCode":"Z9","ErrorMessage":"Invalid beneficiary"}"#,
        ),
        sealed(VendorSurface::Fintech, "{}"),
    ]);

    let err = h.interceptor.execute(status_call()).await.unwrap_err();
    let GatewayError::VendorFatal(classified) = &err else {
        panic!("expected fatal vendor error, got {err}");
    };
    assert_eq!(classified.vendor_code, "Z9");
    assert_eq!(err.user_message(), Some("Invalid beneficiary"));
    assert_eq!(h.transport.requests().len(), 1);
    assert_eq!(h.transport.remaining(), 1);
}

#[tokio::test]
async fn transient_vendor_code_is_retried() {
    let h = general(vec![
        sealed(
            VendorSurface::Fintech,
            r#"{"ErrorCode":"96","ErrorMessage":"System malfunction"}"#,
        ),
        sealed(VendorSurface::Fintech, r#"{"status":"ACTIVE"}"#),
    ]);

    let response = h.interceptor.execute(status_call()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(h.transport.requests().len(), 2);
}

#[tokio::test]
async fn transient_code_on_every_attempt_keeps_friendly_message() {
    let upi_timeout = r#"{"Response":{"ResponseCode":"U09","ResponseMessage":"RESPONSE TIMEOUT"}}"#;
    let h = general(vec![
        sealed(VendorSurface::Fintech, upi_timeout),
        sealed(VendorSurface::Fintech, upi_timeout),
        sealed(VendorSurface::Fintech, upi_timeout),
    ]);

    let err = h.interceptor.execute(status_call()).await.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(
        err.user_message(),
        Some("The payment network timed out. Please try again.")
    );
    assert_eq!(err.vendor_error().unwrap().vendor_message, "RESPONSE TIMEOUT");
}

#[tokio::test]
async fn unauthorized_refreshes_credential_once() {
    let h = general(vec![
        respond(401, ""),
        sealed(VendorSurface::Fintech, r#"{"status":"ACTIVE"}"#),
    ]);

    h.interceptor.execute(status_call()).await.unwrap();

    let sent = h.transport.requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(bearer(&sent[0]), "Bearer tok-1");
    assert_eq!(bearer(&sent[1]), "Bearer tok-2");
    assert_eq!(h.store.deletes(), 1);
    assert_eq!(h.transport.tokens_issued(), 2);
}

#[tokio::test]
async fn repeated_unauthorized_ends_in_auth_expired() {
    let h = general(vec![respond(401, ""), respond(401, ""), respond(401, "")]);

    let err = h.interceptor.execute(status_call()).await.unwrap_err();
    let GatewayError::AttemptsExhausted { last, .. } = err else {
        panic!("expected exhaustion");
    };
    assert!(matches!(*last, GatewayError::AuthExpired));
    assert_eq!(h.store.deletes(), 3);
}

#[tokio::test]
async fn raw_error_object_is_classified_without_decryption() {
    let h = general(vec![respond(
        200,
        r#"{"ErrorCode":"Z9","ErrorMessage":"Account frozen"}"#,
    )]);

    let err = h.interceptor.execute(status_call()).await.unwrap_err();
    assert!(matches!(err, GatewayError::VendorFatal(_)));
    assert_eq!(err.user_message(), Some("Account frozen"));
}

#[tokio::test]
async fn raw_success_object_is_returned_as_plaintext() {
    let h = general(vec![respond(
        200,
        r#"{"ErrorCode":"00","ErrorMessage":"Success"}"#,
    )]);

    let response = h.interceptor.execute(status_call()).await.unwrap();
    assert_eq!(response.disposition, ResponseDisposition::Plaintext);
}

#[tokio::test]
async fn non_json_200_is_a_cipher_error() {
    let h = general(vec![respond(200, "<html>maintenance</html>")]);

    let err = h.interceptor.execute(status_call()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Cipher(_)));
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn other_statuses_pass_through_untouched() {
    let h = general(vec![respond(500, "upstream exploded")]);

    let response = h.interceptor.execute(status_call()).await.unwrap();
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.disposition, ResponseDisposition::Unclassified);
    assert_eq!(response.body.as_ref(), b"upstream exploded");
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn allow_listed_paths_skip_classification() {
    let h = general(vec![sealed(
        VendorSurface::Fintech,
        r#"{"ErrorCode":"Z9","ErrorMessage":"looks like an error"}"#,
    )]);

    let call = PreparedCall::new(Method::POST, paths::LIST_KEYS, "{}");
    let response = h.interceptor.execute(call).await.unwrap();
    assert_eq!(response.disposition, ResponseDisposition::Decrypted);
    assert_eq!(
        response.body.as_ref(),
        br#"{"ErrorCode":"Z9","ErrorMessage":"looks like an error"}"#
    );
}

#[tokio::test]
async fn token_path_travels_in_plaintext() {
    let h = general(Vec::new());

    let call = PreparedCall::new(Method::POST, paths::TOKEN, "grant_type=client_credentials");
    let response = h.interceptor.execute(call).await.unwrap();
    assert_eq!(response.disposition, ResponseDisposition::Plaintext);
    let token: serde_json::Value = response.json().unwrap();
    assert_eq!(token["access_token"], "tok-2");
}
