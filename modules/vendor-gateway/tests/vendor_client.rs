//! Typed client and tower adapter, over the scripted transport and over a
//! real HTTP server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{ScriptedTransport, gateway_config, respond, sealed};
use http_body_util::Full;
use httpmock::prelude::*;
use tower::ServiceExt;
use vendor_auth::InMemoryCredentialStore;
use vendor_gateway::dto::{BeneficiaryStatusRequest, CardControlRequest, ListKeysRequest};
use vendor_gateway::{
    CallerContext, GatewayError, InterceptorService, ResponseDisposition, VendorClient,
    VendorSurface,
};

fn client(transport: &Arc<ScriptedTransport>) -> VendorClient {
    VendorClient::with_transport(
        &gateway_config(),
        transport.clone(),
        Arc::new(InMemoryCredentialStore::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn typed_call_round_trips_through_both_surfaces() {
    let transport = ScriptedTransport::new(vec![
        sealed(
            VendorSurface::Fintech,
            r#"{"keys":[{"code":"NPCI","ki":"20150822","owner":"NPCI","keyValue":"MIIB"}]}"#,
        ),
        sealed(VendorSurface::CardControl, r#"{"cardId":"card-7","status":"UPDATED"}"#),
    ]);
    let client = client(&transport);
    let ctx = CallerContext {
        request_id: Some("req-42".into()),
        ..CallerContext::default()
    };

    let keys = client
        .list_keys(&ListKeysRequest::default(), &ctx)
        .await
        .unwrap();
    assert_eq!(keys.keys.len(), 1);
    assert_eq!(keys.keys[0].key_value, "MIIB");

    let controls = client
        .set_card_controls(
            &CardControlRequest {
                card_id: "card-7".into(),
                ..CardControlRequest::default()
            },
            &ctx,
        )
        .await
        .unwrap();
    assert_eq!(controls.status, "UPDATED");

    // one credential serves both surfaces
    assert_eq!(transport.tokens_issued(), 1);
    let sent = transport.requests();
    assert!(sent[0].url.ends_with("/nbfc/v1/upi/listKeys"));
    assert!(sent[1].url.ends_with("/cardcontrol/v1/card/controls"));
}

#[tokio::test]
async fn passthrough_status_is_an_error_for_typed_callers() {
    let transport = ScriptedTransport::new(vec![respond(502, "bad gateway")]);

    let err = client(&transport)
        .beneficiary_status(
            &BeneficiaryStatusRequest {
                reference_id: "REF-1".into(),
            },
            &CallerContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::UnexpectedStatus { status: 502 }));
}

#[tokio::test]
async fn undecodable_payload_is_a_decode_error() {
    let transport =
        ScriptedTransport::new(vec![sealed(VendorSurface::Fintech, r#"{"keys":"nope"}"#)]);

    let err = client(&transport)
        .list_keys(&ListKeysRequest::default(), &CallerContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn tower_service_drains_request_and_forwards_headers() {
    let transport = ScriptedTransport::new(vec![sealed(VendorSurface::Fintech, "{}")]);
    let client = client(&transport);
    let service = InterceptorService::new(Arc::clone(client.fintech()));

    let request = http::Request::builder()
        .method("POST")
        .uri("/nbfc/v1/upi/beneficiary/status")
        .header("x-request-id", "req-7")
        .header("x-channel", "mobile")
        .body(Full::new(Bytes::from_static(br#"{"referenceId":"REF-9"}"#)))
        .unwrap();

    let response = service.oneshot(request).await.unwrap();
    assert_eq!(response.disposition, ResponseDisposition::Decrypted);

    let sent = transport.requests();
    assert_eq!(sent[0].headers.get("x-channel").unwrap(), "mobile");
    assert!(sent[0].headers.get("x-request-id").is_none());
    assert_eq!(
        common::open_request(VendorSurface::Fintech, &sent[0]),
        br#"{"referenceId":"REF-9"}"#
    );
}

#[tokio::test]
async fn end_to_end_over_http() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path(common::TOKEN_PATH);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token":"tok-live","expires_in":600,"token_type":"Bearer"}"#);
    });
    let envelope = common::cipher(VendorSurface::Fintech)
        .encrypt(br#"{"referenceId":"REF-1","status":"ACTIVE"}"#, None)
        .unwrap()
        .to_body()
        .unwrap();
    let status = server.mock(|when, then| {
        when.method(POST)
            .path("/nbfc/v1/upi/beneficiary/status")
            .header("authorization", "Bearer tok-live")
            .header("content-type", "application/json");
        then.status(200).body(envelope.to_vec());
    });

    let mut config = gateway_config();
    config.base_url = server.base_url();
    config.credentials.base_url = server.base_url();
    let client =
        VendorClient::from_config(&config, Arc::new(InMemoryCredentialStore::new())).unwrap();

    let request = BeneficiaryStatusRequest {
        reference_id: "REF-1".into(),
    };
    for _ in 0..2 {
        let answer = client
            .beneficiary_status(&request, &CallerContext::default())
            .await
            .unwrap();
        assert_eq!(answer.status, "ACTIVE");
    }

    token.assert_calls(1);
    status.assert_calls(2);
}
