//! Integration tests for login, request execution and logoff
//!
//! Scripted transports pin down the exact wire sequence; the simulated
//! gateway covers the behavior across session expiry.

mod common;

use common::*;
use fritz_core::{Ain, SessionId};
use fritz_network::mock::{MockGateway, ScriptedTransport, session_info_xml};
use fritz_network::{
    ClientError, FritzClient, GatewayResponse, HttpResponse, ResponseFormat, TransportError,
};
use fritz_protocol::{GatewayRequest, SwitchCommand};
use std::sync::Arc;

const ZERO_SID: &str = "0000000000000000";

/// Legacy handshake answered by a scripted gateway
#[tokio::test]
async fn test_legacy_login_end_to_end() {
    init_tracing();

    let transport = Arc::new(ScriptedTransport::new([
        HttpResponse::ok(session_info_xml(ZERO_SID, "1234567z", 0)),
        HttpResponse::ok(session_info_xml("affe1234affe1234", "1234567z", 0)),
        HttpResponse::ok(session_info_xml("affe1234affe1234", "1234567z", 0)),
        HttpResponse::ok("087610000434\n"),
    ]));
    let client = FritzClient::with_transport(
        Arc::clone(&transport),
        config_without_keep_alive("", "äbc"),
    );

    let sid = client.login().await.unwrap();
    assert_eq!(sid.as_str(), "affe1234affe1234");
    assert!(client.is_logged_in());

    let switches = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await
        .unwrap();
    assert_eq!(switches, "087610000434");

    assert_eq!(
        transport.requests(),
        vec![
            "/login_sid.lua?version=2",
            "/login_sid.lua?version=2&username=&response=1234567z-9e224a41eeefa284df7bb0f26c2913e2",
            "/login_sid.lua?version=2&sid=affe1234affe1234",
            "/webservices/homeautoswitch.lua?switchcmd=getswitchlist&sid=affe1234affe1234",
        ]
    );
}

/// A single 403 costs one re-login and one retry
#[tokio::test]
async fn test_forbidden_once_relogs_and_retries() {
    init_tracing();

    let transport = Arc::new(ScriptedTransport::new([
        HttpResponse::new(403, ""),
        HttpResponse::ok(session_info_xml(ZERO_SID, "1234567z", 0)),
        HttpResponse::ok(session_info_xml("0123456789abcdef", "1234567z", 0)),
        HttpResponse::ok(session_info_xml("0123456789abcdef", "1234567z", 0)),
        HttpResponse::ok("1\n"),
    ]));
    let client = FritzClient::with_transport(
        Arc::clone(&transport),
        config_without_keep_alive("", "äbc"),
    );

    let ain = Ain::new("087610000434").unwrap();
    let state = client
        .home_auto_text(SwitchCommand::GetSwitchState, Some(&ain), &[])
        .await
        .unwrap();

    assert_eq!(state, "1");
    assert_eq!(transport.request_count(), 5);
    assert_eq!(transport.remaining(), 0);
    assert_eq!(client.session_id().as_str(), "0123456789abcdef");

    let requests = transport.requests();
    assert!(requests[0].ends_with("&sid=0000000000000000"));
    assert!(requests[4].ends_with("&sid=0123456789abcdef"));
}

/// A gateway that answers 403 to everything ends in SessionLost
#[tokio::test]
async fn test_always_forbidden_terminates() {
    let transport = Arc::new(ScriptedTransport::new([]).with_fallback(HttpResponse::new(403, "")));
    let client = FritzClient::with_transport(
        Arc::clone(&transport),
        config_without_keep_alive(USER, PASSWORD),
    );

    let result = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await;

    assert!(matches!(result, Err(ClientError::SessionLost)));
    assert_eq!(transport.request_count(), 2);
    assert!(!client.is_logged_in());
}

/// Fresh session that is still refused: exactly one retry
#[tokio::test]
async fn test_forbidden_after_relogin_is_session_lost() {
    let gateway = gateway();
    let client = client(&gateway);
    client.login().await.unwrap();
    gateway.forbid_commands();

    let result = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await;

    assert!(matches!(result, Err(ClientError::SessionLost)));
    assert_eq!(gateway.home_auto_requests(), 2);
    assert_eq!(gateway.login_attempts(), 2);
}

#[tokio::test]
async fn test_expired_session_renewed_transparently() {
    init_tracing();

    let gateway = gateway();
    let client = client(&gateway);
    let first = client.login().await.unwrap();
    gateway.expire_session();

    let switches = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await
        .unwrap();

    assert_eq!(switches, "087610000434,087610000435");
    assert_ne!(client.session_id(), first);
    assert_eq!(gateway.active_session(), Some(client.session_id()));
    assert_eq!(gateway.login_attempts(), 2);
    assert_eq!(gateway.home_auto_requests(), 2);
}

/// Requests without an explicit login authenticate on the first 403
#[tokio::test]
async fn test_implicit_login_starts_keep_alive() {
    let gateway = gateway();
    let client = client(&gateway);
    assert!(!client.is_keep_alive_running());

    client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await
        .unwrap();

    assert!(client.is_logged_in());
    assert!(client.is_keep_alive_running());
    assert_eq!(gateway.login_attempts(), 1);
}

#[tokio::test]
async fn test_rejected_login_reports_block_time() {
    let gateway = gateway();
    gateway.reject_logins(32);
    let client = client(&gateway);

    let result = client.login().await;

    assert!(matches!(
        result,
        Err(ClientError::Credentials { block_time: 32 })
    ));
    assert_eq!(client.session_id(), SessionId::INVALID);
    assert!(!client.is_keep_alive_running());
}

#[tokio::test]
async fn test_wrong_password() {
    let gateway = gateway();
    let client = FritzClient::with_transport(Arc::clone(&gateway), config(USER, "wrong"));

    assert!(matches!(
        client.login().await,
        Err(ClientError::Credentials { block_time: 0 })
    ));
    assert_eq!(gateway.login_attempts(), 1);
    assert_eq!(gateway.session_checks(), 0);
}

/// Credentials accepted, but the gateway does not confirm the session
#[tokio::test]
async fn test_unconfirmed_session_is_credential_error() {
    let transport = Arc::new(ScriptedTransport::new([
        HttpResponse::ok(session_info_xml(ZERO_SID, "1234567z", 0)),
        HttpResponse::ok(session_info_xml("affe1234affe1234", "1234567z", 0)),
        HttpResponse::ok(session_info_xml(ZERO_SID, "1234567z", 7)),
    ]));
    let client = FritzClient::with_transport(Arc::clone(&transport), config("", "äbc"));

    let result = client.login().await;

    assert!(matches!(
        result,
        Err(ClientError::Credentials { block_time: 7 })
    ));
    assert_eq!(client.session_id(), SessionId::INVALID);
    assert!(!client.is_logged_in());
    assert!(!client.is_keep_alive_running());
    assert_eq!(transport.request_count(), 3);
    assert_eq!(
        transport.requests()[2],
        "/login_sid.lua?version=2&sid=affe1234affe1234"
    );
}

/// Rejected re-login during a request surfaces as SessionLost
#[tokio::test]
async fn test_rejected_relogin_is_session_lost() {
    let gateway = gateway();
    let client = client(&gateway);
    client.login().await.unwrap();

    gateway.expire_session();
    gateway.reject_logins(0);

    let result = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await;
    assert!(matches!(result, Err(ClientError::SessionLost)));
    assert!(!client.is_logged_in());
    assert!(!client.is_keep_alive_running());
}

/// Empty user name falls back to the gateway's last user
#[tokio::test]
async fn test_empty_username_uses_last_user() {
    let gateway = gateway();
    let client = FritzClient::with_transport(Arc::clone(&gateway), config("", PASSWORD));

    client.login().await.unwrap();
    assert!(client.is_logged_in());
}

#[tokio::test]
async fn test_open_access_skips_challenge_response() {
    let gateway = Arc::new(MockGateway::new("", "").with_open_access());
    let client = FritzClient::with_transport(Arc::clone(&gateway), config("", ""));

    client.login().await.unwrap();

    assert!(client.is_logged_in());
    assert_eq!(gateway.login_attempts(), 0);
    assert_eq!(gateway.session_checks(), 1);
}

#[tokio::test]
async fn test_legacy_gateway() {
    let gateway = Arc::new(MockGateway::new(USER, "pässwörd€").with_challenge("1234567z"));
    let client = FritzClient::with_transport(Arc::clone(&gateway), config(USER, "pässwörd€"));

    client.login().await.unwrap();
    assert!(client.is_logged_in());
}

#[tokio::test]
async fn test_bad_request_is_unsupported_operation() {
    let gateway = gateway();
    gateway.set_response(SwitchCommand::GetSwitchPower, 400, "");
    let client = client(&gateway);
    client.login().await.unwrap();

    let ain = Ain::new("087610000434").unwrap();
    let result = client
        .home_auto_text(SwitchCommand::GetSwitchPower, Some(&ain), &[])
        .await;

    match result {
        Err(ClientError::UnsupportedOperation { operation }) => {
            assert_eq!(operation, "getswitchpower");
        }
        other => panic!("expected UnsupportedOperation, got {other:?}"),
    }
    // No re-login for 400
    assert_eq!(gateway.login_attempts(), 1);
}

#[tokio::test]
async fn test_server_error_is_status() {
    let gateway = gateway();
    gateway.set_response(SwitchCommand::GetSwitchList, 503, "busy");
    let client = client(&gateway);
    client.login().await.unwrap();

    let err = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 503 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_transport_error_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::from_results([Err(
        TransportError::Timeout(10_000),
    )]));
    let client = FritzClient::with_transport(
        Arc::clone(&transport),
        config_without_keep_alive(USER, PASSWORD),
    );

    let err = client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Timeout(10_000))
    ));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_xml_command() {
    let gateway = gateway();
    gateway.set_response(
        SwitchCommand::GetDeviceListInfos,
        200,
        "<devicelist version=\"1\"><device identifier=\"08761 0000434\">\
         <name>Kitchen</name></device></devicelist>",
    );
    let client = client(&gateway);
    client.login().await.unwrap();

    let doc = client
        .home_auto_xml(SwitchCommand::GetDeviceListInfos, None, &[])
        .await
        .unwrap();
    assert_eq!(doc.find_all("device").len(), 1);
    assert_eq!(doc.find("device").and_then(|d| d.child_text("name")), Some("Kitchen"));
}

#[tokio::test]
async fn test_execute_custom_request() {
    let gateway = gateway();
    let client = client(&gateway);
    client.login().await.unwrap();

    let request = GatewayRequest::home_auto(SwitchCommand::GetSwitchList)
        .build()
        .unwrap();
    let response = client.execute(&request, ResponseFormat::Text).await.unwrap();

    assert_eq!(
        response,
        GatewayResponse::Text("087610000434,087610000435\n".to_string())
    );
}

#[tokio::test]
async fn test_missing_ain_fails_before_sending() {
    let gateway = gateway();
    let client = client(&gateway);

    let result = client
        .home_auto_text(SwitchCommand::SetSwitchOn, None, &[])
        .await;

    assert!(matches!(result, Err(ClientError::Protocol(_))));
    assert_eq!(gateway.requests(), 0);
}

#[tokio::test]
async fn test_logoff() {
    let gateway = gateway();
    let client = client(&gateway);
    client.login().await.unwrap();
    assert!(client.is_keep_alive_running());

    assert!(client.logoff().await.unwrap());

    assert!(!client.is_logged_in());
    assert!(!client.is_keep_alive_running());
    assert_eq!(gateway.active_session(), None);
    assert_eq!(gateway.logouts(), 1);
}

#[tokio::test]
async fn test_logoff_without_session() {
    let gateway = gateway();
    let client = client(&gateway);

    assert!(client.logoff().await.unwrap());
    assert_eq!(gateway.requests(), 0);
}

#[tokio::test]
async fn test_logoff_refused_keeps_session() {
    let gateway = gateway();
    gateway.ignore_logout();
    let client = client(&gateway);
    let sid = client.login().await.unwrap();

    assert!(!client.logoff().await.unwrap());

    assert_eq!(client.session_id(), sid);
    assert!(client.is_keep_alive_running());
}

/// After logoff the next request logs in again
#[tokio::test]
async fn test_request_after_logoff_relogs() {
    let gateway = gateway();
    let client = client(&gateway);
    client.login().await.unwrap();
    client.logoff().await.unwrap();

    client
        .home_auto_text(SwitchCommand::GetSwitchList, None, &[])
        .await
        .unwrap();

    assert!(client.is_logged_in());
    assert_eq!(gateway.login_attempts(), 2);
}
