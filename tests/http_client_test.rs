// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - HTTP Client Tests
 * Tests for session header merging, body encoding, session refresh and retries
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use lonkero_authz::errors::NetworkError;
use lonkero_authz::http_client::HttpClient;
use lonkero_authz::session::AuthSession;
use lonkero_authz::types::{RequestBody, RequestData};
use serde_json::json;
use wiremock::{
    matchers::{body_json, body_string, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_send_applies_session_over_captured_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/invoices/INV-1"))
        .and(header("cookie", "sid=session"))
        .and(header("authorization", "Bearer fresh"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invoice"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 0).unwrap();
    let request = RequestData::new("GET", &format!("{}/invoices/INV-1", mock_server.uri()))
        .with_header("Cookie", "sid=captured")
        .with_header("Authorization", "Bearer stale")
        .with_header("Accept", "application/json");
    let mut session = AuthSession::new()
        .with_cookie("sid", "session")
        .with_auth_header("Bearer fresh");

    let response = client.send(&request, &mut session).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "invoice");
    assert_eq!(client.send_count(), 1);
}

#[tokio::test]
async fn test_error_statuses_are_responses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/projects/P-1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 3).unwrap();
    let request = RequestData::new("DELETE", &format!("{}/projects/P-1", mock_server.uri()));
    let response = client.send(&request, &mut AuthSession::new()).await.unwrap();

    assert_eq!(response.status_code, 403);
    assert!(response.contains("Forbidden"));
}

#[tokio::test]
async fn test_server_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/always-fail"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 3).unwrap();
    let request = RequestData::new("GET", &format!("{}/always-fail", mock_server.uri()));
    let response = client.send(&request, &mut AuthSession::new()).await.unwrap();

    assert_eq!(response.status_code, 500);
}

#[tokio::test]
async fn test_json_text_body_is_sent_structured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/projects"))
        .and(body_json(json!({"project_id": "P-2", "name": "Roadmap"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 0).unwrap();
    let request = RequestData::new("PUT", &format!("{}/api/projects", mock_server.uri()))
        .with_header("content-type", "application/json")
        .with_header("content-length", "999")
        .with_body(RequestBody::Text(
            "{ \"project_id\": \"P-2\", \"name\": \"Roadmap\" }".to_string(),
        ));

    let response = client.send(&request, &mut AuthSession::new()).await.unwrap();
    assert_eq!(response.status_code, 204);
}

#[tokio::test]
async fn test_invalid_json_body_falls_back_to_raw() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/raw"))
        .and(body_string("{broken"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 0).unwrap();
    let request = RequestData::new("POST", &format!("{}/api/raw", mock_server.uri()))
        .with_header("content-type", "application/json")
        .with_body(RequestBody::Text("{broken".to_string()));

    let response = client.send(&request, &mut AuthSession::new()).await.unwrap();
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_form_body_gets_default_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/invoices/update"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("invoice_id=INV-7&note=a%26b"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 0).unwrap();
    let request = RequestData::new("POST", &format!("{}/invoices/update", mock_server.uri()))
        .with_body(RequestBody::Form(vec![
            ("invoice_id".to_string(), "INV-7".to_string()),
            ("note".to_string(), "a&b".to_string()),
        ]));

    let response = client.send(&request, &mut AuthSession::new()).await.unwrap();
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_session_refreshes_from_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rotate"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sid=rotated; Path=/; HttpOnly")
                .insert_header("x-csrf-token", "csrf-next"),
        )
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 0).unwrap();
    let request = RequestData::new("GET", &format!("{}/rotate", mock_server.uri()));
    let mut session = AuthSession::new().with_cookie("sid", "original");

    client.send(&request, &mut session).await.unwrap();

    assert_eq!(session.cookies.get("sid").map(String::as_str), Some("rotated"));
    assert_eq!(session.csrf_token.as_deref(), Some("csrf-next"));
}

#[tokio::test]
async fn test_redirects_are_observed_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = HttpClient::new(30, 0).unwrap();
    let request = RequestData::new("GET", &format!("{}/admin", mock_server.uri()));
    let response = client.send(&request, &mut AuthSession::new()).await.unwrap();

    assert_eq!(response.status_code, 302);
    assert_eq!(response.header("location").as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let dead_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = HttpClient::new(5, 2).unwrap();
    let request = RequestData::new("GET", &format!("http://127.0.0.1:{}/", dead_port));
    let result = client.send(&request, &mut AuthSession::new()).await;

    let err = result.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(client.send_count(), 0);
}

#[tokio::test]
async fn test_closed_client_rejects_sends() {
    let client = HttpClient::new(30, 0).unwrap();
    client.close();

    let request = RequestData::new("GET", "http://127.0.0.1:9/");
    let err = client.send(&request, &mut AuthSession::new()).await.unwrap_err();

    assert_eq!(err, NetworkError::ClientClosed);
}
