//! Integration tests for sending through a mocked Graph endpoint.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use graphmail_core::{EmailMessage, Error, GraphMailer, SendStatus};
use graphmail_oauth::{
    CachedAccount, MemoryTokenCache, Token, TokenCache, TokenProvider, TokenProviderConfig,
};

const SEND_PATH: &str = "/v1.0/me/sendMail";

fn supplied_token() -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let exp = (Utc::now() + Duration::hours(1)).timestamp();
    let body = URL_SAFE_NO_PAD.encode(json!({ "exp": exp }).to_string());
    format!("{header}.{body}.sig")
}

fn mailer(server: &MockServer, token: &str) -> GraphMailer {
    let config = TokenProviderConfig::new("client-id", "contoso")
        .with_authority(server.uri())
        .with_token(token);
    let tokens = TokenProvider::new(config).unwrap().without_interactive();
    GraphMailer::new(tokens)
        .unwrap()
        .with_base_url(&format!("{}/v1.0", server.uri()))
        .unwrap()
}

fn message() -> EmailMessage {
    EmailMessage::new("Quarterly report", "Numbers inside.")
        .to("ada@contoso.com")
        .cc("grace@contoso.com")
        .bcc("audit@contoso.com")
}

#[tokio::test]
async fn accepted_send_echoes_supplied_token() {
    let server = MockServer::start().await;
    let token = supplied_token();
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .and(header("accept", "application/json"))
        .and(body_partial_json(json!({
            "saveToSentItems": true,
            "message": {
                "subject": "Quarterly report",
                "body": { "contentType": "Text", "content": "Numbers inside." },
                "toRecipients": [{ "emailAddress": { "address": "ada@contoso.com" } }],
                "ccRecipients": [{ "emailAddress": { "address": "grace@contoso.com" } }],
                "bccRecipients": [{ "emailAddress": { "address": "audit@contoso.com" } }],
                "hasAttachments": false
            }
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let result = mailer(&server, &token).send_email(&message()).await.unwrap();

    assert!(result.is_success);
    assert_eq!(result.status, SendStatus::Succeeded);
    assert_eq!(result.token.as_deref(), Some(token.as_str()));
    assert!(!result.token_refreshed);
    assert!(result.error_message.is_none());
}

#[tokio::test]
async fn unauthorized_send_reports_status_reason_and_body() {
    let server = MockServer::start().await;
    let body = r#"{"error":{"code":"InvalidAuthenticationToken"}}"#;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string(body))
        .mount(&server)
        .await;

    let result = mailer(&server, &supplied_token())
        .send_email(&message())
        .await
        .unwrap();

    assert!(!result.is_success);
    assert_eq!(result.status, SendStatus::InvalidCredentials);
    assert!(result.token.is_none());
    let error = result.error_message.unwrap();
    assert!(error.starts_with("Error sending email: 401 - Unauthorized."));
    assert!(error.contains("InvalidAuthenticationToken"));
}

#[tokio::test]
async fn missing_mailbox_is_data_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
        .mount(&server)
        .await;

    let result = mailer(&server, &supplied_token())
        .send_email(&message())
        .await
        .unwrap();
    assert_eq!(result.status, SendStatus::DataNotFound);
    assert!(!result.is_success);
}

#[tokio::test]
async fn attachment_is_sent_as_file_attachment() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("test.pdf");
    std::fs::write(&pdf, b"%PDF").unwrap();

    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(body_partial_json(json!({
            "message": {
                "hasAttachments": true,
                "attachments": [{
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "name": "test.pdf",
                    "contentBytes": "JVBERg==",
                    "contentType": "application/pdf"
                }]
            }
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let result = mailer(&server, &supplied_token())
        .send(
            &["ada@contoso.com".to_string()],
            "Report",
            "Attached.",
            None,
            None,
            Some(&[pdf][..]),
        )
        .await
        .unwrap();
    assert!(result.is_success);
}

#[tokio::test]
async fn unreadable_attachment_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.pdf");
    let err = mailer(&server, &supplied_token())
        .send_email(&message().attach(&missing))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Attachment { path, .. } if path == missing));
}

#[tokio::test]
async fn message_without_recipients_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let err = mailer(&server, &supplied_token())
        .send_email(&EmailMessage::new("Subject", "Body"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoRecipients));
}

#[tokio::test]
async fn cached_token_is_reported_as_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryTokenCache::new());
    cache
        .store(
            &CachedAccount {
                home_account_id: "oid.tid".to_string(),
                username: None,
            },
            &Token::new("cached-token", "Bearer")
                .with_expires_at(Utc::now() + Duration::hours(1))
                .with_scope("Mail.Send"),
        )
        .unwrap();

    let config = TokenProviderConfig::new("client-id", "contoso").with_authority(server.uri());
    let tokens = TokenProvider::new(config)
        .unwrap()
        .with_cache(cache)
        .without_interactive();
    let mailer = GraphMailer::new(tokens)
        .unwrap()
        .with_base_url(&format!("{}/v1.0", server.uri()))
        .unwrap();

    let result = mailer.send_email(&message()).await.unwrap();
    assert!(result.is_success);
    assert_eq!(result.token.as_deref(), Some("cached-token"));
    assert!(result.token_refreshed);
}

#[tokio::test]
async fn missing_token_without_interaction_is_an_auth_error() {
    let server = MockServer::start().await;
    let config = TokenProviderConfig::new("client-id", "contoso").with_authority(server.uri());
    let tokens = TokenProvider::new(config).unwrap().without_interactive();
    let mailer = GraphMailer::new(tokens)
        .unwrap()
        .with_base_url(&format!("{}/v1.0", server.uri()))
        .unwrap();

    let err = mailer.send_email(&message()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Auth(graphmail_oauth::Error::InteractionRequired(_))
    ));
}
