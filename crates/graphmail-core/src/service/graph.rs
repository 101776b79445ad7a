//! Sending mail through Microsoft Graph.
//!
//! One message is one `POST /me/sendMail`. No retries: the caller gets a
//! [`SendResult`] for any HTTP response and an [`Error`] for everything that
//! prevented a response (token, attachment, transport).

use super::payload::SendMailRequest;
use crate::error::{Error, Result};
use crate::message::EmailMessage;
use graphmail_oauth::TokenProvider;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

/// Microsoft Graph v1.0 endpoint.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Outcome classification of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendStatus {
    /// Graph accepted the message.
    Succeeded,
    /// Graph rejected the message for another reason.
    Failed,
    /// The token was rejected (401) or lacks permission (403).
    InvalidCredentials,
    /// The mailbox or user was not found (404).
    DataNotFound,
}

impl SendStatus {
    /// Classifies an HTTP status.
    #[must_use]
    pub fn from_http(status: StatusCode) -> Self {
        match status {
            s if s.is_success() => Self::Succeeded,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::InvalidCredentials,
            StatusCode::NOT_FOUND => Self::DataNotFound,
            _ => Self::Failed,
        }
    }
}

/// Result of a send that reached Graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    /// True for a 2xx response.
    pub is_success: bool,
    /// Status code, reason phrase and response body on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Classification.
    pub status: SendStatus,
    /// Access token used, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// True if the token used differs from the one supplied in the
    /// configuration, so callers can persist the new one.
    pub token_refreshed: bool,
}

impl SendResult {
    fn succeeded(token: String, token_refreshed: bool) -> Self {
        Self {
            is_success: true,
            error_message: None,
            status: SendStatus::Succeeded,
            token: Some(token),
            token_refreshed,
        }
    }

    fn failed(status: StatusCode, body: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown");
        Self {
            is_success: false,
            error_message: Some(format!(
                "Error sending email: {} - {reason}. Details: {body}",
                status.as_u16()
            )),
            status: SendStatus::from_http(status),
            token: None,
            token_refreshed: false,
        }
    }
}

/// Sends mail as the signed-in user.
#[derive(Debug)]
pub struct GraphMailer {
    tokens: TokenProvider,
    http: reqwest::Client,
    send_url: Url,
}

impl GraphMailer {
    /// Creates a mailer against the public Graph endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built.
    pub fn new(tokens: TokenProvider) -> Result<Self> {
        Ok(Self {
            tokens,
            http: reqwest::Client::new(),
            send_url: send_mail_url(GRAPH_BASE_URL)?,
        })
    }

    /// Points the mailer at another Graph base URL (national clouds, tests).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.send_url = send_mail_url(base_url)?;
        Ok(self)
    }

    /// Replaces the HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The token provider used for each send.
    #[must_use]
    pub const fn token_provider(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Sends `message`.
    ///
    /// Attachments are read before a token is requested, so a missing file
    /// never costs the user a sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no recipients, an attachment cannot be
    /// read, no token can be obtained, or the request never gets a response.
    /// A response with a non-success status is not an error; it comes back
    /// as a failed [`SendResult`].
    pub async fn send_email(&self, message: &EmailMessage) -> Result<SendResult> {
        message.validate()?;
        let attachments = message.load_attachments().await?;
        let request = SendMailRequest::new(message, &attachments);

        let token = self.tokens.access_token().await?;
        let token_refreshed = self.tokens.config().token() != Some(token.as_str());

        info!(
            "Sending \"{}\" to {} recipient(s) with {} attachment(s)",
            message.subject,
            message.to.len() + message.cc.len() + message.bcc.len(),
            attachments.len()
        );
        let response = self
            .http
            .post(self.send_url.clone())
            .bearer_auth(&token)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!("Graph sendMail responded {status}");
        if status.is_success() {
            return Ok(SendResult::succeeded(token, token_refreshed));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable response body: {e}>"));
        warn!("Graph sendMail failed with {status}");
        Ok(SendResult::failed(status, &body))
    }

    /// Sends a message given as separate parts.
    ///
    /// Absent `cc`, `bcc` and `attachments` are treated as empty.
    ///
    /// # Errors
    ///
    /// Same as [`GraphMailer::send_email`].
    pub async fn send(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
        cc: Option<&[String]>,
        bcc: Option<&[String]>,
        attachments: Option<&[PathBuf]>,
    ) -> Result<SendResult> {
        let message = EmailMessage {
            to: to.to_vec(),
            cc: cc.map(<[String]>::to_vec).unwrap_or_default(),
            bcc: bcc.map(<[String]>::to_vec).unwrap_or_default(),
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: attachments.map(<[PathBuf]>::to_vec).unwrap_or_default(),
        };
        self.send_email(&message).await
    }
}

fn send_mail_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(&format!("{}/me/sendMail", base_url.trim_end_matches('/')))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("unsupported Graph URL scheme in {base_url}")));
    }
    Ok(url)
}
