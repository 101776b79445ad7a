//! JSON body of the Graph `sendMail` action.

use crate::message::{Attachment, EmailMessage};
use serde::Serialize;

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Request body for `POST /me/sendMail`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    /// Keep a copy in Sent Items.
    pub save_to_sent_items: bool,
    /// The message itself.
    pub message: GraphMessage,
}

/// Graph `message` resource, limited to what is sent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMessage {
    /// Subject line.
    pub subject: String,
    /// Body.
    pub body: GraphBody,
    /// `To` recipients.
    pub to_recipients: Vec<GraphRecipient>,
    /// `Cc` recipients.
    pub cc_recipients: Vec<GraphRecipient>,
    /// `Bcc` recipients.
    pub bcc_recipients: Vec<GraphRecipient>,
    /// File attachments.
    pub attachments: Vec<GraphAttachment>,
    /// True iff `attachments` is non-empty.
    pub has_attachments: bool,
}

/// Message body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBody {
    /// `Text` or `HTML`.
    pub content_type: String,
    /// Body text.
    pub content: String,
}

/// `{ "emailAddress": { "address": ... } }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecipient {
    /// Wrapped address.
    pub email_address: GraphEmailAddress,
}

/// An address.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEmailAddress {
    /// SMTP address.
    pub address: String,
}

/// A `fileAttachment`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAttachment {
    /// Always `#microsoft.graph.fileAttachment`.
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    /// File name.
    pub name: String,
    /// Base64 content.
    pub content_bytes: String,
    /// MIME type.
    pub content_type: String,
}

impl From<&Attachment> for GraphAttachment {
    fn from(attachment: &Attachment) -> Self {
        Self {
            odata_type: FILE_ATTACHMENT_TYPE,
            name: attachment.name.clone(),
            content_bytes: attachment.content_base64(),
            content_type: attachment.content_type.clone(),
        }
    }
}

/// Maps addresses to recipient objects, one per address, in order.
#[must_use]
pub fn recipients(addresses: &[String]) -> Vec<GraphRecipient> {
    addresses
        .iter()
        .map(|address| GraphRecipient {
            email_address: GraphEmailAddress {
                address: address.clone(),
            },
        })
        .collect()
}

impl SendMailRequest {
    /// Builds the request for `message` with already-loaded attachments.
    #[must_use]
    pub fn new(message: &EmailMessage, attachments: &[Attachment]) -> Self {
        let attachments: Vec<GraphAttachment> = attachments.iter().map(Into::into).collect();
        Self {
            save_to_sent_items: true,
            message: GraphMessage {
                subject: message.subject.clone(),
                body: GraphBody {
                    content_type: "Text".to_string(),
                    content: message.body.clone(),
                },
                to_recipients: recipients(&message.to),
                cc_recipients: recipients(&message.cc),
                bcc_recipients: recipients(&message.bcc),
                has_attachments: !attachments.is_empty(),
                attachments,
            },
        }
    }
}
