//! Outgoing message model.

use crate::error::{Error, Result};
use crate::mime::mime_type_for_path;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};

/// An email message to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Local files to attach.
    pub attachments: Vec<PathBuf>,
}

impl EmailMessage {
    /// Creates a new message without recipients.
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Adds a file attachment.
    #[must_use]
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    /// Checks that the message can be sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecipients`] if `to` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(Error::NoRecipients);
        }
        Ok(())
    }

    /// Reads every attachment from disk, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first file that cannot be read.
    pub async fn load_attachments(&self) -> Result<Vec<Attachment>> {
        let mut loaded = Vec::with_capacity(self.attachments.len());
        for path in &self.attachments {
            loaded.push(Attachment::from_path(path).await?);
        }
        Ok(loaded)
    }
}

/// A file attachment read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to recipients.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// Raw content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Reads an attachment from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|source| Error::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            content_type: mime_type_for_path(path).to_string(),
            data,
        })
    }

    /// Content as standard base64.
    #[must_use]
    pub fn content_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}
