//! Mailgun transport.
//!
//! Submits the rendered message to the Mailgun messages.mime endpoint:
//! a multipart POST with a `to` field carrying every envelope recipient
//! and a `message` part carrying the Bcc-stripped MIME source. The
//! provider re-parses the message itself, so Bcc recipients are reached
//! through the `to` field without leaking into the stored headers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::settings::{MailgunOptions, Secret};
use crate::{MailError, MailResult};

#[derive(Debug)]
pub struct MailgunTransport {
	key: Secret,
	domain: String,
	endpoint: String,
	client: reqwest::Client,
	observers: ObserverSet,
}

impl MailgunTransport {
	pub fn from_options(options: &MailgunOptions) -> MailResult<Self> {
		let mut builder = reqwest::Client::builder();
		if let Some(seconds) = options.timeout {
			builder = builder.timeout(Duration::from_secs(seconds));
		}
		let client = builder.build().map_err(|err| {
			MailError::Configuration(format!("failed to build mailgun http client: {}", err))
		})?;

		Ok(Self {
			key: options.key.clone(),
			domain: options.domain.clone(),
			endpoint: options.endpoint.clone(),
			client,
			observers: ObserverSet::new(),
		})
	}

	fn url(&self) -> String {
		format!("https://{}/v3/{}/messages.mime", self.endpoint, self.domain)
	}
}

#[async_trait]
impl Transport for MailgunTransport {
	fn name(&self) -> &str {
		"mailgun"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let mime = email.to_mime_without_bcc()?;
		let raw = mime.formatted();
		let to = email
			.recipients()
			.iter()
			.map(|address| address.to_string())
			.collect::<Vec<_>>()
			.join(", ");

		let form = Form::new()
			.text("to", to)
			.part("message", Part::bytes(raw).file_name("message.mime"));

		let response = self
			.client
			.post(self.url())
			.basic_auth("api", Some(self.key.expose()))
			.multipart(form)
			.send()
			.await
			.map_err(|err| MailError::Provider {
				message: format!("Request to Mailgun API failed. Reason: {}.", err),
				source: Some(Box::new(err)),
			})?;

		let status = response.status();
		let body = response.text().await.unwrap_or_default();
		let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

		if !status.is_success() {
			let reason = payload
				.get("message")
				.and_then(Value::as_str)
				.map(str::to_string)
				.unwrap_or_else(|| format!("HTTP {}", status));
			return Err(MailError::Provider {
				message: format!("Request to Mailgun API failed. Reason: {}.", reason),
				source: None,
			});
		}

		let mut receipt = SentReceipt::accepting_all(email);
		if let Some(id) = payload.get("id").and_then(Value::as_str) {
			receipt = receipt
				.with_message_id(id)
				.with_header("X-Mailgun-Message-ID", id);
		}
		Ok(receipt)
	}
}
