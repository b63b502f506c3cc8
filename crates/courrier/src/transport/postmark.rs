//! Postmark transport.
//!
//! Posts a structured JSON payload to the Postmark email endpoint rather
//! than a rendered MIME message. Tags and metadata map onto Postmark's
//! first-class `Tag` and `Metadata` fields (Postmark accepts a single
//! tag, so only the first one is sent); the remaining derived headers
//! travel in the `Headers` array.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::{format_address_list, Email};
use crate::settings::{PostmarkOptions, Secret};
use crate::{MailError, MailResult};

#[derive(Debug)]
pub struct PostmarkTransport {
	token: Secret,
	endpoint: String,
	client: reqwest::Client,
	observers: ObserverSet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OutboundMessage {
	from: String,
	to: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	cc: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	bcc: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	reply_to: Option<String>,
	subject: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	text_body: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	html_body: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	tag: Option<String>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	metadata: BTreeMap<String, String>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	headers: Vec<OutboundHeader>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	attachments: Vec<OutboundAttachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OutboundHeader {
	name: String,
	value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OutboundAttachment {
	name: String,
	content: String,
	content_type: String,
	#[serde(rename = "ContentID", skip_serializing_if = "Option::is_none")]
	content_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiResponse {
	#[serde(default)]
	error_code: i64,
	#[serde(default)]
	message: String,
	#[serde(default, rename = "MessageID")]
	message_id: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
	if value.is_empty() {
		None
	} else {
		Some(value)
	}
}

impl PostmarkTransport {
	pub fn from_options(options: &PostmarkOptions) -> MailResult<Self> {
		let mut builder = reqwest::Client::builder();
		if let Some(seconds) = options.timeout {
			builder = builder.timeout(Duration::from_secs(seconds));
		}
		let client = builder.build().map_err(|err| {
			MailError::Configuration(format!("failed to build postmark http client: {}", err))
		})?;

		Ok(Self {
			token: options.token.clone(),
			endpoint: options.endpoint.clone(),
			client,
			observers: ObserverSet::new(),
		})
	}

	fn payload(&self, email: &Email) -> MailResult<OutboundMessage> {
		let from = email.from().ok_or_else(|| {
			MailError::MessageBuild("a sender address is required".to_string())
		})?;

		let headers = email
			.headers()
			.into_iter()
			.filter(|(name, _)| name != "X-Tag" && name != "X-Metadata")
			.map(|(name, value)| OutboundHeader { name, value })
			.collect();

		let attachments = email
			.attachments()
			.iter()
			.map(|attachment| OutboundAttachment {
				name: attachment.filename().to_string(),
				content: STANDARD.encode(attachment.content()),
				content_type: attachment.mime_type().to_string(),
				content_id: attachment.is_inline().then(|| {
					format!(
						"cid:{}",
						attachment.content_id().unwrap_or(attachment.filename())
					)
				}),
			})
			.collect();

		Ok(OutboundMessage {
			from: from.to_string(),
			to: format_address_list(email.to()),
			cc: non_empty(format_address_list(email.cc())),
			bcc: non_empty(format_address_list(email.bcc())),
			reply_to: non_empty(format_address_list(email.reply_to())),
			subject: email.subject().to_string(),
			text_body: email.text_body().map(str::to_string),
			html_body: email.html_body().map(str::to_string),
			tag: email.tags().first().cloned(),
			metadata: email.metadata().clone(),
			headers,
			attachments,
		})
	}
}

#[async_trait]
impl Transport for PostmarkTransport {
	fn name(&self) -> &str {
		"postmark"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let payload = self.payload(email)?;
		let url = format!("{}/email", self.endpoint.trim_end_matches('/'));

		let response = self
			.client
			.post(url)
			.header("X-Postmark-Server-Token", self.token.expose())
			.header(reqwest::header::ACCEPT, "application/json")
			.json(&payload)
			.send()
			.await
			.map_err(|err| MailError::Provider {
				message: format!("Request to Postmark API failed. Reason: {}.", err),
				source: Some(Box::new(err)),
			})?;

		let status = response.status();
		let api: ApiResponse = match response.json().await {
			Ok(api) => api,
			Err(err) => {
				let reason = if status.is_success() {
					err.to_string()
				} else {
					format!("HTTP {}", status)
				};
				return Err(MailError::Provider {
					message: format!("Request to Postmark API failed. Reason: {}.", reason),
					source: Some(Box::new(err)),
				});
			}
		};

		if api.error_code != 0 {
			return Err(MailError::Provider {
				message: format!("Request to Postmark API failed. Reason: {}.", api.message),
				source: None,
			});
		}

		let mut receipt = SentReceipt::accepting_all(email);
		if let Some(id) = api.message_id.filter(|id| !id.is_empty()) {
			receipt = receipt
				.with_message_id(&id)
				.with_header("X-PM-Message-Id", &id);
		}
		Ok(receipt)
	}
}
