//! AWS SES transport.
//!
//! Uses the SES v2 API to submit the rendered message as raw content,
//! with every envelope recipient listed in the destination so Bcc
//! delivery works even though the Bcc header is stripped from the raw
//! message. Message metadata becomes SES message tags, which flow into
//! configuration-set event destinations on the AWS side.

use async_trait::async_trait;
use aws_sdk_sesv2::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_sesv2::error::ProvideErrorMetadata;
use aws_sdk_sesv2::primitives::Blob;
use aws_sdk_sesv2::types::{Destination, EmailContent, MessageTag, RawMessage};
use aws_sdk_sesv2::Client;

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::settings::SesOptions;
use crate::{MailError, MailResult};

#[derive(Debug)]
pub struct SesTransport {
	client: Client,
	configuration_set: Option<String>,
	observers: ObserverSet,
}

impl SesTransport {
	/// Wraps an already-configured SES client.
	pub fn new(client: Client, configuration_set: Option<String>) -> Self {
		Self {
			client,
			configuration_set,
			observers: ObserverSet::new(),
		}
	}

	/// Builds a client from static credentials in the transport options.
	pub fn from_options(options: &SesOptions) -> Self {
		let config = aws_sdk_sesv2::Config::builder()
			.behavior_version(BehaviorVersion::latest())
			.region(Region::new(options.region.clone()))
			.credentials_provider(Credentials::new(
				options.key.clone(),
				options.secret.expose().to_string(),
				None,
				None,
				"courrier",
			))
			.build();

		Self::new(Client::from_conf(config), options.configuration_set.clone())
	}
}

#[async_trait]
impl Transport for SesTransport {
	fn name(&self) -> &str {
		"ses"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let mime = email.to_mime_without_bcc()?;
		let raw = RawMessage::builder()
			.data(Blob::new(mime.formatted()))
			.build()
			.map_err(|err| {
				MailError::MessageBuild(format!("failed to assemble ses raw message: {}", err))
			})?;
		let content = EmailContent::builder().raw(raw).build();

		let mut destination = Destination::builder();
		for address in email.recipients() {
			destination = destination.to_addresses(address.email().to_string());
		}

		let mut request = self
			.client
			.send_email()
			.content(content)
			.destination(destination.build());
		if let Some(set) = &self.configuration_set {
			request = request.configuration_set_name(set.clone());
		}
		for (key, value) in email.metadata() {
			let tag = MessageTag::builder()
				.name(key.clone())
				.value(value.clone())
				.build()
				.map_err(|err| {
					MailError::MessageBuild(format!("invalid ses message tag: {}", err))
				})?;
			request = request.email_tags(tag);
		}

		let output = request.send().await.map_err(|err| {
			let reason = err
				.message()
				.map(str::to_string)
				.unwrap_or_else(|| err.to_string());
			MailError::Provider {
				message: format!("Request to AWS SES API failed. Reason: {}.", reason),
				source: Some(Box::new(err)),
			}
		})?;

		let mut receipt = SentReceipt::accepting_all(email);
		if let Some(id) = output.message_id() {
			receipt = receipt
				.with_message_id(id)
				.with_header("X-SES-Message-ID", id)
				.with_header("X-Message-ID", id);
		}
		Ok(receipt)
	}
}
