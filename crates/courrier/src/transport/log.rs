//! Log transport.
//!
//! Renders the full MIME message and writes it to the process log at
//! debug level instead of delivering it. The configured channel shows up
//! as a structured field so log routing can separate mail dumps from
//! application noise.

use async_trait::async_trait;

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::MailResult;

#[derive(Debug, Default)]
pub struct LogTransport {
	channel: Option<String>,
	observers: ObserverSet,
}

impl LogTransport {
	pub fn new(channel: Option<String>) -> Self {
		Self {
			channel,
			observers: ObserverSet::new(),
		}
	}

	pub fn channel(&self) -> Option<&str> {
		self.channel.as_deref()
	}
}

#[async_trait]
impl Transport for LogTransport {
	fn name(&self) -> &str {
		"log"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let mime = email.to_mime()?;
		let raw = mime.formatted();
		let rendered = String::from_utf8_lossy(&raw);

		tracing::debug!(
			channel = self.channel.as_deref().unwrap_or("mail"),
			message = %rendered,
			"mail message written to log"
		);

		Ok(SentReceipt::accepting_all(email))
	}
}
