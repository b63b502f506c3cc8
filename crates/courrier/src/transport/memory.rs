//! In-memory capture transport.
//!
//! Nothing leaves the process: every message is appended to an internal
//! mailbox that tests can inspect with [`MemoryTransport::messages`] or
//! drain with [`MemoryTransport::flush`]. Configured with the `array`
//! transport kind.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeliveryOutcome, ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::MailResult;

#[derive(Debug, Default)]
pub struct MemoryTransport {
	mailbox: Mutex<Vec<Email>>,
	observers: ObserverSet,
}

impl MemoryTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copies out the captured messages in capture order.
	pub fn messages(&self) -> Vec<Email> {
		self.mailbox.lock().clone()
	}

	/// Removes and returns the captured messages.
	pub fn flush(&self) -> Vec<Email> {
		std::mem::take(&mut *self.mailbox.lock())
	}
}

#[async_trait]
impl Transport for MemoryTransport {
	fn name(&self) -> &str {
		"array"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		self.mailbox.lock().push(email.clone());
		Ok(SentReceipt::accepting_all(email))
	}

	fn classify(&self, _receipt: &SentReceipt) -> DeliveryOutcome {
		DeliveryOutcome::Spooled
	}
}
