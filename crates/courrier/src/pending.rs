//! Recipient-first sending.
//!
//! [`PendingMail`] lets call sites start from the audience and supply
//! the mail definition last: `manager.to(user)?.send(&welcome)`. The
//! pending recipients and locale are merged into a copy of the mailable
//! right before it is handed to the mailer, so the original definition
//! stays reusable.

use std::sync::Arc;

use uuid::Uuid;

use crate::mailable::Mailable;
use crate::mailer::{Mailer, SendOutcome, SentMessage};
use crate::message::{push_unique, Address};
use crate::MailResult;

#[derive(Debug)]
pub struct PendingMail {
	mailer: Arc<Mailer>,
	to: Vec<Address>,
	cc: Vec<Address>,
	bcc: Vec<Address>,
	locale: Option<String>,
}

impl PendingMail {
	pub fn new(mailer: Arc<Mailer>) -> Self {
		Self {
			mailer,
			to: Vec::new(),
			cc: Vec::new(),
			bcc: Vec::new(),
			locale: None,
		}
	}

	pub fn to(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.to, address.into());
		self
	}

	pub fn to_many<I, A>(mut self, addresses: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Address>,
	{
		for address in addresses {
			push_unique(&mut self.to, address.into());
		}
		self
	}

	pub fn cc(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.cc, address.into());
		self
	}

	pub fn bcc(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.bcc, address.into());
		self
	}

	pub fn locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = Some(locale.into());
		self
	}

	/// Copies the mailable and merges the pending recipients into it.
	/// The mailable's own recipients are kept; a repeated address takes
	/// the pending entry's display name.
	fn fill(&self, mailable: &Mailable) -> Mailable {
		let mut filled = mailable.clone();
		for address in &self.to {
			push_unique(&mut filled.to, address.clone());
		}
		for address in &self.cc {
			push_unique(&mut filled.cc, address.clone());
		}
		for address in &self.bcc {
			push_unique(&mut filled.bcc, address.clone());
		}
		if filled.locale.is_none() {
			filled.locale = self.locale.clone();
		}
		filled
	}

	/// Sends or queues depending on the mailable's `should_queue` flag.
	pub async fn send(&self, mailable: &Mailable) -> MailResult<SendOutcome> {
		self.mailer.send(&self.fill(mailable)).await
	}

	/// Delivers immediately, bypassing the queue flag.
	pub async fn send_now(&self, mailable: &Mailable) -> MailResult<Option<SentMessage>> {
		self.mailer.send_now(&self.fill(mailable)).await
	}

	/// Queues the mailable for background delivery.
	pub async fn queue(&self, mailable: &Mailable) -> MailResult<Uuid> {
		self.mailer.queue(&self.fill(mailable), None).await
	}

	/// Queues the mailable with a delay.
	pub async fn later(&self, delay_seconds: u64, mailable: &Mailable) -> MailResult<Uuid> {
		self.mailer.later(delay_seconds, &self.fill(mailable)).await
	}

	/// Renders the message body without sending it.
	pub fn render(&self, mailable: &Mailable) -> MailResult<String> {
		self.mailer.render(&self.fill(mailable))
	}
}
