//! Delivery transports.
//!
//! A [`Transport`] takes a built [`Email`] and moves it toward its
//! recipients: over SMTP, through a local sendmail binary, via a provider
//! HTTP API, into the process log, or into an in-memory mailbox for tests.
//! Implementations only write [`Transport::deliver`]; the provided
//! [`Transport::send`] wrapper runs the registered [`SendObserver`]s
//! around it and classifies the result into a [`DeliveryOutcome`].
//!
//! Transports are deliberately unaware of mailers, events and queues.
//! Everything above them (global overrides, lifecycle hooks, queue
//! handoff) lives in [`crate::mailer`] and [`crate::manager`].

pub mod aliyun;
pub mod failover;
pub mod log;
pub mod mailgun;
pub mod memory;
pub mod postmark;
pub mod sendmail;
#[cfg(feature = "ses")]
pub mod ses;
pub mod smtp;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

pub use aliyun::AliyunDmTransport;
pub use failover::{FailoverMode, FailoverTransport};
pub use log::LogTransport;
pub use mailgun::MailgunTransport;
pub use memory::MemoryTransport;
pub use postmark::PostmarkTransport;
pub use sendmail::SendmailTransport;
#[cfg(feature = "ses")]
pub use ses::SesTransport;
pub use smtp::SmtpTransport;

use crate::message::{Address, Email};
use crate::MailResult;

/// Where a send attempt ended up, as reported to [`SendObserver`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
	/// The message is built and about to be handed to the transport.
	Pending,
	/// The transport accepted the message for every recipient.
	Success,
	/// The transport accepted the message but rejected some recipients.
	Partial,
	/// The transport refused the message.
	Failure,
	/// The message was captured locally instead of leaving the process.
	Spooled,
}

impl DeliveryOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			DeliveryOutcome::Pending => "pending",
			DeliveryOutcome::Success => "success",
			DeliveryOutcome::Partial => "partial",
			DeliveryOutcome::Failure => "failure",
			DeliveryOutcome::Spooled => "spooled",
		}
	}
}

impl fmt::Display for DeliveryOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What a transport reports back after accepting a message.
#[derive(Debug, Clone, Default)]
pub struct SentReceipt {
	/// Provider-assigned message identifier, when one exists.
	pub message_id: Option<String>,
	/// Recipients the transport accepted the message for.
	pub accepted: Vec<Address>,
	/// Recipients the transport refused.
	pub rejected: Vec<Address>,
	/// Headers the transport stamped on the outgoing message, such as a
	/// provider message-id header.
	pub extra_headers: Vec<(String, String)>,
}

impl SentReceipt {
	/// A receipt claiming every recipient of `email` was accepted.
	pub fn accepting_all(email: &Email) -> Self {
		Self {
			accepted: email.recipients().into_iter().cloned().collect(),
			..Self::default()
		}
	}

	pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
		self.message_id = Some(id.into());
		self
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_headers.push((name.into(), value.into()));
		self
	}
}

/// Observer of individual transport attempts.
///
/// Unlike [`crate::events::MailEventHook`], observers cannot veto a send;
/// they exist for metrics and audit trails, and they see one call per
/// transport attempt, so a failover chain reports each delegate it tried.
pub trait SendObserver: Send + Sync {
	/// Called right before the transport attempt, while the message is
	/// still [`DeliveryOutcome::Pending`].
	fn before_send(&self, _transport: &str, _email: &Email) {}

	/// Called after the attempt with its outcome. Runs on the error path
	/// too, with [`DeliveryOutcome::Failure`].
	fn after_send(&self, _transport: &str, _email: &Email, _outcome: DeliveryOutcome) {}
}

/// Shared, thread-safe collection of registered observers.
#[derive(Default)]
pub struct ObserverSet {
	observers: RwLock<Vec<Arc<dyn SendObserver>>>,
}

impl ObserverSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an observer. Observers run in registration order.
	pub fn register(&self, observer: Arc<dyn SendObserver>) {
		self.observers.write().push(observer);
	}

	pub fn notify_before(&self, transport: &str, email: &Email) {
		let snapshot: Vec<_> = self.observers.read().iter().cloned().collect();
		for observer in snapshot {
			observer.before_send(transport, email);
		}
	}

	pub fn notify_after(&self, transport: &str, email: &Email, outcome: DeliveryOutcome) {
		let snapshot: Vec<_> = self.observers.read().iter().cloned().collect();
		for observer in snapshot {
			observer.after_send(transport, email, outcome);
		}
	}
}

impl fmt::Debug for ObserverSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObserverSet")
			.field("observers", &self.observers.read().len())
			.finish()
	}
}

/// A mail delivery mechanism.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Stable transport kind name, e.g. `smtp` or `mailgun`.
	fn name(&self) -> &str;

	/// Observers attached to this transport instance.
	fn observers(&self) -> &ObserverSet;

	/// Performs the actual delivery. Implementations should not call
	/// observers themselves; [`Transport::send`] does.
	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt>;

	/// Maps a successful receipt to an outcome label.
	fn classify(&self, receipt: &SentReceipt) -> DeliveryOutcome {
		if receipt.rejected.is_empty() {
			DeliveryOutcome::Success
		} else if receipt.accepted.is_empty() {
			DeliveryOutcome::Failure
		} else {
			DeliveryOutcome::Partial
		}
	}

	/// Delivers `email` with observer notifications around the attempt.
	async fn send(&self, email: &Email) -> MailResult<SentReceipt> {
		self.observers().notify_before(self.name(), email);
		match self.deliver(email).await {
			Ok(receipt) => {
				let outcome = self.classify(&receipt);
				self.observers().notify_after(self.name(), email, outcome);
				Ok(receipt)
			}
			Err(err) => {
				self.observers()
					.notify_after(self.name(), email, DeliveryOutcome::Failure);
				Err(err)
			}
		}
	}

	/// Prepares the transport for sending. Connection-oriented transports
	/// pool internally, so the default does nothing; purging a cached
	/// mailer and resolving it again is the way to force a fresh client.
	async fn start(&self) -> MailResult<()> {
		Ok(())
	}

	/// Releases any resources held between sends. The default does
	/// nothing.
	async fn stop(&self) -> MailResult<()> {
		Ok(())
	}

	/// Whether the transport can currently reach its backend. Defaults to
	/// `true` for transports without a connection to probe.
	async fn is_ready(&self) -> bool {
		true
	}
}
