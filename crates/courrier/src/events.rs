//! Send lifecycle events.
//!
//! Every mailer dispatches a [`MessageSending`] event after a message has
//! been built but before it reaches the transport, and a [`MessageSent`]
//! event once the transport has accepted it. Hooks implement
//! [`MailEventHook`] and are registered on the manager; they run in
//! registration order, and any hook can cancel the send by returning
//! [`SendDecision::Cancel`] from `message_sending`. A cancelled send is
//! not an error: the mailer reports it as a quiet no-op and the sent
//! event never fires.
//!
//! # Examples
//!
//! ```
//! use courrier::events::{MailEventHook, MessageSending, SendDecision};
//!
//! struct RequireSubject;
//!
//! impl MailEventHook for RequireSubject {
//! 	fn message_sending(&self, event: &MessageSending<'_>) -> SendDecision {
//! 		if event.message.subject().is_empty() {
//! 			SendDecision::Cancel
//! 		} else {
//! 			SendDecision::Proceed
//! 		}
//! 	}
//! }
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::mailer::SentMessage;
use crate::message::Email;
use crate::templates::TemplateContext;

/// Verdict returned by a pre-send hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDecision {
	/// Let the send continue.
	Proceed,
	/// Drop the message without contacting the transport.
	Cancel,
}

/// Payload for the pre-send event.
#[derive(Debug)]
pub struct MessageSending<'a> {
	/// Name of the mailer dispatching the message.
	pub mailer: &'a str,
	/// The fully built message, including global overrides.
	pub message: &'a Email,
	/// Template data the message was rendered with.
	pub data: &'a TemplateContext,
}

/// Payload for the post-send event.
#[derive(Debug)]
pub struct MessageSent<'a> {
	/// Name of the mailer that dispatched the message.
	pub mailer: &'a str,
	/// The delivered message together with its transport receipt.
	pub sent: &'a SentMessage,
	/// Template data the message was rendered with.
	pub data: &'a TemplateContext,
}

/// Observer for the send lifecycle. Both methods have no-op defaults so
/// hooks only implement the side they care about.
pub trait MailEventHook: Send + Sync {
	/// Called before the transport sees the message. Returning
	/// [`SendDecision::Cancel`] stops the send.
	fn message_sending(&self, _event: &MessageSending<'_>) -> SendDecision {
		SendDecision::Proceed
	}

	/// Called after the transport accepted the message.
	fn message_sent(&self, _event: &MessageSent<'_>) {}
}

/// Shared, thread-safe collection of registered hooks.
///
/// Dispatch snapshots the registration list first, so a hook that
/// registers further hooks while running does not deadlock the set.
#[derive(Default)]
pub struct HookSet {
	hooks: RwLock<Vec<Arc<dyn MailEventHook>>>,
}

impl HookSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a hook. Hooks run in registration order.
	pub fn register(&self, hook: Arc<dyn MailEventHook>) {
		self.hooks.write().push(hook);
	}

	/// Number of registered hooks.
	pub fn len(&self) -> usize {
		self.hooks.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.hooks.read().is_empty()
	}

	/// Runs the pre-send side of every hook, stopping at the first
	/// [`SendDecision::Cancel`].
	pub fn dispatch_sending(&self, event: &MessageSending<'_>) -> SendDecision {
		let snapshot: Vec<_> = self.hooks.read().iter().cloned().collect();
		for hook in snapshot {
			if hook.message_sending(event) == SendDecision::Cancel {
				return SendDecision::Cancel;
			}
		}
		SendDecision::Proceed
	}

	/// Runs the post-send side of every hook.
	pub fn dispatch_sent(&self, event: &MessageSent<'_>) {
		let snapshot: Vec<_> = self.hooks.read().iter().cloned().collect();
		for hook in snapshot {
			hook.message_sent(event);
		}
	}
}

impl std::fmt::Debug for HookSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HookSet")
			.field("hooks", &self.len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use rstest::rstest;

	use super::*;
	use crate::message::Email;

	struct Counting {
		calls: Arc<AtomicUsize>,
		decision: SendDecision,
	}

	impl MailEventHook for Counting {
		fn message_sending(&self, _event: &MessageSending<'_>) -> SendDecision {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.decision
		}
	}

	fn sample_email() -> Email {
		Email::builder()
			.from("sender@example.com")
			.to("rcpt@example.com")
			.subject("Hello")
			.build()
			.unwrap()
	}

	#[rstest]
	fn hooks_run_in_registration_order_until_cancel() {
		let set = HookSet::new();
		let first = Arc::new(AtomicUsize::new(0));
		let second = Arc::new(AtomicUsize::new(0));
		let third = Arc::new(AtomicUsize::new(0));
		set.register(Arc::new(Counting {
			calls: Arc::clone(&first),
			decision: SendDecision::Proceed,
		}));
		set.register(Arc::new(Counting {
			calls: Arc::clone(&second),
			decision: SendDecision::Cancel,
		}));
		set.register(Arc::new(Counting {
			calls: Arc::clone(&third),
			decision: SendDecision::Proceed,
		}));
		let email = sample_email();
		let data = TemplateContext::new();

		let decision = set.dispatch_sending(&MessageSending {
			mailer: "smtp",
			message: &email,
			data: &data,
		});

		assert_eq!(decision, SendDecision::Cancel);
		assert_eq!(first.load(Ordering::SeqCst), 1);
		assert_eq!(second.load(Ordering::SeqCst), 1);
		assert_eq!(third.load(Ordering::SeqCst), 0);
	}

	#[rstest]
	fn empty_set_proceeds() {
		let set = HookSet::new();
		let email = sample_email();
		let data = TemplateContext::new();

		let decision = set.dispatch_sending(&MessageSending {
			mailer: "smtp",
			message: &email,
			data: &data,
		});

		assert_eq!(decision, SendDecision::Proceed);
		assert!(set.is_empty());
	}
}
