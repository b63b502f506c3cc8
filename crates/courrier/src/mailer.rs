//! The mailer: message assembly, lifecycle events and dispatch.
//!
//! A [`Mailer`] binds one transport to a set of global overrides and the
//! shared lifecycle hooks. [`Mailer::send_now`] renders a
//! [`Mailable`] into a concrete message, gives pre-send hooks a chance to
//! cancel it, delivers it, and then announces the result; [`Mailer::send`]
//! adds the queue handoff for mailables flagged with `should_queue`.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use courrier::mailable::Mailable;
//! use courrier::mailer::Mailer;
//! use courrier::transport::{MemoryTransport, Transport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> courrier::MailResult<()> {
//! let transport = Arc::new(MemoryTransport::new());
//! let mailer = Mailer::new("test", Arc::clone(&transport) as Arc<dyn Transport>);
//!
//! let mailable = Mailable::new()
//! 	.from("noreply@example.com")
//! 	.to("user@example.com")
//! 	.subject("Hello")
//! 	.text_template("Hi {{name}}")
//! 	.with("name", "Riley");
//! mailer.send_now(&mailable).await?;
//!
//! assert_eq!(transport.messages().len(), 1);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use uuid::Uuid;

use crate::events::{HookSet, MessageSending, MessageSent, SendDecision};
use crate::mailable::Mailable;
use crate::message::{Address, Email};
use crate::queue::{QueueDispatcher, QueuedMailJob};
use crate::templates::render_template;
use crate::transport::{SentReceipt, Transport};
use crate::{MailError, MailResult};

/// Sender identity and routing defaults applied to every message a
/// mailer builds.
///
/// `from`, `reply_to` and `return_path` fill in when the mailable leaves
/// them unset (the global reply-to is prepended, so a mailable can still
/// add its own); `to` redirects every message to one address, preserving
/// the original recipients as `X-To`, `X-Cc` and `X-Bcc` headers.
#[derive(Debug, Clone, Default)]
pub struct GlobalOverrides {
	pub from: Option<Address>,
	pub reply_to: Option<Address>,
	pub return_path: Option<Address>,
	pub to: Option<Address>,
}

/// A delivered message together with the transport's receipt.
#[derive(Debug, Clone)]
pub struct SentMessage {
	email: Email,
	receipt: SentReceipt,
}

impl SentMessage {
	pub(crate) fn new(email: Email, receipt: SentReceipt) -> Self {
		Self { email, receipt }
	}

	pub fn email(&self) -> &Email {
		&self.email
	}

	/// Provider-assigned message identifier, when the transport reported
	/// one.
	pub fn message_id(&self) -> Option<&str> {
		self.receipt.message_id.as_deref()
	}

	pub fn accepted(&self) -> &[Address] {
		&self.receipt.accepted
	}

	pub fn rejected(&self) -> &[Address] {
		&self.receipt.rejected
	}

	/// Headers the transport stamped on the outgoing message.
	pub fn headers(&self) -> &[(String, String)] {
		&self.receipt.extra_headers
	}
}

/// What [`Mailer::send`] did with a mailable.
#[derive(Debug)]
pub enum SendOutcome {
	/// The message went through the transport.
	Sent(SentMessage),
	/// The mailable was handed to the queue dispatcher.
	Queued { job_id: Uuid },
	/// A pre-send hook cancelled the message.
	Canceled,
}

pub struct Mailer {
	name: String,
	transport: Arc<dyn Transport>,
	overrides: GlobalOverrides,
	hooks: Arc<HookSet>,
	queue: Option<Arc<dyn QueueDispatcher>>,
}

impl Mailer {
	pub fn new(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
		Self {
			name: name.into(),
			transport,
			overrides: GlobalOverrides::default(),
			hooks: Arc::new(HookSet::new()),
			queue: None,
		}
	}

	pub fn with_overrides(mut self, overrides: GlobalOverrides) -> Self {
		self.overrides = overrides;
		self
	}

	pub fn with_hooks(mut self, hooks: Arc<HookSet>) -> Self {
		self.hooks = hooks;
		self
	}

	pub fn with_queue(mut self, queue: Arc<dyn QueueDispatcher>) -> Self {
		self.queue = Some(queue);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn transport(&self) -> &Arc<dyn Transport> {
		&self.transport
	}

	pub fn overrides(&self) -> &GlobalOverrides {
		&self.overrides
	}

	/// Renders a mailable into a validated [`Email`], applying the global
	/// overrides.
	pub fn build(&self, mailable: &Mailable) -> MailResult<Email> {
		let mut builder = Email::builder();

		if let Some(from) = mailable.from.as_ref().or(self.overrides.from.as_ref()) {
			builder = builder.from(from.clone());
		}
		if let Some(reply_to) = &self.overrides.reply_to {
			builder = builder.reply_to(reply_to.clone());
		}
		for address in &mailable.reply_to {
			builder = builder.reply_to(address.clone());
		}
		for address in &mailable.to {
			builder = builder.to(address.clone());
		}
		for address in &mailable.cc {
			builder = builder.cc(address.clone());
		}
		for address in &mailable.bcc {
			builder = builder.bcc(address.clone());
		}
		if let Some(return_path) = &self.overrides.return_path {
			builder = builder.return_path(return_path.clone());
		}
		if let Some(subject) = &mailable.subject {
			builder = builder.subject(subject.clone());
		}
		if let Some(template) = &mailable.text_template {
			builder = builder.text(render_template(template, &mailable.data, false)?);
		}
		if let Some(template) = &mailable.html_template {
			builder = builder.html(render_template(template, &mailable.data, true)?);
		}
		for attachment in &mailable.attachments {
			builder = builder.attachment(attachment.clone());
		}
		for tag in &mailable.tags {
			builder = builder.tag(tag.clone());
		}
		for (key, value) in &mailable.metadata {
			builder = builder.metadata(key.clone(), value.clone());
		}
		if let Some(priority) = mailable.priority {
			builder = builder.priority(priority);
		}

		// Rerouting must come last so it captures the final recipient set.
		if let Some(to) = &self.overrides.to {
			builder = builder.route_all_to(to.clone());
		}

		builder.build()
	}

	/// Renders the mailable's preferred body: HTML when present,
	/// otherwise plain text.
	pub fn render(&self, mailable: &Mailable) -> MailResult<String> {
		let email = self.build(mailable)?;
		Ok(email
			.html_body()
			.or(email.text_body())
			.unwrap_or_default()
			.to_string())
	}

	/// Builds and delivers immediately, ignoring the `should_queue` flag.
	///
	/// Returns `Ok(None)` when a pre-send hook cancelled the message; the
	/// sent event does not fire in that case.
	pub async fn send_now(&self, mailable: &Mailable) -> MailResult<Option<SentMessage>> {
		let email = self.build(mailable)?;

		let sending = MessageSending {
			mailer: &self.name,
			message: &email,
			data: &mailable.data,
		};
		if self.hooks.dispatch_sending(&sending) == SendDecision::Cancel {
			tracing::debug!(mailer = %self.name, "send cancelled by a pre-send hook");
			return Ok(None);
		}

		let receipt = self.transport.send(&email).await?;
		let sent = SentMessage::new(email, receipt);

		let event = MessageSent {
			mailer: &self.name,
			sent: &sent,
			data: &mailable.data,
		};
		self.hooks.dispatch_sent(&event);

		tracing::info!(
			mailer = %self.name,
			transport = self.transport.name(),
			message_id = sent.message_id().unwrap_or_default(),
			recipients = sent.email().recipients().len(),
			"mail sent"
		);

		Ok(Some(sent))
	}

	/// Sends or queues depending on the mailable's `should_queue` flag.
	pub async fn send(&self, mailable: &Mailable) -> MailResult<SendOutcome> {
		if mailable.should_queue {
			let job_id = self.queue(mailable, None).await?;
			return Ok(SendOutcome::Queued { job_id });
		}
		match self.send_now(mailable).await? {
			Some(sent) => Ok(SendOutcome::Sent(sent)),
			None => Ok(SendOutcome::Canceled),
		}
	}

	/// Hands the mailable to the queue dispatcher and returns the job id.
	pub async fn queue(
		&self,
		mailable: &Mailable,
		delay_seconds: Option<u64>,
	) -> MailResult<Uuid> {
		let dispatcher = self.queue.as_ref().ok_or_else(|| {
			MailError::Queue("no queue dispatcher is configured".to_string())
		})?;

		let job = QueuedMailJob::new(&self.name, mailable.clone(), delay_seconds);
		let job_id = job.id;
		dispatcher.enqueue(job).await?;

		tracing::debug!(mailer = %self.name, job_id = %job_id, "mail job enqueued");
		Ok(job_id)
	}

	/// Queues the mailable with a delay.
	pub async fn later(&self, delay_seconds: u64, mailable: &Mailable) -> MailResult<Uuid> {
		self.queue(mailable, Some(delay_seconds)).await
	}
}

impl std::fmt::Debug for Mailer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mailer")
			.field("name", &self.name)
			.field("transport", &self.transport.name())
			.field("overrides", &self.overrides)
			.finish_non_exhaustive()
	}
}
