//! Reusable mail definitions.
//!
//! A [`Mailable`] is the serializable description of a message: templates
//! and template data rather than rendered bodies, so the same definition
//! can be sent immediately, captured for tests, or shipped through a
//! queue and rendered on a worker. The mailer turns it into a concrete
//! [`crate::message::Email`] at send time, applying its own global
//! overrides in the process.
//!
//! # Examples
//!
//! ```
//! use courrier::mailable::Mailable;
//!
//! let welcome = Mailable::new()
//! 	.to(("user@example.com", "New User"))
//! 	.subject("Welcome aboard")
//! 	.html_template("<h1>Hello {{name}}</h1>")
//! 	.text_template("Hello {{name}}")
//! 	.with("name", "Riley")
//! 	.tag("onboarding");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{push_unique, Address, Attachment};
use crate::templates::TemplateContext;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mailable {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub reply_to: Vec<Address>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub to: Vec<Address>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub cc: Vec<Address>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub bcc: Vec<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subject: Option<String>,
	/// Inline HTML template with `{{placeholder}}` markers.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub html_template: Option<String>,
	/// Inline plain-text template with `{{placeholder}}` markers.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text_template: Option<String>,
	/// Values substituted into the templates at render time.
	#[serde(default, skip_serializing_if = "TemplateContext::is_empty")]
	pub data: TemplateContext,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub attachments: Vec<Attachment>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tags: Vec<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub metadata: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub priority: Option<u8>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locale: Option<String>,
	/// When set, [`crate::mailer::Mailer::send`] hands the mailable to the
	/// queue dispatcher instead of delivering inline.
	#[serde(default)]
	pub should_queue: bool,
	/// Queue name for the dispatcher; `None` means its default queue.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub queue: Option<String>,
}

impl Mailable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from(mut self, address: impl Into<Address>) -> Self {
		self.from = Some(address.into());
		self
	}

	pub fn reply_to(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.reply_to, address.into());
		self
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

	pub fn subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = Some(subject.into());
		self
	}

	pub fn html_template(mut self, template: impl Into<String>) -> Self {
		self.html_template = Some(template.into());
		self
	}

	pub fn text_template(mut self, template: impl Into<String>) -> Self {
		self.text_template = Some(template.into());
		self
	}

	/// Adds one template value.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.data.insert(key.into(), value.into());
		self
	}

	/// Adds an attachment, skipping exact duplicates (same filename and
	/// same bytes).
	pub fn attach(mut self, attachment: Attachment) -> Self {
		let duplicate = self.attachments.iter().any(|existing| {
			existing.filename() == attachment.filename()
				&& existing.content() == attachment.content()
		});
		if !duplicate {
			self.attachments.push(attachment);
		}
		self
	}

	pub fn tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.push(tag.into());
		self
	}

	pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	pub fn priority(mut self, priority: u8) -> Self {
		self.priority = Some(priority);
		self
	}

	pub fn locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = Some(locale.into());
		self
	}

	/// Marks the mailable for queued delivery on the dispatcher's default
	/// queue.
	pub fn queued(mut self) -> Self {
		self.should_queue = true;
		self
	}

	/// Marks the mailable for queued delivery on a named queue.
	pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
		self.queue = Some(queue.into());
		self.should_queue = true;
		self
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	fn duplicate_attachments_are_skipped() {
		let mailable = Mailable::new()
			.attach(Attachment::new("report.csv", b"a,b".to_vec()))
			.attach(Attachment::new("report.csv", b"a,b".to_vec()))
			.attach(Attachment::new("report.csv", b"c,d".to_vec()));

		assert_eq!(mailable.attachments.len(), 2);
	}

	#[rstest]
	fn repeated_recipient_is_deduplicated() {
		let mailable = Mailable::new()
			.to(("user@example.com", "First"))
			.to("other@example.com")
			.to(("user@example.com", "Second"));

		assert_eq!(mailable.to.len(), 2);
		assert_eq!(mailable.to[0].name(), Some("Second"));
	}

	#[rstest]
	fn on_queue_implies_queued_delivery() {
		let mailable = Mailable::new().on_queue("emails");

		assert!(mailable.should_queue);
		assert_eq!(mailable.queue.as_deref(), Some("emails"));
	}

	#[rstest]
	fn serializes_without_empty_fields() {
		let mailable = Mailable::new()
			.to("user@example.com")
			.subject("Hi")
			.with("name", "Riley");

		let json = serde_json::to_value(&mailable).unwrap();

		assert_eq!(json["subject"], "Hi");
		assert_eq!(json["data"]["name"], "Riley");
		assert!(json.get("cc").is_none());
		assert!(json.get("attachments").is_none());
	}
}
