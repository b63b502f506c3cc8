//! Wire-level message value and its validating builder.
//!
//! `Email` is the fully-built message a transport delivers. All fields are
//! private to enforce validation through the builder: addresses are checked
//! structurally and every header-bound string is screened for injection
//! before an `Email` exists.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::{
	Attachment as LettreAttachment, Body, Mailbox, Message, MultiPart, SinglePart,
};
use serde::{Deserialize, Serialize};

use crate::headers::{
	XBccHeader, XCcHeader, XMetadataHeader, XPriorityHeader, XTagHeader, XToHeader,
};
use crate::validation::{check_header_injection, validate_display_name, validate_email};
use crate::{MailError, MailResult};

/// An email address with an optional display name.
///
/// # Examples
///
/// ```
/// use courrier::Address;
///
/// let plain = Address::new("user@example.com");
/// assert_eq!(plain.to_string(), "user@example.com");
///
/// let named = Address::with_name("user@example.com", "Jordan Doe");
/// assert_eq!(named.to_string(), "Jordan Doe <user@example.com>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
	email: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	name: Option<String>,
}

impl Address {
	/// Create an address without a display name.
	pub fn new(email: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			name: None,
		}
	}

	/// Create an address with a display name.
	pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			email: email.into(),
			name: Some(name.into()),
		}
	}

	/// Parse an address from `user@example.com` or `Name <user@example.com>`.
	pub fn parse(input: &str) -> MailResult<Self> {
		let trimmed = input.trim();
		if let Some(open) = trimmed.rfind('<') {
			let close = trimmed
				.rfind('>')
				.filter(|close| *close > open)
				.ok_or_else(|| MailError::InvalidAddress(input.to_string()))?;
			let email = trimmed[open + 1..close].trim();
			let name = trimmed[..open].trim().trim_matches('"');
			validate_email(email)?;
			if name.is_empty() {
				Ok(Self::new(email))
			} else {
				validate_display_name(name)?;
				Ok(Self::with_name(email, name))
			}
		} else {
			validate_email(trimmed)?;
			Ok(Self::new(trimmed))
		}
	}

	/// Get the bare email address.
	pub fn email(&self) -> &str {
		&self.email
	}

	/// Get the display name, if any.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub(crate) fn to_mailbox(&self) -> MailResult<Mailbox> {
		let email = self
			.email
			.parse()
			.map_err(|_| MailError::InvalidAddress(self.email.clone()))?;
		Ok(Mailbox::new(self.name.clone(), email))
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.name {
			Some(name) => write!(f, "{} <{}>", name, self.email),
			None => write!(f, "{}", self.email),
		}
	}
}

impl From<&str> for Address {
	fn from(email: &str) -> Self {
		Self::new(email)
	}
}

impl From<String> for Address {
	fn from(email: String) -> Self {
		Self::new(email)
	}
}

impl From<(&str, &str)> for Address {
	fn from((email, name): (&str, &str)) -> Self {
		Self::with_name(email, name)
	}
}

/// Render a list of addresses as a comma-joined header value.
pub(crate) fn format_address_list(addresses: &[Address]) -> String {
	addresses
		.iter()
		.map(Address::to_string)
		.collect::<Vec<_>>()
		.join(", ")
}

/// Append an address to a recipient list, de-duplicating by email address.
///
/// Last write wins: inserting an address that is already present keeps the
/// original list position but replaces the entry, so a later display name
/// supersedes an earlier one.
pub(crate) fn push_unique(list: &mut Vec<Address>, address: Address) {
	if let Some(existing) = list.iter_mut().find(|a| a.email == address.email) {
		*existing = address;
	} else {
		list.push(address);
	}
}

/// An alternative content representation of the message body.
#[derive(Debug, Clone)]
pub struct Alternative {
	content_type: String,
	content: Vec<u8>,
}

impl Alternative {
	/// Create a new alternative part.
	pub fn new(content_type: impl Into<String>, content: Vec<u8>) -> Self {
		Self {
			content_type: content_type.into(),
			content,
		}
	}

	/// Create an HTML alternative.
	pub fn html(content: impl Into<String>) -> Self {
		Self::new("text/html", content.into().into_bytes())
	}

	/// Create a plain text alternative.
	pub fn plain(content: impl Into<String>) -> Self {
		Self::new("text/plain", content.into().into_bytes())
	}

	/// Get the content type.
	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	/// Get the content as bytes.
	pub fn content(&self) -> &[u8] {
		&self.content
	}
}

/// A file attachment.
///
/// Attachments can be created from raw bytes or read from a file path, with
/// the MIME type detected from the filename extension. Inline attachments
/// carry a Content-ID for embedding in HTML bodies.
///
/// Attachment content serializes as base64 so queued mail jobs are
/// self-describing regardless of payload bytes.
///
/// # Examples
///
/// ```
/// use courrier::Attachment;
///
/// let attachment = Attachment::new("report.pdf", b"PDF content".to_vec());
/// assert_eq!(attachment.filename(), "report.pdf");
/// assert!(attachment.mime_type().contains("pdf"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
	filename: String,
	#[serde(with = "base64_bytes")]
	content: Vec<u8>,
	mime_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	content_id: Option<String>,
	#[serde(default)]
	inline: bool,
}

impl Attachment {
	/// Create an attachment from bytes, detecting the MIME type from the
	/// filename extension.
	pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
		let filename = filename.into();
		let mime_type = detect_mime_type(&filename);
		Self {
			filename,
			content,
			mime_type,
			content_id: None,
			inline: false,
		}
	}

	/// Create an attachment by reading a file from disk.
	pub fn from_path(path: PathBuf, filename: impl Into<String>) -> std::io::Result<Self> {
		let content = std::fs::read(&path)?;
		Ok(Self::new(filename, content))
	}

	/// Create an inline attachment with a Content-ID for embedding.
	pub fn inline(
		filename: impl Into<String>,
		content: Vec<u8>,
		content_id: impl Into<String>,
	) -> Self {
		let mut attachment = Self::new(filename, content);
		attachment.content_id = Some(content_id.into());
		attachment.inline = true;
		attachment
	}

	/// Override the detected MIME type.
	pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
		self.mime_type = mime_type.into();
		self
	}

	/// Get the filename.
	pub fn filename(&self) -> &str {
		&self.filename
	}

	/// Get the content bytes.
	pub fn content(&self) -> &[u8] {
		&self.content
	}

	/// Get the MIME type.
	pub fn mime_type(&self) -> &str {
		&self.mime_type
	}

	/// Get the Content-ID, if this is an inline attachment.
	pub fn content_id(&self) -> Option<&str> {
		self.content_id.as_deref()
	}

	/// Check whether this is an inline attachment.
	pub fn is_inline(&self) -> bool {
		self.inline
	}
}

fn detect_mime_type(filename: &str) -> String {
	mime_guess::from_path(filename)
		.first()
		.map(|mime| mime.to_string())
		.unwrap_or_else(|| "application/octet-stream".to_string())
}

mod base64_bytes {
	use base64::Engine as _;
	use base64::engine::general_purpose::STANDARD;
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		STANDARD.encode(bytes).serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let encoded = String::deserialize(deserializer)?;
		STANDARD.decode(encoded).map_err(serde::de::Error::custom)
	}
}

/// A fully-built email message, ready for a transport.
#[derive(Debug, Clone)]
pub struct Email {
	from: Option<Address>,
	reply_to: Vec<Address>,
	to: Vec<Address>,
	cc: Vec<Address>,
	bcc: Vec<Address>,
	return_path: Option<Address>,
	subject: String,
	text_body: Option<String>,
	html_body: Option<String>,
	alternatives: Vec<Alternative>,
	attachments: Vec<Attachment>,
	tags: Vec<String>,
	metadata: BTreeMap<String, String>,
	priority: Option<u8>,
	original_to: Option<String>,
	original_cc: Option<String>,
	original_bcc: Option<String>,
}

impl Email {
	/// Create a new builder for constructing an `Email`.
	pub fn builder() -> EmailBuilder {
		EmailBuilder::default()
	}

	/// Get the sender address.
	pub fn from(&self) -> Option<&Address> {
		self.from.as_ref()
	}

	/// Get the reply-to addresses.
	pub fn reply_to(&self) -> &[Address] {
		&self.reply_to
	}

	/// Get the To recipients.
	pub fn to(&self) -> &[Address] {
		&self.to
	}

	/// Get the Cc recipients.
	pub fn cc(&self) -> &[Address] {
		&self.cc
	}

	/// Get the Bcc recipients.
	pub fn bcc(&self) -> &[Address] {
		&self.bcc
	}

	/// Get the return-path address.
	pub fn return_path(&self) -> Option<&Address> {
		self.return_path.as_ref()
	}

	/// Get the subject.
	pub fn subject(&self) -> &str {
		&self.subject
	}

	/// Get the plain text body.
	pub fn text_body(&self) -> Option<&str> {
		self.text_body.as_deref()
	}

	/// Get the HTML body.
	pub fn html_body(&self) -> Option<&str> {
		self.html_body.as_deref()
	}

	/// Get the alternative parts.
	pub fn alternatives(&self) -> &[Alternative] {
		&self.alternatives
	}

	/// Get the attachments.
	pub fn attachments(&self) -> &[Attachment] {
		&self.attachments
	}

	/// Get the tags.
	pub fn tags(&self) -> &[String] {
		&self.tags
	}

	/// Get the metadata map.
	pub fn metadata(&self) -> &BTreeMap<String, String> {
		&self.metadata
	}

	/// Get the priority (1 highest through 5 lowest), if set.
	pub fn priority(&self) -> Option<u8> {
		self.priority
	}

	/// Every envelope recipient (To, Cc, Bcc), unique by email address.
	pub fn recipients(&self) -> Vec<&Address> {
		let mut recipients: Vec<&Address> = Vec::new();
		for address in self.to.iter().chain(&self.cc).chain(&self.bcc) {
			if !recipients.iter().any(|a| a.email == address.email) {
				recipients.push(address);
			}
		}
		recipients
	}

	/// The informational headers this message carries, in emission order.
	///
	/// These are the headers `to_mime` stamps in addition to the standard
	/// address/subject set: tags, metadata, priority, and the original
	/// recipient lists preserved by a global `to` override.
	pub fn headers(&self) -> Vec<(String, String)> {
		let mut headers = Vec::new();
		if !self.tags.is_empty() {
			headers.push(("X-Tag".to_string(), self.tags.join(",")));
		}
		if !self.metadata.is_empty() {
			let value = self
				.metadata
				.iter()
				.map(|(key, value)| format!("{}={}", key, value))
				.collect::<Vec<_>>()
				.join(",");
			headers.push(("X-Metadata".to_string(), value));
		}
		if let Some(priority) = self.priority {
			headers.push(("X-Priority".to_string(), priority.to_string()));
		}
		if let Some(original) = &self.original_to {
			headers.push(("X-To".to_string(), original.clone()));
		}
		if let Some(original) = &self.original_cc {
			headers.push(("X-Cc".to_string(), original.clone()));
		}
		if let Some(original) = &self.original_bcc {
			headers.push(("X-Bcc".to_string(), original.clone()));
		}
		headers
	}

	/// Build the SMTP envelope for this message.
	///
	/// The reverse path is the return-path address when set, else the
	/// sender; the forward path is every unique To/Cc/Bcc recipient. Bcc
	/// recipients are delivered through the envelope even when the Bcc
	/// header is stripped from the MIME document.
	pub fn to_envelope(&self) -> MailResult<Envelope> {
		let reverse = match self.return_path.as_ref().or(self.from.as_ref()) {
			Some(address) => Some(
				address
					.email()
					.parse()
					.map_err(|_| MailError::InvalidAddress(address.email().to_string()))?,
			),
			None => None,
		};
		let forward = self
			.recipients()
			.iter()
			.map(|address| {
				address
					.email()
					.parse()
					.map_err(|_| MailError::InvalidAddress(address.email().to_string()))
			})
			.collect::<MailResult<Vec<_>>>()?;

		Envelope::new(reverse, forward)
			.map_err(|err| MailError::MessageBuild(err.to_string()))
	}

	/// Convert into a lettre [`Message`] for wire transmission.
	pub fn to_mime(&self) -> MailResult<Message> {
		self.build_mime(true)
	}

	/// Convert into a lettre [`Message`] without the Bcc header.
	///
	/// Providers that relay a raw MIME document (Mailgun) must not see Bcc
	/// recipients in the uploaded message; they are carried in the envelope
	/// recipient list instead.
	pub fn to_mime_without_bcc(&self) -> MailResult<Message> {
		self.build_mime(false)
	}

	fn build_mime(&self, include_bcc: bool) -> MailResult<Message> {
		let from = self
			.from
			.as_ref()
			.ok_or_else(|| MailError::MessageBuild("a sender address is required".to_string()))?;

		let mut builder = Message::builder().from(from.to_mailbox()?);

		for address in &self.reply_to {
			builder = builder.reply_to(address.to_mailbox()?);
		}
		for address in &self.to {
			builder = builder.to(address.to_mailbox()?);
		}
		for address in &self.cc {
			builder = builder.cc(address.to_mailbox()?);
		}
		if include_bcc {
			for address in &self.bcc {
				builder = builder.bcc(address.to_mailbox()?);
			}
		}
		builder = builder.subject(&self.subject);

		for (name, value) in self.headers() {
			builder = match name.as_str() {
				"X-Tag" => builder.header(XTagHeader::new(value)),
				"X-Metadata" => builder.header(XMetadataHeader::new(value)),
				"X-Priority" => builder.header(XPriorityHeader::new(value)),
				"X-To" => builder.header(XToHeader::new(value)),
				"X-Cc" => builder.header(XCcHeader::new(value)),
				"X-Bcc" => builder.header(XBccHeader::new(value)),
				_ => builder,
			};
		}

		let text = self.text_body.clone().unwrap_or_default();

		let content = if self.html_body.is_some() || !self.alternatives.is_empty() {
			let mut alternative = MultiPart::alternative().singlepart(SinglePart::plain(text));
			for part in &self.alternatives {
				let content_type = parse_content_type(part.content_type())?;
				alternative = alternative.singlepart(
					SinglePart::builder()
						.header(content_type)
						.body(part.content().to_vec()),
				);
			}
			if let Some(html) = &self.html_body {
				alternative = alternative.singlepart(SinglePart::html(html.clone()));
			}
			MimeContent::Multi(alternative)
		} else {
			MimeContent::Single(SinglePart::plain(text))
		};

		let message = if self.attachments.is_empty() {
			match content {
				MimeContent::Single(part) => builder.singlepart(part),
				MimeContent::Multi(part) => builder.multipart(part),
			}
		} else {
			let mut mixed = match content {
				MimeContent::Single(part) => MultiPart::mixed().singlepart(part),
				MimeContent::Multi(part) => MultiPart::mixed().multipart(part),
			};
			for attachment in &self.attachments {
				let content_type = parse_content_type(attachment.mime_type())?;
				let part = if attachment.is_inline() {
					let content_id = attachment
						.content_id()
						.unwrap_or(attachment.filename())
						.to_string();
					LettreAttachment::new_inline(content_id)
						.body(Body::new(attachment.content().to_vec()), content_type)
				} else {
					LettreAttachment::new(attachment.filename().to_string())
						.body(Body::new(attachment.content().to_vec()), content_type)
				};
				mixed = mixed.singlepart(part);
			}
			builder.multipart(mixed)
		};

		message.map_err(|err| MailError::MessageBuild(err.to_string()))
	}
}

enum MimeContent {
	Single(SinglePart),
	Multi(MultiPart),
}

fn parse_content_type(value: &str) -> MailResult<ContentType> {
	value
		.parse()
		.or_else(|_| "application/octet-stream".parse())
		.map_err(|_| MailError::MessageBuild(format!("invalid content type: {}", value)))
}

/// Builder for [`Email`], validating on [`build`](EmailBuilder::build).
///
/// Recipient lists de-duplicate by email address with last-write-wins
/// semantics: re-adding an address keeps its original position but replaces
/// the entry, so the most recent display name is retained.
#[derive(Debug, Default)]
pub struct EmailBuilder {
	from: Option<Address>,
	reply_to: Vec<Address>,
	to: Vec<Address>,
	cc: Vec<Address>,
	bcc: Vec<Address>,
	return_path: Option<Address>,
	subject: String,
	text_body: Option<String>,
	html_body: Option<String>,
	alternatives: Vec<Alternative>,
	attachments: Vec<Attachment>,
	tags: Vec<String>,
	metadata: BTreeMap<String, String>,
	priority: Option<u8>,
	original_to: Option<String>,
	original_cc: Option<String>,
	original_bcc: Option<String>,
}

impl EmailBuilder {
	/// Set the sender address.
	pub fn from(mut self, from: impl Into<Address>) -> Self {
		self.from = Some(from.into());
		self
	}

	/// Append a reply-to address.
	pub fn reply_to(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.reply_to, address.into());
		self
	}

	/// Append a To recipient.
	pub fn to(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.to, address.into());
		self
	}

	/// Append several To recipients.
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

	/// Append a Cc recipient.
	pub fn cc(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.cc, address.into());
		self
	}

	/// Append several Cc recipients.
	pub fn cc_many<I, A>(mut self, addresses: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Address>,
	{
		for address in addresses {
			push_unique(&mut self.cc, address.into());
		}
		self
	}

	/// Append a Bcc recipient.
	pub fn bcc(mut self, address: impl Into<Address>) -> Self {
		push_unique(&mut self.bcc, address.into());
		self
	}

	/// Append several Bcc recipients.
	pub fn bcc_many<I, A>(mut self, addresses: I) -> Self
	where
		I: IntoIterator<Item = A>,
		A: Into<Address>,
	{
		for address in addresses {
			push_unique(&mut self.bcc, address.into());
		}
		self
	}

	/// Set the return-path (bounce) address.
	pub fn return_path(mut self, address: impl Into<Address>) -> Self {
		self.return_path = Some(address.into());
		self
	}

	/// Set the subject.
	pub fn subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = subject.into();
		self
	}

	/// Set the plain text body.
	pub fn text(mut self, body: impl Into<String>) -> Self {
		self.text_body = Some(body.into());
		self
	}

	/// Set the HTML body.
	pub fn html(mut self, body: impl Into<String>) -> Self {
		self.html_body = Some(body.into());
		self
	}

	/// Append an alternative content part.
	pub fn alternative(mut self, alternative: Alternative) -> Self {
		self.alternatives.push(alternative);
		self
	}

	/// Append an attachment.
	pub fn attachment(mut self, attachment: Attachment) -> Self {
		self.attachments.push(attachment);
		self
	}

	/// Append a tag.
	pub fn tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.push(tag.into());
		self
	}

	/// Insert a metadata entry.
	pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}

	/// Set the priority, clamped to 1 (highest) through 5 (lowest).
	pub fn priority(mut self, priority: u8) -> Self {
		self.priority = Some(priority.clamp(1, 5));
		self
	}

	/// Redirect every recipient to a single address.
	///
	/// The current To/Cc/Bcc lists are preserved as informational
	/// `X-To`/`X-Cc`/`X-Bcc` headers, Cc and Bcc are cleared, and To is
	/// replaced by exactly the given address. Used by the global `to`
	/// override so non-production environments never mail real recipients.
	pub fn route_all_to(mut self, address: impl Into<Address>) -> Self {
		if !self.to.is_empty() {
			self.original_to = Some(format_address_list(&self.to));
		}
		if !self.cc.is_empty() {
			self.original_cc = Some(format_address_list(&self.cc));
		}
		if !self.bcc.is_empty() {
			self.original_bcc = Some(format_address_list(&self.bcc));
		}
		self.to = vec![address.into()];
		self.cc.clear();
		self.bcc.clear();
		self
	}

	/// Build the email with validation.
	///
	/// Validates every address (including display names), the subject, and
	/// tag/metadata values for header injection. Returns an error if any
	/// check fails.
	pub fn build(self) -> MailResult<Email> {
		if let Some(from) = &self.from {
			validate_address(from)?;
		}
		if let Some(return_path) = &self.return_path {
			validate_address(return_path)?;
		}
		for address in self
			.reply_to
			.iter()
			.chain(&self.to)
			.chain(&self.cc)
			.chain(&self.bcc)
		{
			validate_address(address)?;
		}

		check_header_injection(&self.subject)?;
		for tag in &self.tags {
			check_header_injection(tag)?;
		}
		for (key, value) in &self.metadata {
			check_header_injection(key)?;
			check_header_injection(value)?;
		}

		Ok(Email {
			from: self.from,
			reply_to: self.reply_to,
			to: self.to,
			cc: self.cc,
			bcc: self.bcc,
			return_path: self.return_path,
			subject: self.subject,
			text_body: self.text_body,
			html_body: self.html_body,
			alternatives: self.alternatives,
			attachments: self.attachments,
			tags: self.tags,
			metadata: self.metadata,
			priority: self.priority,
			original_to: self.original_to,
			original_cc: self.original_cc,
			original_bcc: self.original_bcc,
		})
	}
}

fn validate_address(address: &Address) -> MailResult<()> {
	validate_email(address.email())?;
	if let Some(name) = address.name() {
		validate_display_name(name)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_address_parse_with_display_name() {
		let address = Address::parse("Jordan Doe <jordan@example.com>").unwrap();
		assert_eq!(address.email(), "jordan@example.com");
		assert_eq!(address.name(), Some("Jordan Doe"));
	}

	#[rstest]
	fn test_address_parse_bare() {
		let address = Address::parse("jordan@example.com").unwrap();
		assert_eq!(address.email(), "jordan@example.com");
		assert_eq!(address.name(), None);
	}

	#[rstest]
	#[case("Broken <not-an-email>")]
	#[case("Unclosed <user@example.com")]
	fn test_address_parse_rejects_invalid(#[case] input: &str) {
		assert!(Address::parse(input).is_err());
	}

	#[rstest]
	fn test_push_unique_last_write_wins() {
		let mut list = Vec::new();
		push_unique(&mut list, Address::with_name("a@x.com", "A"));
		push_unique(&mut list, Address::new("b@x.com"));
		push_unique(&mut list, Address::with_name("a@x.com", "B"));

		assert_eq!(list.len(), 2);
		assert_eq!(list[0].email(), "a@x.com");
		assert_eq!(list[0].name(), Some("B"));
		assert_eq!(list[1].email(), "b@x.com");
	}

	#[rstest]
	fn test_recipients_unique_across_lists() {
		let email = Email::builder()
			.to("a@x.com")
			.to("b@x.com")
			.cc("a@x.com")
			.bcc("c@x.com")
			.build()
			.unwrap();

		assert_eq!(email.recipients().len(), 3);
	}

	#[rstest]
	fn test_route_all_to_preserves_originals() {
		let email = Email::builder()
			.to(("real@example.com", "Real User"))
			.cc("copy@example.com")
			.subject("Routed")
			.route_all_to("sink@example.test")
			.build()
			.unwrap();

		assert_eq!(email.to().len(), 1);
		assert_eq!(email.to()[0].email(), "sink@example.test");
		assert!(email.cc().is_empty());

		let headers = email.headers();
		assert!(
			headers
				.iter()
				.any(|(name, value)| name == "X-To" && value.contains("real@example.com"))
		);
		assert!(
			headers
				.iter()
				.any(|(name, value)| name == "X-Cc" && value.contains("copy@example.com"))
		);
	}

	#[rstest]
	fn test_priority_is_clamped() {
		let email = Email::builder().priority(9).build().unwrap();
		assert_eq!(email.priority(), Some(5));
	}

	#[rstest]
	fn test_attachment_serde_round_trips_base64() {
		let attachment = Attachment::new("data.bin", vec![0, 159, 146, 150]);
		let json = serde_json::to_value(&attachment).unwrap();

		let content = json.get("content").and_then(|v| v.as_str()).unwrap();
		assert_eq!(content, "AJ+Slg==");

		let decoded: Attachment = serde_json::from_value(json).unwrap();
		assert_eq!(decoded, attachment);
	}

	#[rstest]
	fn test_build_rejects_injected_subject() {
		let result = Email::builder()
			.to("user@example.com")
			.subject("Hi\r\nBcc: evil@attacker.com")
			.build();
		assert!(result.is_err());
	}

	#[rstest]
	fn test_build_rejects_injected_display_name() {
		let result = Email::builder()
			.to(("user@example.com", "Name\r\nBcc: evil@attacker.com"))
			.build();
		assert!(result.is_err());
	}
}
