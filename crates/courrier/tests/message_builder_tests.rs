//! Email builder API integration tests
//!
//! Tests the Email fluent API, covering builder construction, recipient
//! handling, derived headers, attachments, alternatives, rerouting and
//! validation failures.

use courrier::{Address, Alternative, Attachment, Email, MailError};
use rstest::rstest;

/// Test: Builder pattern basic construction
#[rstest]
fn test_builder_basic_construction() {
	// Arrange
	let builder = Email::builder()
		.from("sender@example.com")
		.to("recipient@example.com")
		.subject("Test Subject")
		.text("Test Body");

	// Act
	let email = builder.build().unwrap();

	// Assert
	assert_eq!(email.from().unwrap().email(), "sender@example.com");
	assert_eq!(email.to()[0].email(), "recipient@example.com");
	assert_eq!(email.subject(), "Test Subject");
	assert_eq!(email.text_body(), Some("Test Body"));
}

/// Test: Builder method chaining across every recipient field
#[rstest]
fn test_builder_method_chaining() {
	// Arrange & Act
	let email = Email::builder()
		.from(("chain@example.com", "Chain"))
		.to("to@example.com")
		.cc("cc@example.com")
		.bcc("bcc@example.com")
		.reply_to("reply@example.com")
		.return_path("bounce@example.com")
		.subject("Chained")
		.text("Body")
		.build()
		.unwrap();

	// Assert
	assert_eq!(email.from().unwrap().name(), Some("Chain"));
	assert_eq!(email.to()[0].email(), "to@example.com");
	assert_eq!(email.cc()[0].email(), "cc@example.com");
	assert_eq!(email.bcc()[0].email(), "bcc@example.com");
	assert_eq!(email.reply_to()[0].email(), "reply@example.com");
	assert_eq!(email.return_path().unwrap().email(), "bounce@example.com");
}

/// Test: Repeated address replaces the earlier entry in place
#[rstest]
fn test_duplicate_recipient_takes_last_entry() {
	// Arrange & Act
	let email = Email::builder()
		.to(("user@example.com", "First"))
		.to("second@example.com")
		.to(("user@example.com", "Latest"))
		.build()
		.unwrap();

	// Assert
	assert_eq!(email.to().len(), 2);
	assert_eq!(email.to()[0].email(), "user@example.com");
	assert_eq!(email.to()[0].name(), Some("Latest"));
	assert_eq!(email.to()[1].email(), "second@example.com");
}

/// Test: recipients() unions To, Cc and Bcc without duplicates
#[rstest]
fn test_recipients_unions_all_fields() {
	// Arrange
	let email = Email::builder()
		.to("a@example.com")
		.cc("b@example.com")
		.cc("a@example.com")
		.bcc("c@example.com")
		.build()
		.unwrap();

	// Act
	let recipients = email.recipients();

	// Assert
	assert_eq!(recipients.len(), 3);
	let emails: Vec<_> = recipients.iter().map(|a| a.email()).collect();
	assert_eq!(emails, vec!["a@example.com", "b@example.com", "c@example.com"]);
}

/// Test: Tags, metadata and priority surface as derived headers
#[rstest]
fn test_derived_headers() {
	// Arrange
	let email = Email::builder()
		.to("user@example.com")
		.tag("welcome")
		.tag("onboarding")
		.metadata("campaign", "spring")
		.metadata("batch", "7")
		.priority(1)
		.build()
		.unwrap();

	// Act
	let headers = email.headers();

	// Assert
	assert!(headers.contains(&("X-Tag".to_string(), "welcome,onboarding".to_string())));
	assert!(headers.contains(&("X-Metadata".to_string(), "batch=7,campaign=spring".to_string())));
	assert!(headers.contains(&("X-Priority".to_string(), "1".to_string())));
}

/// Test: Priority is clamped into the 1..=5 range
#[rstest]
#[case(0, 1)]
#[case(3, 3)]
#[case(9, 5)]
fn test_priority_clamped(#[case] input: u8, #[case] expected: u8) {
	// Arrange & Act
	let email = Email::builder()
		.to("user@example.com")
		.priority(input)
		.build()
		.unwrap();

	// Assert
	assert_eq!(email.priority(), Some(expected));
}

/// Test: Rerouting replaces recipients and preserves the originals as headers
#[rstest]
fn test_route_all_to_preserves_original_recipients() {
	// Arrange & Act
	let email = Email::builder()
		.from("noreply@example.com")
		.to(("user@example.com", "User"))
		.cc("manager@example.com")
		.bcc("audit@example.com")
		.route_all_to("trap@example.com")
		.build()
		.unwrap();

	// Assert
	assert_eq!(email.to().len(), 1);
	assert_eq!(email.to()[0].email(), "trap@example.com");
	assert!(email.cc().is_empty());
	assert!(email.bcc().is_empty());
	let headers = email.headers();
	assert!(headers.contains(&("X-To".to_string(), "User <user@example.com>".to_string())));
	assert!(headers.contains(&("X-Cc".to_string(), "manager@example.com".to_string())));
	assert!(headers.contains(&("X-Bcc".to_string(), "audit@example.com".to_string())));
}

/// Test: Address parsing accepts named and bare forms
#[rstest]
fn test_address_parse_forms() {
	// Arrange & Act
	let named = Address::parse("Jane Doe <jane@example.com>").unwrap();
	let bare = Address::parse("jane@example.com").unwrap();

	// Assert
	assert_eq!(named.email(), "jane@example.com");
	assert_eq!(named.name(), Some("Jane Doe"));
	assert_eq!(bare.email(), "jane@example.com");
	assert_eq!(bare.name(), None);
	assert_eq!(named.to_string(), "Jane Doe <jane@example.com>");
}

/// Test: Invalid recipient address fails the build
#[rstest]
#[case("not-an-email")]
#[case("double@@at.example.com")]
#[case("")]
fn test_invalid_recipient_rejected(#[case] address: &str) {
	// Arrange & Act
	let result = Email::builder().to(address).build();

	// Assert
	assert!(matches!(result, Err(MailError::InvalidAddress(_))));
}

/// Test: CRLF in the subject is rejected as header injection
#[rstest]
#[case("Hello\r\nBcc: attacker@evil.com")]
#[case("Hello\nX-Injected: 1")]
fn test_subject_injection_rejected(#[case] subject: &str) {
	// Arrange & Act
	let result = Email::builder()
		.to("user@example.com")
		.subject(subject)
		.build();

	// Assert
	assert!(matches!(result, Err(MailError::HeaderInjection(_))));
}

/// Test: CRLF in a display name is rejected as header injection
#[rstest]
fn test_display_name_injection_rejected() {
	// Arrange & Act
	let result = Email::builder()
		.to(("user@example.com", "Evil\r\nBcc: hidden@evil.com"))
		.build();

	// Assert
	assert!(matches!(result, Err(MailError::HeaderInjection(_))));
}

/// Test: CRLF in tags and metadata is rejected as header injection
#[rstest]
fn test_tag_and_metadata_injection_rejected() {
	// Arrange & Act
	let tagged = Email::builder()
		.to("user@example.com")
		.tag("bad\r\ntag")
		.build();
	let keyed = Email::builder()
		.to("user@example.com")
		.metadata("bad\nkey", "value")
		.build();

	// Assert
	assert!(matches!(tagged, Err(MailError::HeaderInjection(_))));
	assert!(matches!(keyed, Err(MailError::HeaderInjection(_))));
}

/// Test: Alternatives render between the text and HTML parts
#[rstest]
fn test_alternatives_round_out_the_body() {
	// Arrange
	let email = Email::builder()
		.from("sender@example.com")
		.to("user@example.com")
		.subject("Multi")
		.text("plain body")
		.alternative(Alternative::new("text/calendar", b"BEGIN:VCALENDAR".to_vec()))
		.html("<p>rich body</p>")
		.build()
		.unwrap();

	// Act
	let raw = email.to_mime().unwrap().formatted();
	let rendered = String::from_utf8_lossy(&raw);

	// Assert
	assert!(rendered.contains("multipart/alternative"));
	assert!(rendered.contains("text/calendar"));
	assert!(rendered.contains("plain body"));
	assert!(rendered.contains("<p>rich body</p>"));
}

/// Test: Attachments switch the message to multipart/mixed
#[rstest]
fn test_attachment_rendering() {
	// Arrange
	let email = Email::builder()
		.from("sender@example.com")
		.to("user@example.com")
		.subject("With attachment")
		.text("see attached")
		.attachment(Attachment::new("notes.txt", b"some notes".to_vec()))
		.build()
		.unwrap();

	// Act
	let raw = email.to_mime().unwrap().formatted();
	let rendered = String::from_utf8_lossy(&raw);

	// Assert
	assert!(rendered.contains("multipart/mixed"));
	assert!(rendered.contains("notes.txt"));
	assert!(rendered.contains("text/plain"));
}

/// Test: Inline attachments carry their Content-ID
#[rstest]
fn test_inline_attachment_content_id() {
	// Arrange
	let email = Email::builder()
		.from("sender@example.com")
		.to("user@example.com")
		.subject("Inline")
		.html(r#"<img src="cid:logo-cid"/>"#)
		.attachment(Attachment::inline("logo.png", vec![0x89, 0x50], "logo-cid"))
		.build()
		.unwrap();

	// Act
	let raw = email.to_mime().unwrap().formatted();
	let rendered = String::from_utf8_lossy(&raw);

	// Assert
	assert!(rendered.contains("logo-cid"));
	assert!(rendered.contains("inline"));
}

/// Test: Rendering requires a sender address
#[rstest]
fn test_mime_requires_sender() {
	// Arrange
	let email = Email::builder()
		.to("user@example.com")
		.subject("No sender")
		.build()
		.unwrap();

	// Act
	let result = email.to_mime();

	// Assert
	assert!(matches!(result, Err(MailError::MessageBuild(_))));
}

/// Test: Typed headers appear in the rendered message
#[rstest]
fn test_typed_headers_rendered() {
	// Arrange
	let email = Email::builder()
		.from("sender@example.com")
		.to("user@example.com")
		.subject("Tagged")
		.text("body")
		.tag("welcome")
		.priority(2)
		.build()
		.unwrap();

	// Act
	let raw = email.to_mime().unwrap().formatted();
	let rendered = String::from_utf8_lossy(&raw);

	// Assert
	assert!(rendered.contains("X-Tag: welcome"));
	assert!(rendered.contains("X-Priority: 2"));
}

/// Test: Bcc recipients are stripped from the variant used on the wire
#[rstest]
fn test_bcc_stripped_variant() {
	// Arrange
	let email = Email::builder()
		.from("sender@example.com")
		.to("user@example.com")
		.bcc("hidden@example.com")
		.subject("Secret")
		.text("body")
		.build()
		.unwrap();

	// Act
	let with_bcc = email.to_mime().unwrap().formatted();
	let without_bcc = email.to_mime_without_bcc().unwrap().formatted();

	// Assert
	assert!(String::from_utf8_lossy(&with_bcc).contains("hidden@example.com"));
	assert!(!String::from_utf8_lossy(&without_bcc).contains("hidden@example.com"));
}

/// Test: Envelope uses the return path as the reverse path
#[rstest]
fn test_envelope_reverse_path() {
	// Arrange
	let email = Email::builder()
		.from("sender@example.com")
		.return_path("bounce@example.com")
		.to("user@example.com")
		.bcc("hidden@example.com")
		.build()
		.unwrap();

	// Act
	let envelope = email.to_envelope().unwrap();

	// Assert
	assert_eq!(envelope.from().map(|a| a.to_string()), Some("bounce@example.com".to_string()));
	assert_eq!(envelope.to().len(), 2);
}
