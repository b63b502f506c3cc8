//! Capture transport integration tests
//!
//! Tests the in-memory array transport and the log transport: capture
//! order, flush semantics, receipts, and the observer notifications
//! around each attempt.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use courrier::transport::{
	DeliveryOutcome, LogTransport, MemoryTransport, ObserverSet, SendObserver, SentReceipt,
	Transport,
};
use courrier::{Email, MailError, MailResult};
use rstest::rstest;

#[derive(Default)]
struct RecordingObserver {
	events: Mutex<Vec<(String, String, Option<DeliveryOutcome>)>>,
}

impl RecordingObserver {
	fn events(&self) -> Vec<(String, String, Option<DeliveryOutcome>)> {
		self.events.lock().unwrap().clone()
	}
}

impl SendObserver for RecordingObserver {
	fn before_send(&self, transport: &str, _email: &Email) {
		self.events
			.lock()
			.unwrap()
			.push(("before".to_string(), transport.to_string(), None));
	}

	fn after_send(&self, transport: &str, _email: &Email, outcome: DeliveryOutcome) {
		self.events
			.lock()
			.unwrap()
			.push(("after".to_string(), transport.to_string(), Some(outcome)));
	}
}

struct FailingTransport {
	observers: ObserverSet,
}

#[async_trait]
impl Transport for FailingTransport {
	fn name(&self) -> &str {
		"failing"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, _email: &Email) -> MailResult<SentReceipt> {
		Err(MailError::Transport("connection refused".to_string()))
	}
}

fn sample_email(subject: &str) -> Email {
	Email::builder()
		.from("sender@example.com")
		.to("rcpt@example.com")
		.subject(subject)
		.text("body")
		.build()
		.unwrap()
}

/// Test: Captured messages keep their send order
#[rstest]
#[tokio::test]
async fn test_memory_transport_captures_in_order() {
	// Arrange
	let transport = MemoryTransport::new();

	// Act
	for subject in ["first", "second", "third"] {
		transport.send(&sample_email(subject)).await.unwrap();
	}

	// Assert
	let captured = transport.messages();
	let subjects: Vec<_> = captured.iter().map(|email| email.subject()).collect();
	assert_eq!(subjects, vec!["first", "second", "third"]);
}

/// Test: Lifecycle hooks default to no-ops and readiness
#[rstest]
#[tokio::test]
async fn test_lifecycle_defaults() {
	// Arrange
	let transport = MemoryTransport::new();

	// Act & Assert
	transport.start().await.unwrap();
	assert!(transport.is_ready().await);
	transport.send(&sample_email("alive")).await.unwrap();
	transport.stop().await.unwrap();
	assert_eq!(transport.messages().len(), 1);
}

/// Test: Flush drains the mailbox
#[rstest]
#[tokio::test]
async fn test_memory_flush_drains_mailbox() {
	// Arrange
	let transport = MemoryTransport::new();
	transport.send(&sample_email("one")).await.unwrap();
	transport.send(&sample_email("two")).await.unwrap();

	// Act
	let drained = transport.flush();

	// Assert
	assert_eq!(drained.len(), 2);
	assert!(transport.messages().is_empty());
}

/// Test: The array transport reports a spooled outcome, not a real send
#[rstest]
#[tokio::test]
async fn test_memory_transport_reports_spooled() {
	// Arrange
	let transport = MemoryTransport::new();
	let observer = Arc::new(RecordingObserver::default());
	transport.observers().register(Arc::clone(&observer) as Arc<dyn SendObserver>);

	// Act
	transport.send(&sample_email("spooled")).await.unwrap();

	// Assert
	let events = observer.events();
	assert_eq!(events.len(), 2);
	assert_eq!(events[0], ("before".to_string(), "array".to_string(), None));
	assert_eq!(
		events[1],
		(
			"after".to_string(),
			"array".to_string(),
			Some(DeliveryOutcome::Spooled)
		)
	);
}

/// Test: Receipts claim every unique recipient
#[rstest]
#[tokio::test]
async fn test_receipt_covers_unique_recipients() {
	// Arrange
	let transport = MemoryTransport::new();
	let email = Email::builder()
		.from("sender@example.com")
		.to("a@example.com")
		.cc("b@example.com")
		.cc("a@example.com")
		.bcc("c@example.com")
		.subject("fanout")
		.build()
		.unwrap();

	// Act
	let receipt = transport.send(&email).await.unwrap();

	// Assert
	assert_eq!(receipt.accepted.len(), 3);
	assert!(receipt.rejected.is_empty());
	assert!(receipt.message_id.is_none());
}

/// Test: The log transport renders the message and succeeds
#[rstest]
#[tokio::test]
async fn test_log_transport_accepts_message() {
	// Arrange
	let transport = LogTransport::new(Some("mail-debug".to_string()));
	let observer = Arc::new(RecordingObserver::default());
	transport.observers().register(Arc::clone(&observer) as Arc<dyn SendObserver>);

	// Act
	let receipt = transport.send(&sample_email("logged")).await.unwrap();

	// Assert
	assert_eq!(transport.channel(), Some("mail-debug"));
	assert_eq!(receipt.accepted.len(), 1);
	let events = observer.events();
	assert_eq!(events[1].2, Some(DeliveryOutcome::Success));
}

/// Test: Observers see the failure outcome when delivery errors
#[rstest]
#[tokio::test]
async fn test_observer_sees_failure_outcome() {
	// Arrange
	let transport = FailingTransport {
		observers: ObserverSet::new(),
	};
	let observer = Arc::new(RecordingObserver::default());
	transport.observers().register(Arc::clone(&observer) as Arc<dyn SendObserver>);

	// Act
	let result = transport.send(&sample_email("doomed")).await;

	// Assert
	assert!(matches!(result, Err(MailError::Transport(_))));
	let events = observer.events();
	assert_eq!(events.len(), 2);
	assert_eq!(events[1].2, Some(DeliveryOutcome::Failure));
}
