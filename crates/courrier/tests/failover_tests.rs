//! Failover transport integration tests
//!
//! Drives a failover chain over scriptable in-process delegates to pin
//! down the walk order, sticky mode, error propagation, and per-delegate
//! observer notifications.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use courrier::transport::{
	DeliveryOutcome, FailoverMode, FailoverTransport, ObserverSet, SendObserver, SentReceipt,
	Transport,
};
use courrier::{Email, MailError, MailResult};
use rstest::rstest;

/// A delegate that fails a fixed number of times, then succeeds forever.
struct FlakyTransport {
	name: String,
	failures_before_success: usize,
	calls: AtomicUsize,
	observers: ObserverSet,
}

impl FlakyTransport {
	fn new(name: &str, failures_before_success: usize) -> Self {
		Self {
			name: name.to_string(),
			failures_before_success,
			calls: AtomicUsize::new(0),
			observers: ObserverSet::new(),
		}
	}

	fn always_failing(name: &str) -> Self {
		Self::new(name, usize::MAX)
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Transport for FlakyTransport {
	fn name(&self) -> &str {
		&self.name
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
		if attempt < self.failures_before_success {
			return Err(MailError::Transport(format!("{} unavailable", self.name)));
		}
		Ok(SentReceipt::accepting_all(email))
	}
}

#[derive(Default)]
struct AttemptLog {
	attempts: Mutex<Vec<(String, DeliveryOutcome)>>,
}

impl AttemptLog {
	fn attempts(&self) -> Vec<(String, DeliveryOutcome)> {
		self.attempts.lock().unwrap().clone()
	}
}

impl SendObserver for AttemptLog {
	fn after_send(&self, transport: &str, _email: &Email, outcome: DeliveryOutcome) {
		self.attempts
			.lock()
			.unwrap()
			.push((transport.to_string(), outcome));
	}
}

fn sample_email() -> Email {
	Email::builder()
		.from("sender@example.com")
		.to("rcpt@example.com")
		.subject("failover probe")
		.text("body")
		.build()
		.unwrap()
}

/// Test: A dead primary falls through to the backup
#[rstest]
#[tokio::test]
async fn test_failover_falls_through_to_backup() {
	// Arrange
	let primary = Arc::new(FlakyTransport::always_failing("primary"));
	let backup = Arc::new(FlakyTransport::new("backup", 0));
	let chain = FailoverTransport::new(
		vec![
			Arc::clone(&primary) as Arc<dyn Transport>,
			Arc::clone(&backup) as Arc<dyn Transport>,
		],
		FailoverMode::default(),
	)
	.unwrap();

	// Act
	let receipt = chain.send(&sample_email()).await.unwrap();

	// Assert
	assert_eq!(receipt.accepted.len(), 1);
	assert_eq!(primary.calls(), 1);
	assert_eq!(backup.calls(), 1);
}

/// Test: The last delegate's error surfaces when every delegate fails
#[rstest]
#[tokio::test]
async fn test_failover_propagates_last_error() {
	// Arrange
	let chain = FailoverTransport::new(
		vec![
			Arc::new(FlakyTransport::always_failing("primary")) as Arc<dyn Transport>,
			Arc::new(FlakyTransport::always_failing("backup")) as Arc<dyn Transport>,
		],
		FailoverMode::default(),
	)
	.unwrap();

	// Act
	let result = chain.send(&sample_email()).await;

	// Assert
	match result {
		Err(MailError::Transport(message)) => assert_eq!(message, "backup unavailable"),
		other => panic!("expected transport error, got {:?}", other),
	}
}

/// Test: A healthy primary short-circuits the chain
#[rstest]
#[tokio::test]
async fn test_failover_stops_at_first_success() {
	// Arrange
	let primary = Arc::new(FlakyTransport::new("primary", 0));
	let backup = Arc::new(FlakyTransport::new("backup", 0));
	let chain = FailoverTransport::new(
		vec![
			Arc::clone(&primary) as Arc<dyn Transport>,
			Arc::clone(&backup) as Arc<dyn Transport>,
		],
		FailoverMode::default(),
	)
	.unwrap();

	// Act
	chain.send(&sample_email()).await.unwrap();

	// Assert
	assert_eq!(primary.calls(), 1);
	assert_eq!(backup.calls(), 0);
}

/// Test: The default mode gives a recovered primary its traffic back
#[rstest]
#[tokio::test]
async fn test_default_mode_retries_primary_each_send() {
	// Arrange
	let primary = Arc::new(FlakyTransport::new("primary", 1));
	let backup = Arc::new(FlakyTransport::new("backup", 0));
	let chain = FailoverTransport::new(
		vec![
			Arc::clone(&primary) as Arc<dyn Transport>,
			Arc::clone(&backup) as Arc<dyn Transport>,
		],
		FailoverMode::RestartEachSend,
	)
	.unwrap();

	// Act
	chain.send(&sample_email()).await.unwrap();
	chain.send(&sample_email()).await.unwrap();

	// Assert
	assert_eq!(primary.calls(), 2);
	assert_eq!(backup.calls(), 1);
}

/// Test: Sticky mode keeps sending through the last good delegate
#[rstest]
#[tokio::test]
async fn test_sticky_mode_stays_on_survivor() {
	// Arrange
	let primary = Arc::new(FlakyTransport::always_failing("primary"));
	let backup = Arc::new(FlakyTransport::new("backup", 0));
	let chain = FailoverTransport::new(
		vec![
			Arc::clone(&primary) as Arc<dyn Transport>,
			Arc::clone(&backup) as Arc<dyn Transport>,
		],
		FailoverMode::Sticky,
	)
	.unwrap();

	// Act
	chain.send(&sample_email()).await.unwrap();
	chain.send(&sample_email()).await.unwrap();

	// Assert
	assert_eq!(primary.calls(), 1);
	assert_eq!(backup.calls(), 2);
}

/// Test: An empty delegate list is a configuration error
#[rstest]
fn test_empty_delegate_list_is_rejected() {
	// Act
	let result = FailoverTransport::new(Vec::new(), FailoverMode::default());

	// Assert
	assert!(matches!(result, Err(MailError::Configuration(_))));
}

/// Test: Each delegate's observers see their own attempt and outcome
#[rstest]
#[tokio::test]
async fn test_delegate_observers_see_each_attempt() {
	// Arrange
	let log = Arc::new(AttemptLog::default());
	let primary = Arc::new(FlakyTransport::always_failing("primary"));
	let backup = Arc::new(FlakyTransport::new("backup", 0));
	primary.observers().register(Arc::clone(&log) as Arc<dyn SendObserver>);
	backup.observers().register(Arc::clone(&log) as Arc<dyn SendObserver>);
	let chain = FailoverTransport::new(
		vec![
			Arc::clone(&primary) as Arc<dyn Transport>,
			Arc::clone(&backup) as Arc<dyn Transport>,
		],
		FailoverMode::default(),
	)
	.unwrap();

	// Act
	chain.send(&sample_email()).await.unwrap();

	// Assert
	let attempts = log.attempts();
	assert_eq!(
		attempts,
		vec![
			("primary".to_string(), DeliveryOutcome::Failure),
			("backup".to_string(), DeliveryOutcome::Success),
		]
	);
}
