//! Queue handoff.
//!
//! The mail layer does not run a queue of its own. Queued sends are
//! wrapped in a self-contained [`QueuedMailJob`] payload and handed to
//! whatever [`QueueDispatcher`] the application wires in; a worker later
//! deserializes the job and calls [`QueuedMailJob::run`] against a
//! manager. The payload serializes the full mailable, so attachment
//! bytes always travel base64-encoded inside the job JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mailable::Mailable;
use crate::mailer::SentMessage;
use crate::manager::MailManager;
use crate::MailResult;

/// Sink for queued mail jobs, implemented by the application's queue
/// integration.
#[async_trait]
pub trait QueueDispatcher: Send + Sync {
	async fn enqueue(&self, job: QueuedMailJob) -> MailResult<()>;
}

/// A queued send, serialized in full so a worker process can replay it
/// without access to the enqueuing process's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedMailJob {
	pub id: Uuid,
	/// Name of the mailer the job should be sent through.
	pub mailer: String,
	pub mailable: Mailable,
	/// Queue name for the dispatcher; `None` means its default queue.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub queue: Option<String>,
	/// Requested delay before the worker should run the job.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delay_seconds: Option<u64>,
	pub enqueued_at: DateTime<Utc>,
}

impl QueuedMailJob {
	pub fn new(mailer: impl Into<String>, mailable: Mailable, delay_seconds: Option<u64>) -> Self {
		let queue = mailable.queue.clone();
		Self {
			id: Uuid::new_v4(),
			mailer: mailer.into(),
			mailable,
			queue,
			delay_seconds,
			enqueued_at: Utc::now(),
		}
	}

	/// Stable job name for queue dashboards.
	pub fn display_name(&self) -> &'static str {
		"courrier::send"
	}

	/// Executes the job on a worker. Goes through the immediate send path
	/// so a `should_queue` flag on the payload cannot re-enqueue the job
	/// forever.
	pub async fn run(&self, manager: &MailManager) -> MailResult<Option<SentMessage>> {
		let mailer = manager.mailer(Some(&self.mailer))?;
		mailer.send_now(&self.mailable).await
	}
}
