//! Failover transport.
//!
//! Wraps an ordered list of delegate transports and walks it until one
//! accepts the message. Each attempt goes through the delegate's own
//! [`Transport::send`], so per-delegate observers see every try,
//! including the failed ones.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::{MailError, MailResult};

/// How the delegate list is walked on later sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailoverMode {
	/// Every send starts from the first delegate, so a recovered primary
	/// takes traffic back immediately.
	#[default]
	RestartEachSend,
	/// Sends start from the delegate that last succeeded.
	Sticky,
}

pub struct FailoverTransport {
	delegates: Vec<Arc<dyn Transport>>,
	mode: FailoverMode,
	last_good: Mutex<usize>,
	observers: ObserverSet,
}

impl FailoverTransport {
	pub fn new(delegates: Vec<Arc<dyn Transport>>, mode: FailoverMode) -> MailResult<Self> {
		if delegates.is_empty() {
			return Err(MailError::Configuration(
				"failover transport needs at least one delegate".to_string(),
			));
		}
		Ok(Self {
			delegates,
			mode,
			last_good: Mutex::new(0),
			observers: ObserverSet::new(),
		})
	}

	pub fn mode(&self) -> FailoverMode {
		self.mode
	}
}

impl fmt::Debug for FailoverTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let names: Vec<_> = self.delegates.iter().map(|delegate| delegate.name()).collect();
		f.debug_struct("FailoverTransport")
			.field("delegates", &names)
			.field("mode", &self.mode)
			.finish()
	}
}

#[async_trait]
impl Transport for FailoverTransport {
	fn name(&self) -> &str {
		"failover"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let start = match self.mode {
			FailoverMode::RestartEachSend => 0,
			FailoverMode::Sticky => *self.last_good.lock(),
		};
		let count = self.delegates.len();
		let mut last_error = None;

		for offset in 0..count {
			let index = (start + offset) % count;
			let delegate = &self.delegates[index];
			match delegate.send(email).await {
				Ok(receipt) => {
					if self.mode == FailoverMode::Sticky {
						*self.last_good.lock() = index;
					}
					return Ok(receipt);
				}
				Err(err) => {
					tracing::warn!(
						transport = delegate.name(),
						error = %err,
						"failover delegate failed; trying the next one"
					);
					last_error = Some(err);
				}
			}
		}

		Err(last_error.unwrap_or_else(|| {
			MailError::Configuration("failover transport needs at least one delegate".to_string())
		}))
	}

	async fn is_ready(&self) -> bool {
		for delegate in &self.delegates {
			if delegate.is_ready().await {
				return true;
			}
		}
		false
	}
}
