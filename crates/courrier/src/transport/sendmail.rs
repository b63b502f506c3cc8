//! Sendmail transport.
//!
//! Pipes the rendered MIME message to a local sendmail-compatible binary
//! over stdin. The default command is `/usr/sbin/sendmail -t -i`: `-t`
//! reads the recipients from the message headers and `-i` keeps a lone
//! dot on a line from ending the input early.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::{MailError, MailResult};

/// Command line used when no path is configured.
pub const DEFAULT_COMMAND: &str = "/usr/sbin/sendmail -t -i";

#[derive(Debug)]
pub struct SendmailTransport {
	command: String,
	timeout: Option<Duration>,
	observers: ObserverSet,
}

impl SendmailTransport {
	/// Uses `command` as the full command line, split on whitespace.
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			timeout: None,
			observers: ObserverSet::new(),
		}
	}

	/// The platform default, [`DEFAULT_COMMAND`].
	pub fn platform_default() -> Self {
		Self::new(DEFAULT_COMMAND)
	}

	/// Limits how long to wait for the process to exit.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn command(&self) -> &str {
		&self.command
	}
}

#[async_trait]
impl Transport for SendmailTransport {
	fn name(&self) -> &str {
		"sendmail"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let mime = email.to_mime()?;
		let raw = mime.formatted();

		let mut parts = self.command.split_whitespace();
		let program = parts.next().ok_or_else(|| {
			MailError::Configuration("sendmail command is empty".to_string())
		})?;

		let mut child = Command::new(program)
			.args(parts)
			.stdin(Stdio::piped())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true)
			.spawn()
			.map_err(|err| {
				MailError::Transport(format!("failed to spawn {}: {}", program, err))
			})?;

		let mut stdin = child.stdin.take().ok_or_else(|| {
			MailError::Transport("sendmail stdin was not captured".to_string())
		})?;
		stdin.write_all(&raw).await?;
		drop(stdin);

		let output = match self.timeout {
			Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
				.await
				.map_err(|_| {
					MailError::Transport(format!(
						"sendmail did not exit within {} seconds",
						limit.as_secs()
					))
				})??,
			None => child.wait_with_output().await?,
		};

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			return Err(MailError::Transport(format!(
				"sendmail exited with {}: {}",
				output.status,
				stderr.trim()
			)));
		}

		Ok(SentReceipt::accepting_all(email))
	}
}
