//! Mailer resolution and caching.
//!
//! The [`MailManager`] owns the [`MailSettings`] and turns named mailer
//! configurations into live [`Mailer`] instances on first use. Resolved
//! mailers are cached, so a mailer name always maps to the same instance
//! (and the same transport connection pool) until it is purged. Custom
//! transport kinds can be registered with [`MailManager::extend`] and
//! take precedence over the built-in kinds.
//!
//! # Examples
//!
//! ```
//! use courrier::mailable::Mailable;
//! use courrier::manager::MailManager;
//! use courrier::settings::{MailSettings, MailerConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> courrier::MailResult<()> {
//! let mut settings = MailSettings::default();
//! settings.default = "capture".to_string();
//! settings
//! 	.mailers
//! 	.insert("capture".to_string(), MailerConfig::new("array"));
//! let manager = MailManager::new(settings);
//!
//! let welcome = Mailable::new()
//! 	.from("noreply@example.com")
//! 	.subject("Welcome")
//! 	.text_template("Hello!");
//! manager.to("user@example.com")?.send(&welcome).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::events::{HookSet, MailEventHook};
use crate::mailer::{GlobalOverrides, Mailer};
use crate::message::Address;
use crate::pending::PendingMail;
use crate::queue::QueueDispatcher;
use crate::settings::{
	AddressEntry, AliyunDmOptions, FailoverOptions, LogOptions, MailSettings, MailerConfig,
	MailgunOptions, PostmarkOptions, SendmailOptions, SmtpOptions,
};
#[cfg(feature = "ses")]
use crate::settings::SesOptions;
#[cfg(feature = "ses")]
use crate::transport::SesTransport;
use crate::transport::{
	sendmail, AliyunDmTransport, FailoverMode, FailoverTransport, LogTransport, MailgunTransport,
	MemoryTransport, PostmarkTransport, SendmailTransport, SmtpTransport, Transport,
};
use crate::{MailError, MailResult};

/// Factory for a custom transport kind.
pub type TransportFactory =
	dyn Fn(&MailerConfig, &MailManager) -> MailResult<Arc<dyn Transport>> + Send + Sync;

/// Failover configurations may reference other failover mailers; the
/// chain is capped to keep a config cycle from recursing forever.
const MAX_FAILOVER_DEPTH: usize = 4;

pub struct MailManager {
	settings: MailSettings,
	mailers: RwLock<HashMap<String, Arc<Mailer>>>,
	custom_creators: RwLock<HashMap<String, Box<TransportFactory>>>,
	queue: RwLock<Option<Arc<dyn QueueDispatcher>>>,
	hooks: Arc<HookSet>,
}

impl MailManager {
	pub fn new(settings: MailSettings) -> Self {
		Self {
			settings,
			mailers: RwLock::new(HashMap::new()),
			custom_creators: RwLock::new(HashMap::new()),
			queue: RwLock::new(None),
			hooks: Arc::new(HookSet::new()),
		}
	}

	/// Builds a manager from `MAIL_*` environment variables.
	pub fn from_env() -> MailResult<Self> {
		Ok(Self::new(MailSettings::from_env()?))
	}

	pub fn settings(&self) -> &MailSettings {
		&self.settings
	}

	/// Returns the named mailer, or the default mailer for `None`,
	/// resolving and caching it on first use.
	pub fn mailer(&self, name: Option<&str>) -> MailResult<Arc<Mailer>> {
		let name = name.unwrap_or(&self.settings.default);
		if let Some(mailer) = self.mailers.read().get(name) {
			return Ok(Arc::clone(mailer));
		}

		let resolved = Arc::new(self.resolve(name)?);
		let mut cache = self.mailers.write();
		let entry = cache.entry(name.to_string()).or_insert(resolved);
		Ok(Arc::clone(entry))
	}

	/// Drops the cached instance of the named mailer (default mailer for
	/// `None`); the next lookup resolves it fresh.
	pub fn purge(&self, name: Option<&str>) {
		let name = name.unwrap_or(&self.settings.default);
		self.mailers.write().remove(name);
	}

	/// Drops every cached mailer.
	pub fn forget_all(&self) {
		self.mailers.write().clear();
	}

	/// Registers a factory for a transport kind. The factory wins over
	/// the built-in kinds, so an application can also replace `smtp` or
	/// `log` wholesale.
	pub fn extend<F>(&self, kind: impl Into<String>, factory: F)
	where
		F: Fn(&MailerConfig, &MailManager) -> MailResult<Arc<dyn Transport>>
			+ Send
			+ Sync
			+ 'static,
	{
		self.custom_creators.write().insert(kind.into(), Box::new(factory));
	}

	/// Wires in the queue dispatcher used for `should_queue` mailables.
	/// Applies to mailers resolved after this call.
	pub fn set_queue_dispatcher(&self, dispatcher: Arc<dyn QueueDispatcher>) {
		*self.queue.write() = Some(dispatcher);
	}

	/// Registers a lifecycle hook. The hook set is shared by every
	/// mailer, including ones already resolved.
	pub fn register_hook(&self, hook: Arc<dyn MailEventHook>) {
		self.hooks.register(hook);
	}

	/// Starts a recipient-first send on the default mailer.
	pub fn to(&self, address: impl Into<Address>) -> MailResult<PendingMail> {
		Ok(PendingMail::new(self.mailer(None)?).to(address))
	}

	/// Starts a recipient-first send with a Cc recipient.
	pub fn cc(&self, address: impl Into<Address>) -> MailResult<PendingMail> {
		Ok(PendingMail::new(self.mailer(None)?).cc(address))
	}

	/// Starts a recipient-first send with a Bcc recipient.
	pub fn bcc(&self, address: impl Into<Address>) -> MailResult<PendingMail> {
		Ok(PendingMail::new(self.mailer(None)?).bcc(address))
	}

	fn resolve(&self, name: &str) -> MailResult<Mailer> {
		let config = self
			.settings
			.mailer_config(name)
			.ok_or_else(|| MailError::UnknownMailer(name.to_string()))?;
		let transport = self.create_transport(config, 0)?;

		let overrides = GlobalOverrides {
			from: config
				.from
				.as_ref()
				.or(self.settings.from.as_ref())
				.map(AddressEntry::to_address),
			reply_to: config
				.reply_to
				.as_ref()
				.or(self.settings.reply_to.as_ref())
				.map(AddressEntry::to_address),
			return_path: config
				.return_path
				.as_ref()
				.or(self.settings.return_path.as_ref())
				.map(AddressEntry::to_address),
			to: config
				.to
				.as_ref()
				.or(self.settings.to.as_ref())
				.map(AddressEntry::to_address),
		};

		let mut mailer = Mailer::new(name, transport)
			.with_overrides(overrides)
			.with_hooks(Arc::clone(&self.hooks));
		if let Some(queue) = self.queue.read().clone() {
			mailer = mailer.with_queue(queue);
		}

		tracing::debug!(mailer = name, transport = %config.transport, "mailer resolved");
		Ok(mailer)
	}

	fn create_transport(
		&self,
		config: &MailerConfig,
		depth: usize,
	) -> MailResult<Arc<dyn Transport>> {
		if depth > MAX_FAILOVER_DEPTH {
			return Err(MailError::Configuration(
				"failover mailers are nested too deeply".to_string(),
			));
		}

		if let Some(factory) = self.custom_creators.read().get(config.transport.as_str()) {
			return factory(config, self);
		}

		match config.transport.as_str() {
			"smtp" => {
				let options: SmtpOptions = config.options_as()?;
				Ok(Arc::new(SmtpTransport::from_options(&options)?))
			}
			"sendmail" => {
				let options: SendmailOptions = config.options_as()?;
				let command = options
					.path
					.or_else(|| self.settings.sendmail.clone())
					.unwrap_or_else(|| sendmail::DEFAULT_COMMAND.to_string());
				let mut transport = SendmailTransport::new(command);
				if let Some(seconds) = options.timeout {
					transport = transport.with_timeout(Duration::from_secs(seconds));
				}
				Ok(Arc::new(transport))
			}
			// The `mail` kind always runs the platform default command.
			"mail" => Ok(Arc::new(SendmailTransport::platform_default())),
			"log" => {
				let options: LogOptions = config.options_as()?;
				let channel = options.channel.or_else(|| self.settings.log_channel.clone());
				Ok(Arc::new(LogTransport::new(channel)))
			}
			"array" => Ok(Arc::new(MemoryTransport::new())),
			#[cfg(feature = "ses")]
			"ses" => {
				let options: SesOptions = config.options_as()?;
				Ok(Arc::new(SesTransport::from_options(&options)))
			}
			"mailgun" => {
				let options: MailgunOptions = config.options_as()?;
				Ok(Arc::new(MailgunTransport::from_options(&options)?))
			}
			"postmark" => {
				let options: PostmarkOptions = config.options_as()?;
				Ok(Arc::new(PostmarkTransport::from_options(&options)?))
			}
			"aliyun-dm" => {
				let options: AliyunDmOptions = config.options_as()?;
				Ok(Arc::new(AliyunDmTransport::from_options(&options)?))
			}
			"failover" => {
				let options: FailoverOptions = config.options_as()?;
				let mut delegates = Vec::with_capacity(options.mailers.len());
				for delegate in &options.mailers {
					let delegate_config = self
						.settings
						.mailer_config(delegate)
						.ok_or_else(|| MailError::UnknownMailer(delegate.clone()))?;
					delegates.push(self.create_transport(delegate_config, depth + 1)?);
				}
				let mode = if options.sticky {
					FailoverMode::Sticky
				} else {
					FailoverMode::RestartEachSend
				};
				Ok(Arc::new(FailoverTransport::new(delegates, mode)?))
			}
			other => Err(MailError::UnsupportedTransport(other.to_string())),
		}
	}
}

impl std::fmt::Debug for MailManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MailManager")
			.field("default", &self.settings.default)
			.field("cached", &self.mailers.read().len())
			.finish_non_exhaustive()
	}
}
