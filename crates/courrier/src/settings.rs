//! Mail configuration model.
//!
//! Configuration is a two-level structure: [`MailSettings`] holds the
//! defaults shared by every mailer (default mailer name, global sender
//! identity, fallback log channel and sendmail command) plus a map of named
//! [`MailerConfig`] records. Each record names a transport kind and carries
//! the kind-specific options as a flattened JSON map, which the manager
//! deserializes into one of the typed option structs below when the mailer
//! is first resolved.
//!
//! # Examples
//!
//! ```
//! use courrier::settings::{MailSettings, MailerConfig};
//!
//! let mut settings = MailSettings::default();
//! settings.default = "local".to_string();
//! settings.mailers.insert(
//! 	"local".to_string(),
//! 	MailerConfig::new("smtp")
//! 		.with_option("host", "127.0.0.1")
//! 		.with_option("port", 1025),
//! );
//! ```

use std::collections::HashMap;
use std::env;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroize;

use crate::message::Address;
use crate::{MailError, MailResult};

/// An address in configuration form: a bare email plus an optional
/// display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
	pub address: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl AddressEntry {
	/// Creates an entry with no display name.
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			name: None,
		}
	}

	/// Creates an entry with a display name.
	pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			name: Some(name.into()),
		}
	}

	/// Converts the entry into a message [`Address`].
	pub fn to_address(&self) -> Address {
		match &self.name {
			Some(name) => Address::with_name(&self.address, name),
			None => Address::new(&self.address),
		}
	}
}

/// A credential value that stays out of debug output and is wiped from
/// memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the underlying value for handing to a transport.
	pub fn expose(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for Secret {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Secret(***)")
	}
}

impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl Drop for Secret {
	fn drop(&mut self) {
		self.0.zeroize();
	}
}

fn default_mailer_name() -> String {
	"smtp".to_string()
}

/// Top-level mail settings.
///
/// The global `from`, `reply_to`, `to` and `return_path` entries apply to
/// every mailer that does not override them in its own [`MailerConfig`].
/// A global `to` reroutes all outgoing mail to that address, which is the
/// usual staging-environment safety net.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
	/// Name of the mailer used when none is requested explicitly.
	#[serde(default = "default_mailer_name")]
	pub default: String,
	/// Named mailer configurations.
	#[serde(default)]
	pub mailers: HashMap<String, MailerConfig>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<AddressEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reply_to: Option<AddressEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<AddressEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub return_path: Option<AddressEntry>,
	/// Fallback channel for log mailers that do not set their own.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub log_channel: Option<String>,
	/// Fallback command line for sendmail mailers that do not set their own.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sendmail: Option<String>,
}

impl Default for MailSettings {
	fn default() -> Self {
		Self {
			default: default_mailer_name(),
			mailers: HashMap::new(),
			from: None,
			reply_to: None,
			to: None,
			return_path: None,
			log_channel: None,
			sendmail: None,
		}
	}
}

impl MailSettings {
	/// Looks up a named mailer configuration.
	pub fn mailer_config(&self, name: &str) -> Option<&MailerConfig> {
		self.mailers.get(name)
	}

	/// Builds settings for a single mailer from `MAIL_*` environment
	/// variables.
	///
	/// `MAIL_MAILER` selects the transport kind (default `smtp`) and the
	/// resulting configuration is registered under that same name. SMTP
	/// connection details come from `MAIL_HOST`, `MAIL_PORT`,
	/// `MAIL_USERNAME`, `MAIL_PASSWORD` and `MAIL_ENCRYPTION`; the sender
	/// identity from `MAIL_FROM_ADDRESS` and `MAIL_FROM_NAME`. Provider
	/// transports that need API credentials are expected to be configured
	/// through [`MailSettings`] directly rather than the environment.
	pub fn from_env() -> MailResult<Self> {
		let kind = env::var("MAIL_MAILER").unwrap_or_else(|_| "smtp".to_string());

		let mut config = MailerConfig::new(&kind);
		if kind == "smtp" {
			let host = env::var("MAIL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
			config = config.with_option("host", host);
			match env::var("MAIL_PORT") {
				Ok(raw) => {
					let port: u16 = raw.parse().map_err(|_| {
						MailError::Configuration(format!("invalid MAIL_PORT value: {}", raw))
					})?;
					config = config.with_option("port", port);
				}
				Err(_) => {
					config = config.with_option("port", 2525);
				}
			}
			if let Ok(username) = env::var("MAIL_USERNAME") {
				config = config.with_option("username", username);
			}
			if let Ok(password) = env::var("MAIL_PASSWORD") {
				config = config.with_option("password", password);
			}
			if let Ok(encryption) = env::var("MAIL_ENCRYPTION") {
				config = config.with_option("encryption", encryption);
			}
		}

		let mut settings = MailSettings::default();
		settings.default = kind.clone();
		settings.mailers.insert(kind, config);

		if let Ok(address) = env::var("MAIL_FROM_ADDRESS") {
			settings.from = Some(match env::var("MAIL_FROM_NAME") {
				Ok(name) => AddressEntry::with_name(address, name),
				Err(_) => AddressEntry::new(address),
			});
		}
		if let Ok(path) = env::var("MAIL_SENDMAIL_PATH") {
			settings.sendmail = Some(path);
		}
		if let Ok(channel) = env::var("MAIL_LOG_CHANNEL") {
			settings.log_channel = Some(channel);
		}

		Ok(settings)
	}
}

/// One named mailer: a transport kind plus its options.
///
/// Options are carried as a flattened JSON map so that configuration files
/// can mix transport kinds freely; the manager deserializes the map into
/// the matching typed struct ([`SmtpOptions`], [`MailgunOptions`], ...)
/// when the mailer is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
	/// Transport kind: `smtp`, `sendmail`, `mail`, `log`, `array`, `ses`,
	/// `mailgun`, `postmark`, `aliyun-dm` or `failover`.
	pub transport: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<AddressEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reply_to: Option<AddressEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<AddressEntry>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub return_path: Option<AddressEntry>,
	#[serde(flatten)]
	pub options: serde_json::Map<String, Value>,
}

impl MailerConfig {
	pub fn new(transport: impl Into<String>) -> Self {
		Self {
			transport: transport.into(),
			from: None,
			reply_to: None,
			to: None,
			return_path: None,
			options: serde_json::Map::new(),
		}
	}

	/// Sets a single transport option.
	pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.options.insert(key.into(), value.into());
		self
	}

	/// Deserializes the option map into a typed option struct.
	pub(crate) fn options_as<T: DeserializeOwned>(&self) -> MailResult<T> {
		serde_json::from_value(Value::Object(self.options.clone())).map_err(|err| {
			MailError::Configuration(format!(
				"invalid options for {} transport: {}",
				self.transport, err
			))
		})
	}
}

fn default_smtp_host() -> String {
	"localhost".to_string()
}

/// Options for the `smtp` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpOptions {
	#[serde(default = "default_smtp_host")]
	pub host: String,
	#[serde(default)]
	pub port: Option<u16>,
	/// `tls` for an encrypted session, `none` or absent for cleartext.
	#[serde(default)]
	pub encryption: Option<String>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<Secret>,
	/// Connection timeout in seconds.
	#[serde(default)]
	pub timeout: Option<u64>,
	/// Accepted for configuration compatibility; binding a local source
	/// address is not supported and the value is ignored with a warning.
	#[serde(default)]
	pub source_ip: Option<String>,
	/// EHLO hostname announced to the server.
	#[serde(default)]
	pub local_domain: Option<String>,
	/// `plain`, `login` or `xoauth2`; absent means the mechanism is
	/// negotiated.
	#[serde(default)]
	pub auth_mode: Option<String>,
}

/// Options for the `sendmail` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct SendmailOptions {
	/// Full command line, e.g. `/usr/sbin/sendmail -t -i`.
	#[serde(default)]
	pub path: Option<String>,
	/// Seconds to wait for the process before giving up.
	#[serde(default)]
	pub timeout: Option<u64>,
}

/// Options for the `log` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct LogOptions {
	#[serde(default)]
	pub channel: Option<String>,
}

fn default_ses_region() -> String {
	"us-east-1".to_string()
}

/// Options for the `ses` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct SesOptions {
	pub key: String,
	pub secret: Secret,
	#[serde(default = "default_ses_region")]
	pub region: String,
	#[serde(default)]
	pub configuration_set: Option<String>,
}

fn default_mailgun_endpoint() -> String {
	"api.mailgun.net".to_string()
}

/// Options for the `mailgun` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct MailgunOptions {
	pub key: Secret,
	pub domain: String,
	/// API hostname; override for the EU region.
	#[serde(default = "default_mailgun_endpoint")]
	pub endpoint: String,
	/// Request timeout in seconds.
	#[serde(default)]
	pub timeout: Option<u64>,
}

fn default_postmark_endpoint() -> String {
	"https://api.postmarkapp.com".to_string()
}

/// Options for the `postmark` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct PostmarkOptions {
	pub token: Secret,
	#[serde(default = "default_postmark_endpoint")]
	pub endpoint: String,
	/// Request timeout in seconds.
	#[serde(default)]
	pub timeout: Option<u64>,
}

fn default_aliyun_endpoint() -> String {
	"dm.aliyuncs.com".to_string()
}

fn default_click_trace() -> String {
	"0".to_string()
}

/// Options for the `aliyun-dm` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct AliyunDmOptions {
	pub access_key_id: String,
	pub access_secret: Secret,
	#[serde(default)]
	pub region_id: Option<String>,
	#[serde(default = "default_aliyun_endpoint")]
	pub endpoint: String,
	/// `1` enables click tracing on the provider side.
	#[serde(default = "default_click_trace")]
	pub click_trace: String,
	/// Request timeout in seconds.
	#[serde(default)]
	pub timeout: Option<u64>,
}

/// Options for the `failover` transport kind.
#[derive(Debug, Clone, Deserialize)]
pub struct FailoverOptions {
	/// Names of the mailers to try, in order.
	pub mailers: Vec<String>,
	/// When set, later sends start from the delegate that last succeeded
	/// instead of retrying the full list from the top.
	#[serde(default)]
	pub sticky: bool,
}
