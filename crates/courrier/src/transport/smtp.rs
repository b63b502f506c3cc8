//! SMTP transport.
//!
//! A thin wrapper over lettre's pooled async SMTP client. Encryption is
//! derived from the configured `encryption` and `port`: `tls` with port
//! 465 (or no explicit port) opens an implicitly encrypted session, `tls`
//! with any other port connects in cleartext and upgrades via STARTTLS,
//! and `none` (or no encryption) stays in cleartext.
//!
//! Delivery sends the raw rendered message against an envelope computed
//! from the return path and the full recipient set, so Bcc recipients
//! receive the message without ever appearing in its headers.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::extension::ClientId;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::settings::SmtpOptions;
use crate::{MailError, MailResult};

pub struct SmtpTransport {
	client: AsyncSmtpTransport<Tokio1Executor>,
	observers: ObserverSet,
}

impl SmtpTransport {
	/// Wraps an already-configured lettre client.
	pub fn new(client: AsyncSmtpTransport<Tokio1Executor>) -> Self {
		Self {
			client,
			observers: ObserverSet::new(),
		}
	}

	/// Builds a client from transport options.
	pub fn from_options(options: &SmtpOptions) -> MailResult<Self> {
		if let Some(ip) = &options.source_ip {
			tracing::warn!(
				source_ip = %ip,
				"binding a local source address is not supported; ignoring source_ip"
			);
		}

		let mut builder = match options.encryption.as_deref() {
			Some("tls") => match options.port {
				Some(port) if port != 465 => {
					AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&options.host)
						.map_err(|err| {
							MailError::Configuration(format!(
								"invalid smtp host {}: {}",
								options.host, err
							))
						})?
				}
				_ => AsyncSmtpTransport::<Tokio1Executor>::relay(&options.host).map_err(
					|err| {
						MailError::Configuration(format!(
							"invalid smtp host {}: {}",
							options.host, err
						))
					},
				)?,
			},
			None | Some("") | Some("none") => {
				AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&options.host)
			}
			Some(other) => {
				return Err(MailError::Configuration(format!(
					"unsupported smtp encryption: {}",
					other
				)));
			}
		};

		if let Some(port) = options.port {
			builder = builder.port(port);
		}
		if let (Some(username), Some(password)) = (&options.username, &options.password) {
			builder = builder.credentials(Credentials::new(
				username.clone(),
				password.expose().to_string(),
			));
		}
		if let Some(mode) = options.auth_mode.as_deref() {
			let mechanism = match mode {
				"plain" => Mechanism::Plain,
				"login" => Mechanism::Login,
				"xoauth2" => Mechanism::Xoauth2,
				other => {
					return Err(MailError::Configuration(format!(
						"unsupported smtp auth mode: {}",
						other
					)));
				}
			};
			builder = builder.authentication(vec![mechanism]);
		}
		if let Some(domain) = &options.local_domain {
			builder = builder.hello_name(ClientId::Domain(domain.clone()));
		}
		if let Some(seconds) = options.timeout {
			builder = builder.timeout(Some(Duration::from_secs(seconds)));
		}

		Ok(Self::new(builder.build()))
	}
}

impl fmt::Debug for SmtpTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SmtpTransport").finish_non_exhaustive()
	}
}

#[async_trait]
impl Transport for SmtpTransport {
	fn name(&self) -> &str {
		"smtp"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		let envelope = email.to_envelope()?;
		let mime = email.to_mime_without_bcc()?;
		let raw = mime.formatted();

		self.client.send_raw(&envelope, &raw).await?;

		Ok(SentReceipt::accepting_all(email))
	}

	async fn is_ready(&self) -> bool {
		self.client.test_connection().await.unwrap_or(false)
	}
}
