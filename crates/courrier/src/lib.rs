//! # Courrier
//!
//! Mail composition and delivery with swappable transports, built for async
//! applications.
//!
//! ## Features
//!
//! ### Message Building
//! - **Email**: Fluent builder for messages with validation on build
//! - **Alternatives**: Plain text, HTML and additional content renditions
//! - **Attachments**: File attachments with automatic MIME type detection
//! - **Inline Images**: Embed images in HTML bodies using Content-ID
//! - **Tags, Metadata, Priority**: Carried as `X-Tag`, `X-Metadata` and
//!   `X-Priority` headers and mapped to provider fields where supported
//!
//! ### Transports
//! - **SMTP**: Pooled async SMTP with implicit TLS and STARTTLS
//! - **Sendmail**: Pipe to a local sendmail-compatible binary
//! - **Log**: Write rendered messages to the process log
//! - **Array**: Capture messages in memory for tests
//! - **SES / Mailgun / Postmark / Aliyun DirectMail**: Provider APIs with
//!   provider-qualified error reporting
//! - **Failover**: Walk an ordered list of mailers until one accepts
//!
//! ### Mailers and the Manager
//! - **Mailer**: Binds a transport to global from/reply-to/return-path
//!   defaults and a reroute-everything address for staging
//! - **MailManager**: Resolves named mailers from configuration, caches
//!   them, and accepts custom transport kinds at runtime
//!
//! ### Lifecycle
//! - **Events**: Pre-send hooks that can cancel a message, post-send hooks
//!   that see the transport receipt
//! - **Observers**: Per-attempt notifications, including each delegate an
//!   attempted failover chain went through
//! - **Queueing**: `should_queue` mailables become serialized jobs handed
//!   to an application-supplied dispatcher
//!
//! ### Validation
//! - **RFC 5321/5322 Compliance**: Length and syntax checks on addresses
//! - **Header Injection Protection**: CR/LF screening across subject,
//!   display names, tags and metadata
//! - **IDNA Domains**: International domain names validated via punycode
//!
//! ## Examples
//!
//! ### Sending Through the Manager
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> courrier::MailResult<()> {
//! use courrier::{MailManager, Mailable};
//! use courrier::settings::{MailSettings, MailerConfig};
//!
//! let mut settings = MailSettings::default();
//! settings.mailers.insert(
//!     "smtp".to_string(),
//!     MailerConfig::new("smtp")
//!         .with_option("host", "smtp.example.com")
//!         .with_option("port", 587)
//!         .with_option("encryption", "tls")
//!         .with_option("username", "mailer")
//!         .with_option("password", "secret"),
//! );
//! let manager = MailManager::new(settings);
//!
//! let welcome = Mailable::new()
//!     .from(("noreply@example.com", "Example"))
//!     .subject("Welcome!")
//!     .html_template("<h1>Hello {{name}}</h1>")
//!     .text_template("Hello {{name}}")
//!     .with("name", "Alice");
//!
//! manager.to("user@example.com")?.send(&welcome).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Building a Message Directly
//!
//! ```rust,no_run
//! use courrier::{Attachment, Email};
//!
//! # fn main() -> courrier::MailResult<()> {
//! let report = Attachment::new("report.pdf", b"PDF content".to_vec());
//! let logo = Attachment::inline("logo.png", b"PNG content".to_vec(), "logo-cid");
//!
//! let email = Email::builder()
//!     .from("reports@example.com")
//!     .to(("user@example.com", "User"))
//!     .subject("Monthly Report")
//!     .text("Please find attached your monthly report.")
//!     .html(r#"<img src="cid:logo-cid"/><p>Report attached.</p>"#)
//!     .attachment(report)
//!     .attachment(logo)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Failover Across Mailers
//!
//! ```rust,no_run
//! use courrier::MailManager;
//! use courrier::settings::{MailSettings, MailerConfig};
//!
//! # fn main() -> courrier::MailResult<()> {
//! let mut settings = MailSettings::default();
//! settings.default = "resilient".to_string();
//! settings.mailers.insert(
//!     "postmark".to_string(),
//!     MailerConfig::new("postmark").with_option("token", "server-token"),
//! );
//! settings.mailers.insert(
//!     "backup".to_string(),
//!     MailerConfig::new("smtp").with_option("host", "smtp.example.com"),
//! );
//! settings.mailers.insert(
//!     "resilient".to_string(),
//!     MailerConfig::new("failover")
//!         .with_option("mailers", vec!["postmark", "backup"]),
//! );
//!
//! let manager = MailManager::new(settings);
//! let mailer = manager.mailer(None)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Queued Delivery
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> courrier::MailResult<()> {
//! # let manager: courrier::MailManager = todo!();
//! use courrier::Mailable;
//!
//! let digest = Mailable::new()
//!     .from("digest@example.com")
//!     .subject("Your weekly digest")
//!     .text_template("This week: {{highlights}}")
//!     .with("highlights", "three new features")
//!     .on_queue("emails");
//!
//! // With a queue dispatcher wired in, this enqueues instead of sending.
//! manager.to("user@example.com")?.send(&digest).await?;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod headers;
pub mod mailable;
pub mod mailer;
pub mod manager;
pub mod message;
pub mod pending;
pub mod queue;
pub mod settings;
pub mod templates;
pub mod transport;
pub mod validation;

use thiserror::Error;

pub use events::{HookSet, MailEventHook, MessageSending, MessageSent, SendDecision};
pub use mailable::Mailable;
pub use mailer::{GlobalOverrides, Mailer, SendOutcome, SentMessage};
pub use manager::MailManager;
pub use message::{Address, Alternative, Attachment, Email, EmailBuilder};
pub use pending::PendingMail;
pub use queue::{QueueDispatcher, QueuedMailJob};
pub use settings::{MailSettings, MailerConfig};
pub use transport::{DeliveryOutcome, SendObserver, SentReceipt, Transport};
pub use validation::MAX_EMAIL_LENGTH;

#[derive(Debug, Error)]
pub enum MailError {
	#[error("Mailer [{0}] is not defined")]
	UnknownMailer(String),

	#[error("Unsupported mail transport [{0}]")]
	UnsupportedTransport(String),

	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Invalid email address: {0}")]
	InvalidAddress(String),

	#[error("Header injection attempt detected: {0}")]
	HeaderInjection(String),

	#[error("Failed to build message: {0}")]
	MessageBuild(String),

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("SMTP error: {0}")]
	Smtp(#[from] lettre::transport::smtp::Error),

	#[error("{message}")]
	Provider {
		message: String,
		#[source]
		source: Option<Box<dyn std::error::Error + Send + Sync>>,
	},

	#[error("Queue error: {0}")]
	Queue(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type MailResult<T> = std::result::Result<T, MailError>;
