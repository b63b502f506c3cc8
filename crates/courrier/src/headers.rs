//! Typed wire headers emitted by this crate.
//!
//! lettre resolves header names statically through `Header::name()`, so
//! arbitrary run-time header names cannot reach the wire. Every
//! informational header courrier stamps therefore has a fixed name and a
//! typed implementation here: tags, metadata, priority, and the original
//! recipient lists preserved when a global `to` override rewrites a
//! message.

use lettre::message::header::{Header, HeaderName, HeaderValue};

macro_rules! string_header {
	($(#[$meta:meta])* $type_name:ident, $header_name:literal) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq)]
		pub struct $type_name(String);

		impl $type_name {
			/// Create the header from its rendered value.
			pub fn new(value: impl Into<String>) -> Self {
				Self(value.into())
			}

			/// Get the rendered header value.
			pub fn value(&self) -> &str {
				&self.0
			}
		}

		impl Header for $type_name {
			fn name() -> HeaderName {
				HeaderName::new_from_ascii_str($header_name)
			}

			fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
				Ok(Self(s.to_string()))
			}

			fn display(&self) -> HeaderValue {
				HeaderValue::new(Self::name(), self.0.clone())
			}
		}
	};
}

string_header!(
	/// Message tags, comma-joined (`X-Tag`).
	XTagHeader,
	"X-Tag"
);

string_header!(
	/// Message metadata as `key=value` pairs, comma-joined (`X-Metadata`).
	XMetadataHeader,
	"X-Metadata"
);

string_header!(
	/// Message priority, `1` (highest) through `5` (lowest) (`X-Priority`).
	XPriorityHeader,
	"X-Priority"
);

string_header!(
	/// Original To recipients preserved by a global `to` override (`X-To`).
	XToHeader,
	"X-To"
);

string_header!(
	/// Original Cc recipients preserved by a global `to` override (`X-Cc`).
	XCcHeader,
	"X-Cc"
);

string_header!(
	/// Original Bcc recipients preserved by a global `to` override (`X-Bcc`).
	XBccHeader,
	"X-Bcc"
);
