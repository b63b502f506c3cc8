//! Aliyun DirectMail transport.
//!
//! Calls the SingleSendMail RPC action. Aliyun's RPC style has no request
//! body to speak of: every field travels as a parameter, the parameters
//! are canonicalized into a sorted, percent-encoded query, and an
//! HMAC-SHA1 signature over `POST&%2F&<encoded query>` is appended before
//! the form is posted.
//!
//! DirectMail only carries an HTML and a plain-text body; attachments are
//! dropped with a warning.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha1::Sha1;
use uuid::Uuid;

use super::{ObserverSet, SentReceipt, Transport};
use crate::message::Email;
use crate::settings::{AliyunDmOptions, Secret};
use crate::{MailError, MailResult};

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug)]
pub struct AliyunDmTransport {
	access_key_id: String,
	access_secret: Secret,
	region_id: Option<String>,
	endpoint: String,
	click_trace: String,
	client: reqwest::Client,
	observers: ObserverSet,
}

/// RFC 3986 percent-encoding with the unreserved set only, as the Aliyun
/// signature algorithm requires. Space becomes `%20`, never `+`.
fn percent_encode(input: &str) -> String {
	let mut out = String::with_capacity(input.len());
	for byte in input.bytes() {
		match byte {
			b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
				out.push(byte as char);
			}
			_ => {
				out.push('%');
				out.push_str(&format!("{:02X}", byte));
			}
		}
	}
	out
}

fn canonical_query(params: &BTreeMap<String, String>) -> String {
	params
		.iter()
		.map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
		.collect::<Vec<_>>()
		.join("&")
}

fn sign_request(secret: &str, query: &str) -> MailResult<String> {
	let string_to_sign = format!("POST&%2F&{}", percent_encode(query));
	let mut mac = HmacSha1::new_from_slice(format!("{}&", secret).as_bytes())
		.map_err(|err| MailError::Configuration(format!("invalid aliyun signing key: {}", err)))?;
	mac.update(string_to_sign.as_bytes());
	Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

impl AliyunDmTransport {
	pub fn from_options(options: &AliyunDmOptions) -> MailResult<Self> {
		let mut builder = reqwest::Client::builder();
		if let Some(seconds) = options.timeout {
			builder = builder.timeout(Duration::from_secs(seconds));
		}
		let client = builder.build().map_err(|err| {
			MailError::Configuration(format!("failed to build aliyun http client: {}", err))
		})?;

		Ok(Self {
			access_key_id: options.access_key_id.clone(),
			access_secret: options.access_secret.clone(),
			region_id: options.region_id.clone(),
			endpoint: options.endpoint.clone(),
			click_trace: options.click_trace.clone(),
			client,
			observers: ObserverSet::new(),
		})
	}

	fn request_params(&self, email: &Email) -> MailResult<BTreeMap<String, String>> {
		let from = email.from().ok_or_else(|| {
			MailError::MessageBuild("a sender address is required".to_string())
		})?;

		let mut params = BTreeMap::new();
		params.insert("AccessKeyId".to_string(), self.access_key_id.clone());
		params.insert("AccountName".to_string(), from.email().to_string());
		params.insert("Action".to_string(), "SingleSendMail".to_string());
		params.insert("AddressType".to_string(), "1".to_string());
		params.insert("ClickTrace".to_string(), self.click_trace.clone());
		params.insert("Format".to_string(), "JSON".to_string());
		if let Some(name) = from.name() {
			params.insert("FromAlias".to_string(), name.to_string());
		}
		if let Some(html) = email.html_body() {
			params.insert("HtmlBody".to_string(), html.to_string());
		}
		if let Some(region) = &self.region_id {
			params.insert("RegionId".to_string(), region.clone());
		}
		params.insert("ReplyToAddress".to_string(), "false".to_string());
		params.insert("SignatureMethod".to_string(), "HMAC-SHA1".to_string());
		params.insert("SignatureNonce".to_string(), Uuid::new_v4().to_string());
		params.insert("SignatureVersion".to_string(), "1.0".to_string());
		params.insert("Subject".to_string(), email.subject().to_string());
		if let Some(text) = email.text_body() {
			params.insert("TextBody".to_string(), text.to_string());
		}
		params.insert(
			"Timestamp".to_string(),
			Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
		);
		let to = email
			.recipients()
			.iter()
			.map(|address| address.email().to_string())
			.collect::<Vec<_>>()
			.join(",");
		params.insert("ToAddress".to_string(), to);
		params.insert("Version".to_string(), "2015-11-23".to_string());

		let signature = sign_request(self.access_secret.expose(), &canonical_query(&params))?;
		params.insert("Signature".to_string(), signature);
		Ok(params)
	}
}

#[async_trait]
impl Transport for AliyunDmTransport {
	fn name(&self) -> &str {
		"aliyun-dm"
	}

	fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	async fn deliver(&self, email: &Email) -> MailResult<SentReceipt> {
		if !email.attachments().is_empty() {
			tracing::warn!(
				count = email.attachments().len(),
				"aliyun dm does not carry attachments; dropping them"
			);
		}

		let params = self.request_params(email)?;
		let response = self
			.client
			.post(format!("https://{}/", self.endpoint))
			.form(&params)
			.send()
			.await
			.map_err(|err| MailError::Provider {
				message: format!("Request to Aliyun DM API failed. Reason: {}.", err),
				source: Some(Box::new(err)),
			})?;

		let status = response.status();
		let body = response.text().await.unwrap_or_default();
		let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

		if !status.is_success() {
			let reason = payload
				.get("Message")
				.and_then(Value::as_str)
				.map(str::to_string)
				.unwrap_or_else(|| format!("HTTP {}", status));
			return Err(MailError::Provider {
				message: format!("Request to Aliyun DM API failed. Reason: {}.", reason),
				source: None,
			});
		}

		let mut receipt = SentReceipt::accepting_all(email);
		if let Some(env_id) = payload.get("EnvId").and_then(Value::as_str) {
			receipt = receipt
				.with_message_id(env_id)
				.with_header("X-Aliyun-DM-Env-ID", env_id);
		}
		if let Some(request_id) = payload.get("RequestId").and_then(Value::as_str) {
			receipt = receipt.with_header("X-Aliyun-DM-Request-ID", request_id);
		}
		Ok(receipt)
	}
}
