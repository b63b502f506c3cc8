//! Email address validation and sanitization.
//!
//! Validation runs when a message is built, so every address that reaches a
//! transport has already passed the checks here. Sanitization normalizes an
//! address without losing information: RFC 5321 treats the local part as
//! case-sensitive, so only the domain is lowercased.

use crate::{MailError, MailResult};

/// Maximum total length of an email address (RFC 5321).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of the local part of an email address (RFC 5321).
pub const MAX_LOCAL_PART_LENGTH: usize = 64;

const ATEXT_SYMBOLS: &str = "!#$%&'*+-/=?^_`{|}~";

/// Validate an email address.
///
/// Checks the `local@domain` structure, RFC 5321 length limits, the local
/// part character set, and the domain labels. Domains are run through IDNA
/// conversion, so internationalized domains are accepted.
///
/// # Examples
///
/// ```
/// use courrier::validation::validate_email;
///
/// assert!(validate_email("user+tag@example.co.uk").is_ok());
/// assert!(validate_email("user@.com").is_err());
/// assert!(validate_email("no-at-sign").is_err());
/// ```
pub fn validate_email(email: &str) -> MailResult<()> {
	if email.is_empty() {
		return Err(MailError::InvalidAddress("empty address".to_string()));
	}
	if email.len() > MAX_EMAIL_LENGTH {
		return Err(MailError::InvalidAddress(format!(
			"address exceeds {} characters",
			MAX_EMAIL_LENGTH
		)));
	}
	check_header_injection(email)?;
	if email.chars().any(char::is_whitespace) {
		return Err(MailError::InvalidAddress(format!(
			"whitespace in address: {}",
			email
		)));
	}

	let (local, domain) = split_address(email)?;
	validate_local_part(local, email)?;
	validate_domain(domain, email)?;
	Ok(())
}

/// Validate every address in a list, failing on the first invalid entry.
pub fn validate_email_list<S: AsRef<str>>(emails: &[S]) -> MailResult<()> {
	for email in emails {
		validate_email(email.as_ref())?;
	}
	Ok(())
}

/// Sanitize an email address: trim surrounding whitespace and lowercase the
/// domain. The local part is left untouched (RFC 5321: local parts are
/// case-sensitive).
///
/// # Examples
///
/// ```
/// use courrier::validation::sanitize_email;
///
/// assert_eq!(
///     sanitize_email("  John.Smith@Example.COM  ").unwrap(),
///     "John.Smith@example.com"
/// );
/// ```
pub fn sanitize_email(email: &str) -> MailResult<String> {
	let trimmed = email.trim();
	validate_email(trimmed)?;

	let (local, domain) = split_address(trimmed)?;
	Ok(format!("{}@{}", local, domain.to_lowercase()))
}

/// Sanitize every address in a list, preserving order.
pub fn sanitize_email_list<S: AsRef<str>>(emails: &[S]) -> MailResult<Vec<String>> {
	emails
		.iter()
		.map(|email| sanitize_email(email.as_ref()))
		.collect()
}

/// Reject strings carrying CR, LF, or NUL.
///
/// Every string that ends up in a message header (addresses, display names,
/// subject, tags, metadata) passes through this check, closing off header
/// injection attacks.
pub fn check_header_injection(value: &str) -> MailResult<()> {
	if value.contains(['\r', '\n', '\0']) {
		return Err(MailError::HeaderInjection(value.to_string()));
	}
	Ok(())
}

/// Validate a display name for use in an address header.
///
/// Display names may contain any printable characters but never CR/LF/NUL.
pub fn validate_display_name(name: &str) -> MailResult<()> {
	check_header_injection(name)
}

fn split_address(email: &str) -> MailResult<(&str, &str)> {
	if email.matches('@').count() != 1 {
		return Err(MailError::InvalidAddress(format!(
			"expected exactly one '@': {}",
			email
		)));
	}
	// Exactly one '@' is present, so both halves exist.
	let (local, domain) = email
		.split_once('@')
		.ok_or_else(|| MailError::InvalidAddress(email.to_string()))?;
	Ok((local, domain))
}

fn validate_local_part(local: &str, email: &str) -> MailResult<()> {
	if local.is_empty() {
		return Err(MailError::InvalidAddress(format!(
			"empty local part: {}",
			email
		)));
	}
	if local.len() > MAX_LOCAL_PART_LENGTH {
		return Err(MailError::InvalidAddress(format!(
			"local part exceeds {} characters: {}",
			MAX_LOCAL_PART_LENGTH, email
		)));
	}
	if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
		return Err(MailError::InvalidAddress(format!(
			"misplaced dot in local part: {}",
			email
		)));
	}
	for c in local.chars() {
		if !(c.is_alphanumeric() || c == '.' || ATEXT_SYMBOLS.contains(c)) {
			return Err(MailError::InvalidAddress(format!(
				"invalid character '{}' in local part: {}",
				c, email
			)));
		}
	}
	Ok(())
}

fn validate_domain(domain: &str, email: &str) -> MailResult<()> {
	if domain.is_empty() {
		return Err(MailError::InvalidAddress(format!(
			"empty domain: {}",
			email
		)));
	}

	let ascii_domain = idna::domain_to_ascii(domain)
		.map_err(|_| MailError::InvalidAddress(format!("invalid domain: {}", email)))?;

	for label in ascii_domain.split('.') {
		if label.is_empty() || label.len() > 63 {
			return Err(MailError::InvalidAddress(format!(
				"invalid domain label in: {}",
				email
			)));
		}
		if label.starts_with('-') || label.ends_with('-') {
			return Err(MailError::InvalidAddress(format!(
				"domain label starts or ends with '-': {}",
				email
			)));
		}
		if !label
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-')
		{
			return Err(MailError::InvalidAddress(format!(
				"invalid character in domain: {}",
				email
			)));
		}
	}
	Ok(())
}
