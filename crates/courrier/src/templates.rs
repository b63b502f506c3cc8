//! Inline template rendering for email content.
//!
//! A full view engine is out of scope; mailables carry template strings and
//! a context map, rendered here with simple `{{key}}` substitution. Values
//! substituted into HTML templates are escaped to prevent XSS.

use crate::MailResult;
use std::collections::HashMap;

/// Context for template rendering.
pub type TemplateContext = HashMap<String, serde_json::Value>;

/// Render a template string with context using simple string replacement.
///
/// Replaces `{{key}}` with the corresponding value from the context. When
/// `html_escape` is true, dynamic values are HTML-escaped.
///
/// # Examples
///
/// ```
/// use courrier::templates::{render_template, TemplateContext};
///
/// let mut context = TemplateContext::new();
/// context.insert("name".to_string(), "Alice".into());
/// context.insert("order_id".to_string(), 12345.into());
///
/// let result = render_template("Order {{order_id}} for {{name}}", &context, false).unwrap();
/// assert_eq!(result, "Order 12345 for Alice");
/// ```
pub fn render_template(
	template: &str,
	context: &TemplateContext,
	html_escape: bool,
) -> MailResult<String> {
	let mut result = template.to_string();

	for (key, value) in context {
		let placeholder = format!("{{{{{}}}}}", key);
		let raw = match value {
			serde_json::Value::String(s) => s.clone(),
			serde_json::Value::Number(n) => n.to_string(),
			serde_json::Value::Bool(b) => b.to_string(),
			serde_json::Value::Null => String::new(),
			_ => value.to_string(),
		};
		let replacement = if html_escape { escape_html(&raw) } else { raw };

		result = result.replace(&placeholder, &replacement);
	}

	Ok(result)
}

/// Escape the HTML-significant characters of a string.
pub fn escape_html(input: &str) -> String {
	let mut escaped = String::with_capacity(input.len());
	for c in input.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_render_template() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("name".to_string(), "Alice".into());
		context.insert("age".to_string(), 30.into());

		// Act
		let result = render_template(
			"Hello {{name}}, you are {{age}} years old.",
			&context,
			false,
		)
		.unwrap();

		// Assert
		assert_eq!(result, "Hello Alice, you are 30 years old.");
	}

	#[rstest]
	fn test_render_template_with_boolean() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("active".to_string(), true.into());

		// Act
		let result = render_template("Account active: {{active}}", &context, false).unwrap();

		// Assert
		assert_eq!(result, "Account active: true");
	}

	#[rstest]
	fn test_render_template_html_escaping() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("name".to_string(), "<script>alert('xss')</script>".into());

		// Act
		let result = render_template("<p>Hello {{name}}</p>", &context, true).unwrap();

		// Assert
		assert_eq!(
			result,
			"<p>Hello &lt;script&gt;alert(&#x27;xss&#x27;)&lt;/script&gt;</p>"
		);
	}

	#[rstest]
	fn test_render_template_no_escape_when_disabled() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("name".to_string(), "<b>bold</b>".into());

		// Act
		let result = render_template("Hello {{name}}", &context, false).unwrap();

		// Assert
		assert_eq!(result, "Hello <b>bold</b>");
	}

	#[rstest]
	fn test_render_template_missing_key_left_in_place() {
		// Arrange
		let context = TemplateContext::new();

		// Act
		let result = render_template("Hello {{name}}", &context, false).unwrap();

		// Assert
		assert_eq!(result, "Hello {{name}}");
	}

	#[rstest]
	fn test_render_template_null_renders_empty() {
		// Arrange
		let mut context = TemplateContext::new();
		context.insert("gone".to_string(), serde_json::Value::Null);

		// Act
		let result = render_template("[{{gone}}]", &context, false).unwrap();

		// Assert
		assert_eq!(result, "[]");
	}
}
