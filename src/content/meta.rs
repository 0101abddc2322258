//! Front-matter parsing in the `Key: value` header style.
//!
//! Rules:
//! - an optional leading `---` line opens the block;
//! - `Key: value` lines (up to three leading spaces) start a field; keys are lowercased;
//! - lines indented by four or more spaces continue the previous field;
//! - a blank line, a `---`/`...` line, or any other line closes the block.
//!
//! Every field keeps all of its values; publishing only looks at the first one.

// self
use crate::_prelude::*;

/// Parsed header fields plus the Markdown body that follows them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
	/// Lowercased key → values in source order.
	pub fields: BTreeMap<String, Vec<String>>,
	/// Remaining Markdown source.
	pub body: String,
}
impl FrontMatter {
	/// Splits `source` into header fields and body.
	pub fn parse(source: &str) -> Self {
		let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
		let mut lines = source.lines().peekable();
		let mut current: Option<String> = None;

		if lines.peek().is_some_and(|line| is_begin_marker(line)) {
			lines.next();
		}

		while let Some(line) = lines.peek().copied() {
			if line.trim().is_empty() || is_end_marker(line) {
				lines.next();

				break;
			}
			if let Some((key, value)) = split_field(line) {
				let key = key.to_ascii_lowercase();

				fields.entry(key.clone()).or_default().push(value.trim().to_owned());
				current = Some(key);
				lines.next();

				continue;
			}
			if let (Some(key), Some(value)) = (current.as_ref(), continuation(line)) {
				fields.entry(key.clone()).or_default().push(value.trim().to_owned());
				lines.next();

				continue;
			}

			break;
		}

		let body = lines.collect::<Vec<_>>().join("\n");

		Self { fields, body }
	}

	/// First value recorded for `key` (keys are matched case-insensitively).
	pub fn first(&self, key: &str) -> Option<&str> {
		self.fields
			.get(&key.to_ascii_lowercase())
			.and_then(|values| values.first())
			.map(String::as_str)
			.filter(|value| !value.is_empty())
	}
}

fn is_begin_marker(line: &str) -> bool {
	line.starts_with("---") && line[3..].chars().next().is_none_or(char::is_whitespace)
}

fn is_end_marker(line: &str) -> bool {
	is_begin_marker(line)
		|| (line.starts_with("...") && line[3..].chars().next().is_none_or(char::is_whitespace))
}

fn split_field(line: &str) -> Option<(&str, &str)> {
	let indent = line.len() - line.trim_start_matches(' ').len();

	if indent > 3 {
		return None;
	}

	let rest = &line[indent..];
	let (key, value) = rest.split_once(':')?;
	let valid_key = !key.is_empty()
		&& key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

	valid_key.then_some((key, value))
}

fn continuation(line: &str) -> Option<&str> {
	line.starts_with("    ").then(|| line.trim_start())
}
