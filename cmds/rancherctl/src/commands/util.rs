//! Utilities for command handlers.

use std::{
	fs,
	io::{self, ErrorKind, Read, Write},
	path::Path,
};

use anyhow::{Context, Result};
use serde_json::Value;

/// A writer wrapper that silently handles broken pipe errors.
///
/// When the underlying writer returns a broken pipe error (EPIPE), this wrapper
/// converts it to a successful write. This allows commands to exit cleanly when
/// output is piped to a process that closes early (e.g.,
/// `rancherctl list --type core.v1.pods | head -1`).
pub struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W> BrokenPipeGuard<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}

/// Parse a JSON or YAML document. JSON is valid YAML, but is tried first so
/// that its error messages are reported for JSON-looking input.
pub fn parse_document(content: &str) -> Result<Value> {
	let trimmed = content.trim_start();
	if trimmed.starts_with('{') || trimmed.starts_with('[') {
		return serde_json::from_str(content).context("parsing JSON document");
	}
	serde_yaml_with_quirks::from_str(content).context("parsing YAML document")
}

/// Read a JSON or YAML document from a file, or from stdin when `path` is `-`.
pub fn read_document(path: &Path) -> Result<Value> {
	let content = if path.as_os_str() == "-" {
		let mut buf = String::new();
		io::stdin()
			.read_to_string(&mut buf)
			.context("reading document from stdin")?;
		buf
	} else {
		fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
	};
	parse_document(&content)
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use serde_json::json;

	use super::*;

	struct ClosedPipe;

	impl Write for ClosedPipe {
		fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
			Err(io::Error::from(ErrorKind::BrokenPipe))
		}

		fn flush(&mut self) -> io::Result<()> {
			Err(io::Error::from(ErrorKind::BrokenPipe))
		}
	}

	#[test]
	fn test_broken_pipe_is_swallowed() {
		let mut guard = BrokenPipeGuard::new(ClosedPipe);
		assert!(writeln!(guard, "hello").is_ok());
		assert!(guard.flush().is_ok());
	}

	#[test]
	fn test_parse_yaml_document() {
		let value = parse_document(indoc! {"
			apiVersion: v1
			kind: ConfigMap
			metadata:
			  name: cfg
		"})
		.unwrap();
		assert_eq!(value["metadata"]["name"], json!("cfg"));
	}

	#[test]
	fn test_parse_json_document() {
		let value = parse_document(r#"{"spec": {"replicas": 3}}"#).unwrap();
		assert_eq!(value, json!({"spec": {"replicas": 3}}));
		assert!(parse_document("{broken").is_err());
	}
}
