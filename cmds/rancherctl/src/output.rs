//! Rendering of command results to stdout.

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use rancher_client::{ResourceCollection, ResourceObject};
use serde::Serialize;
use tabwriter::TabWriter;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Json,
	Yaml,
	/// Aligned NAMESPACE/NAME/KIND/APIVERSION columns
	Table,
}

/// A list page as printed: the bare items, or items plus the token for the
/// next page.
#[derive(Serialize)]
#[serde(untagged)]
enum ListView<'a> {
	Page {
		items: &'a [ResourceObject],
		#[serde(rename = "continue")]
		continuation: &'a str,
	},
	Items(&'a [ResourceObject]),
}

impl<'a> From<&'a ResourceCollection> for ListView<'a> {
	fn from(collection: &'a ResourceCollection) -> Self {
		if collection.has_more() {
			Self::Page {
				items: &collection.data,
				continuation: &collection.continuation,
			}
		} else {
			Self::Items(&collection.data)
		}
	}
}

fn write_serialized<W: Write, T: Serialize>(format: OutputFormat, value: &T, mut writer: W) -> Result<()> {
	match format {
		OutputFormat::Yaml => {
			let yaml = serde_yaml_with_quirks::to_string(value).context("serializing output as YAML")?;
			writer.write_all(yaml.as_bytes())?;
			if !yaml.ends_with('\n') {
				writeln!(writer)?;
			}
		}
		OutputFormat::Json | OutputFormat::Table => {
			serde_json::to_writer_pretty(&mut writer, value).context("serializing output as JSON")?;
			writeln!(writer)?;
		}
	}
	writer.flush()?;
	Ok(())
}

fn write_table<W: Write>(objects: &[ResourceObject], continuation: &str, writer: W) -> Result<()> {
	let mut tw = TabWriter::new(writer);
	writeln!(tw, "NAMESPACE\tNAME\tKIND\tAPIVERSION")?;
	for object in objects {
		writeln!(
			tw,
			"{}\t{}\t{}\t{}",
			object.metadata.namespace,
			object.metadata.name,
			object.type_meta.kind,
			object.type_meta.api_version
		)?;
	}
	if !continuation.is_empty() {
		writeln!(tw, "\nmore results: --continue {continuation}")?;
	}
	tw.flush()?;
	Ok(())
}

/// Print one page of a list.
pub fn write_collection<W: Write>(
	format: OutputFormat,
	collection: &ResourceCollection,
	writer: W,
) -> Result<()> {
	match format {
		OutputFormat::Table => write_table(&collection.data, &collection.continuation, writer),
		_ => write_serialized(format, &ListView::from(collection), writer),
	}
}

/// Print a single object.
pub fn write_object<W: Write>(format: OutputFormat, object: &ResourceObject, writer: W) -> Result<()> {
	match format {
		OutputFormat::Table => write_table(std::slice::from_ref(object), "", writer),
		_ => write_serialized(format, object, writer),
	}
}

#[cfg(test)]
mod tests {
	use rancher_client::{ObjectMeta, TypeMeta};
	use serde_json::{json, Value};

	use super::*;

	fn object(name: &str) -> ResourceObject {
		ResourceObject {
			type_meta: TypeMeta {
				kind: "Pod".to_string(),
				api_version: "v1".to_string(),
			},
			metadata: ObjectMeta {
				name: name.to_string(),
				namespace: "default".to_string(),
				..ObjectMeta::default()
			},
			..ResourceObject::default()
		}
	}

	fn render_json(collection: &ResourceCollection) -> Value {
		let mut out = Vec::new();
		write_collection(OutputFormat::Json, collection, &mut out).unwrap();
		serde_json::from_slice(&out).unwrap()
	}

	#[test]
	fn test_list_without_token_is_bare_array() {
		let collection = ResourceCollection {
			data: vec![object("a")],
			continuation: String::new(),
		};
		let rendered = render_json(&collection);
		assert!(rendered.is_array());
		assert_eq!(rendered[0]["metadata"]["name"], "a");
	}

	#[test]
	fn test_list_with_token_wraps_items() {
		let collection = ResourceCollection {
			data: vec![object("a")],
			continuation: "next".to_string(),
		};
		let rendered = render_json(&collection);
		assert_eq!(rendered["continue"], json!("next"));
		assert_eq!(rendered["items"].as_array().map(Vec::len), Some(1));
	}

	#[test]
	fn test_table_output() {
		let collection = ResourceCollection {
			data: vec![object("web-0"), object("web-1")],
			continuation: String::new(),
		};
		let mut out = Vec::new();
		write_collection(OutputFormat::Table, &collection, &mut out).unwrap();

		let text = String::from_utf8(out).unwrap();
		let lines: Vec<_> = text.lines().collect();
		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("NAMESPACE"));
		assert!(lines[1].contains("web-0"));
	}

	#[test]
	fn test_yaml_object() {
		let mut out = Vec::new();
		write_object(OutputFormat::Yaml, &object("web"), &mut out).unwrap();

		let text = String::from_utf8(out).unwrap();
		assert!(text.contains("name: web"));
		assert!(text.contains("kind: Pod"));
	}
}
