//! Uniform object shapes returned by every surface.

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind and apiVersion of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
	#[serde(default)]
	pub kind: String,
	#[serde(default)]
	pub api_version: String,
}

/// The subset of object metadata carried through both surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub namespace: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource_version: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub labels: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub annotations: BTreeMap<String, String>,
}

/// A single resource, independent of the surface that served it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
	pub type_meta: TypeMeta,
	pub metadata: ObjectMeta,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub spec: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<Value>,
}

impl ResourceObject {
	/// Body suitable for a full-object write: `apiVersion`/`kind` (when known),
	/// `metadata`, `spec` and `status`.
	pub fn to_manifest(&self) -> Value {
		let mut manifest = serde_json::Map::new();
		if !self.type_meta.api_version.is_empty() {
			manifest.insert(
				"apiVersion".to_string(),
				Value::String(self.type_meta.api_version.clone()),
			);
		}
		if !self.type_meta.kind.is_empty() {
			manifest.insert("kind".to_string(), Value::String(self.type_meta.kind.clone()));
		}
		manifest.insert(
			"metadata".to_string(),
			serde_json::to_value(&self.metadata).unwrap_or(Value::Null),
		);
		manifest.insert(
			"spec".to_string(),
			self.spec.clone().unwrap_or(Value::Null),
		);
		manifest.insert(
			"status".to_string(),
			self.status.clone().unwrap_or(Value::Null),
		);
		Value::Object(manifest)
	}
}

/// One page of resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceCollection {
	pub data: Vec<ResourceObject>,
	/// Continuation token for the next page; empty when there are no more pages.
	#[serde(rename = "continue", skip_serializing_if = "String::is_empty")]
	pub continuation: String,
}

impl ResourceCollection {
	/// Whether the server reported more pages.
	pub fn has_more(&self) -> bool {
		!self.continuation.is_empty()
	}
}

/// Per-call list parameters.
///
/// Empty strings and a zero limit mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct ListOptions {
	/// Namespace to list in; empty lists across all namespaces.
	#[builder(default, into)]
	pub namespace: String,
	#[builder(default, into)]
	pub label_selector: String,
	#[builder(default, into)]
	pub field_selector: String,
	/// Page size; zero leaves it to the server.
	#[builder(default)]
	pub limit: u32,
	/// Opaque token from a previous [`ResourceCollection`].
	#[builder(default, into)]
	pub continuation: String,
}

impl ListOptions {
	/// Options for the page following `collection`.
	pub fn next_page(&self, collection: &ResourceCollection) -> Self {
		Self {
			continuation: collection.continuation.clone(),
			..self.clone()
		}
	}
}

/// Address of a single object (or, with an empty name, of a collection to
/// create in).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef<'a> {
	pub cluster: &'a str,
	pub resource_type: &'a str,
	/// Empty for cluster-scoped resources.
	pub namespace: &'a str,
	pub name: &'a str,
}

impl<'a> ObjectRef<'a> {
	pub fn new(cluster: &'a str, resource_type: &'a str) -> Self {
		Self {
			cluster,
			resource_type,
			namespace: "",
			name: "",
		}
	}

	#[must_use]
	pub fn in_namespace(self, namespace: &'a str) -> Self {
		Self { namespace, ..self }
	}

	#[must_use]
	pub fn named(self, name: &'a str) -> Self {
		Self { name, ..self }
	}
}
