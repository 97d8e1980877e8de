//! Conversion of raw surface responses into [`ResourceObject`]s.
//!
//! Native objects carry `apiVersion`/`kind` at the top level. Aggregated
//! objects may carry them either there or under `typeMeta`; both decode to
//! the same shape.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::resource::{ObjectMeta, ResourceCollection, ResourceObject, TypeMeta};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireObject {
	#[serde(default)]
	type_meta: Option<TypeMeta>,
	#[serde(default)]
	api_version: Option<String>,
	#[serde(default)]
	kind: Option<String>,
	#[serde(default)]
	metadata: ObjectMeta,
	#[serde(default)]
	spec: Option<Value>,
	#[serde(default)]
	status: Option<Value>,
}

impl From<WireObject> for ResourceObject {
	fn from(wire: WireObject) -> Self {
		let mut type_meta = wire.type_meta.unwrap_or_default();
		if type_meta.kind.is_empty() {
			type_meta.kind = wire.kind.unwrap_or_default();
		}
		if type_meta.api_version.is_empty() {
			type_meta.api_version = wire.api_version.unwrap_or_default();
		}
		Self {
			type_meta,
			metadata: wire.metadata,
			spec: wire.spec.filter(|v| !v.is_null()),
			status: wire.status.filter(|v| !v.is_null()),
		}
	}
}

#[derive(Deserialize)]
struct NativeList {
	#[serde(default)]
	items: Vec<Value>,
}

#[derive(Deserialize)]
struct AggregatedCollection {
	#[serde(default)]
	data: Vec<WireObject>,
	#[serde(default, rename = "continue")]
	continuation: Option<String>,
}

/// Decode a single object from either surface.
pub fn normalize(raw: &[u8]) -> Result<ResourceObject, serde_json::Error> {
	let wire: WireObject = serde_json::from_slice(raw)?;
	Ok(wire.into())
}

/// Decode a native list response.
///
/// Items that fail to decode are dropped; the continuation token is always
/// empty since native lists are fetched as a single page.
pub fn normalize_list(raw: &[u8]) -> Result<ResourceCollection, serde_json::Error> {
	let list: NativeList = serde_json::from_slice(raw)?;
	let total = list.items.len();
	let data: Vec<ResourceObject> = list
		.items
		.into_iter()
		.filter_map(|item| match serde_json::from_value::<WireObject>(item) {
			Ok(wire) => Some(wire.into()),
			Err(e) => {
				debug!(error = %e, "skipping malformed list item");
				None
			}
		})
		.collect();
	if data.len() != total {
		debug!(kept = data.len(), total, "dropped malformed native list items");
	}
	Ok(ResourceCollection {
		data,
		continuation: String::new(),
	})
}

/// Decode an aggregation API collection, keeping its continuation token.
pub fn aggregated_collection(raw: &[u8]) -> Result<ResourceCollection, serde_json::Error> {
	let collection: AggregatedCollection = serde_json::from_slice(raw)?;
	Ok(ResourceCollection {
		data: collection.data.into_iter().map(Into::into).collect(),
		continuation: collection.continuation.unwrap_or_default(),
	})
}
