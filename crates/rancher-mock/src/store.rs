//! Object store shared by both mock surfaces.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::helpers::{logical_type_of, matches_label_selector};

/// Store key: logical type, namespace (empty when cluster-scoped), name.
pub type ObjectKey = (String, String, String);

/// A manifest to seed the mock with, tagged with its logical type.
#[derive(Debug, Clone)]
pub struct MockResource {
	pub resource_type: String,
	pub manifest: Value,
}

impl MockResource {
	/// Seed a manifest under a type derived from its `apiVersion`/`kind`.
	///
	/// # Panics
	///
	/// If the manifest has no `apiVersion` or `kind`.
	pub fn new(manifest: Value) -> Self {
		let resource_type = logical_type_of(&manifest).expect("manifest needs apiVersion and kind");
		Self {
			resource_type,
			manifest,
		}
	}

	/// Seed a manifest under an explicit logical type.
	pub fn typed(resource_type: impl Into<String>, manifest: Value) -> Self {
		Self {
			resource_type: resource_type.into(),
			manifest,
		}
	}
}

impl From<Value> for MockResource {
	fn from(manifest: Value) -> Self {
		Self::new(manifest)
	}
}

fn metadata_str<'a>(manifest: &'a Value, field: &str) -> &'a str {
	manifest
		.get("metadata")
		.and_then(|m| m.get(field))
		.and_then(Value::as_str)
		.unwrap_or("")
}

/// Write failures reported back as HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
	NotFound,
	AlreadyExists,
	MissingName,
}

/// Ordered object store; iteration order gives stable pagination.
#[derive(Debug, Default)]
pub struct MockStore {
	objects: BTreeMap<ObjectKey, Value>,
	revision: u64,
}

impl MockStore {
	pub fn seed(resources: Vec<MockResource>) -> Self {
		let mut store = Self::default();
		for resource in resources {
			let namespace = metadata_str(&resource.manifest, "namespace").to_string();
			let name = metadata_str(&resource.manifest, "name").to_string();
			let manifest = store.stamp(resource.manifest);
			store
				.objects
				.insert((resource.resource_type, namespace, name), manifest);
		}
		store
	}

	fn stamp(&mut self, mut manifest: Value) -> Value {
		self.revision += 1;
		if let Some(metadata) = manifest.get_mut("metadata").and_then(Value::as_object_mut) {
			metadata.insert(
				"resourceVersion".to_string(),
				Value::String(self.revision.to_string()),
			);
		}
		manifest
	}

	pub fn get(&self, resource_type: &str, namespace: &str, name: &str) -> Option<&Value> {
		self.objects
			.get(&(resource_type.to_string(), namespace.to_string(), name.to_string()))
	}

	/// Objects of a type, optionally restricted to one namespace, in key order.
	pub fn list(&self, resource_type: &str, namespace: &str, label_selector: &str) -> Vec<Value> {
		self.objects
			.iter()
			.filter(|((ty, ns, _), _)| ty == resource_type && (namespace.is_empty() || ns == namespace))
			.filter(|(_, object)| matches_label_selector(object, label_selector))
			.map(|(_, object)| object.clone())
			.collect()
	}

	/// Insert a new object; the namespace comes from the request path.
	pub fn create(
		&mut self,
		resource_type: &str,
		namespace: &str,
		mut manifest: Value,
	) -> Result<Value, StoreError> {
		let name = metadata_str(&manifest, "name").to_string();
		if name.is_empty() {
			return Err(StoreError::MissingName);
		}
		let key = (resource_type.to_string(), namespace.to_string(), name);
		if self.objects.contains_key(&key) {
			return Err(StoreError::AlreadyExists);
		}
		if !namespace.is_empty() {
			if let Some(metadata) = manifest.get_mut("metadata").and_then(Value::as_object_mut) {
				metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));
			}
		}
		let manifest = self.stamp(manifest);
		self.objects.insert(key, manifest.clone());
		Ok(manifest)
	}

	/// Replace an existing object wholesale.
	pub fn replace(
		&mut self,
		resource_type: &str,
		namespace: &str,
		name: &str,
		manifest: Value,
	) -> Result<Value, StoreError> {
		let key = (resource_type.to_string(), namespace.to_string(), name.to_string());
		if !self.objects.contains_key(&key) {
			return Err(StoreError::NotFound);
		}
		let manifest = self.stamp(manifest);
		self.objects.insert(key, manifest.clone());
		Ok(manifest)
	}

	pub fn remove(&mut self, resource_type: &str, namespace: &str, name: &str) -> Result<Value, StoreError> {
		self.objects
			.remove(&(resource_type.to_string(), namespace.to_string(), name.to_string()))
			.ok_or(StoreError::NotFound)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn pod(ns: &str, name: &str, app: &str) -> MockResource {
		MockResource::new(json!({
			"apiVersion": "v1",
			"kind": "Pod",
			"metadata": {"name": name, "namespace": ns, "labels": {"app": app}}
		}))
	}

	#[test]
	fn test_list_filters_namespace_and_labels() {
		let store = MockStore::seed(vec![
			pod("a", "web-0", "web"),
			pod("a", "api-0", "api"),
			pod("b", "web-1", "web"),
		]);

		assert_eq!(store.list("core.v1.pods", "", "").len(), 3);
		assert_eq!(store.list("core.v1.pods", "a", "").len(), 2);
		assert_eq!(store.list("core.v1.pods", "", "app=web").len(), 2);
		assert!(store.list("apps.v1.deployments", "", "").is_empty());
	}

	#[test]
	fn test_writes_bump_resource_version() {
		let mut store = MockStore::seed(vec![pod("a", "web-0", "web")]);
		let before = store.get("core.v1.pods", "a", "web-0").unwrap().clone();

		let after = store
			.replace("core.v1.pods", "a", "web-0", before.clone())
			.unwrap();

		assert_ne!(
			before.pointer("/metadata/resourceVersion"),
			after.pointer("/metadata/resourceVersion")
		);
	}

	#[test]
	fn test_create_conflicts_and_missing() {
		let mut store = MockStore::seed(vec![pod("a", "web-0", "web")]);
		let duplicate = json!({"metadata": {"name": "web-0"}});

		assert_eq!(
			store.create("core.v1.pods", "a", duplicate),
			Err(StoreError::AlreadyExists)
		);
		assert_eq!(
			store.create("core.v1.pods", "a", json!({"metadata": {}})),
			Err(StoreError::MissingName)
		);
		assert_eq!(store.remove("core.v1.pods", "a", "nope"), Err(StoreError::NotFound));
	}
}
