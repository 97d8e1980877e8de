//! JSON merge for read-modify-write patches.

use serde_json::Value;

/// Deep merge `patch` into `base`.
///
/// Objects merge key by key; any other patch value, `null` included,
/// replaces the base value.
pub fn merge_json(base: Value, patch: Value) -> Value {
	match (base, patch) {
		(Value::Object(mut base_map), Value::Object(patch_map)) => {
			for (key, patch_value) in patch_map {
				let base_value = base_map.remove(&key).unwrap_or(Value::Null);
				base_map.insert(key, merge_json(base_value, patch_value));
			}
			Value::Object(base_map)
		}
		(_, patch) => patch,
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_merge_nested_objects() {
		let base = json!({
			"metadata": {"name": "web", "labels": {"app": "web"}},
			"spec": {"replicas": 1, "paused": false}
		});
		let patch = json!({
			"metadata": {"labels": {"tier": "front"}},
			"spec": {"replicas": 3}
		});

		assert_eq!(
			merge_json(base, patch),
			json!({
				"metadata": {"name": "web", "labels": {"app": "web", "tier": "front"}},
				"spec": {"replicas": 3, "paused": false}
			})
		);
	}

	#[test]
	fn test_merge_replaces_non_objects() {
		let base = json!({"spec": {"ports": [80, 443], "mode": {"a": 1}}});
		let patch = json!({"spec": {"ports": [8080], "mode": "plain"}});

		assert_eq!(
			merge_json(base, patch),
			json!({"spec": {"ports": [8080], "mode": "plain"}})
		);
	}

	#[test]
	fn test_merge_null_overwrites() {
		let base = json!({"spec": {"paused": true}});
		let patch = json!({"spec": {"paused": null}});

		assert_eq!(merge_json(base, patch), json!({"spec": {"paused": null}}));
	}
}
