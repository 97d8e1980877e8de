//! Helper functions for the mock Rancher proxy.

use serde_json::{json, Value};

/// Logical resource type for a manifest, derived from `apiVersion`/`kind`.
///
/// Core types are spelled `core.v1.<plural>`, grouped ones
/// `<group>.<version>.<plural>`.
pub fn logical_type_of(manifest: &Value) -> Option<String> {
	let api_version = manifest.get("apiVersion")?.as_str()?;
	let kind = manifest.get("kind")?.as_str()?;
	let plural = plural_of(kind);
	Some(if api_version.contains('/') {
		format!("{}.{plural}", api_version.replace('/', "."))
	} else {
		format!("core.{api_version}.{plural}")
	})
}

fn plural_of(kind: &str) -> String {
	let lower = kind.to_lowercase();
	match lower.as_str() {
		"endpoints" | "events" => lower,
		"ingress" => "ingresses".to_string(),
		_ if lower.ends_with('s') => lower,
		_ => lower + "s",
	}
}

/// Kubernetes `Status` body for an error response.
pub fn status_body(code: u16, reason: &str, message: &str) -> Value {
	json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	})
}

/// Reason phrase used in `Status` bodies.
pub fn reason_for(code: u16) -> &'static str {
	match code {
		400 => "BadRequest",
		401 => "Unauthorized",
		403 => "Forbidden",
		404 => "NotFound",
		405 => "MethodNotAllowed",
		409 => "AlreadyExists",
		_ => "InternalError",
	}
}

/// Match `metadata.labels` against a `k=v,k2=v2` equality selector.
///
/// An empty selector matches everything; other selector operators are not
/// understood and never match.
pub fn matches_label_selector(object: &Value, selector: &str) -> bool {
	selector
		.split(',')
		.map(str::trim)
		.filter(|term| !term.is_empty())
		.all(|term| {
			let Some((key, expected)) = term.split_once('=') else {
				return false;
			};
			let (key, expected) = (key.trim_end_matches('='), expected.trim_start_matches('='));
			object
				.pointer("/metadata/labels")
				.and_then(|labels| labels.get(key.trim()))
				.and_then(Value::as_str)
				== Some(expected.trim())
		})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_logical_type_of() {
		let pod = json!({"apiVersion": "v1", "kind": "Pod"});
		assert_eq!(logical_type_of(&pod).as_deref(), Some("core.v1.pods"));

		let ingress = json!({"apiVersion": "networking.k8s.io/v1", "kind": "Ingress"});
		assert_eq!(
			logical_type_of(&ingress).as_deref(),
			Some("networking.k8s.io.v1.ingresses")
		);

		assert_eq!(logical_type_of(&json!({"kind": "Pod"})), None);
	}

	#[test]
	fn test_label_selector() {
		let object = json!({"metadata": {"labels": {"app": "web", "tier": "front"}}});
		assert!(matches_label_selector(&object, ""));
		assert!(matches_label_selector(&object, "app=web"));
		assert!(matches_label_selector(&object, "app==web, tier=front"));
		assert!(!matches_label_selector(&object, "app=api"));
		assert!(!matches_label_selector(&object, "app"));
	}
}
