//! Translation between logical resource types and surface paths.
//!
//! A logical resource type is the dotted `<group>.<version>.<plural>`
//! identifier used by the aggregation API (`apps.v1.deployments`,
//! `core.v1.pods`). The core Kubernetes group is spelled `core` there, while
//! the native API addresses it as the empty group under `/api`.

use phf::{phf_map, phf_set};

/// Group literal the aggregation API uses for the core Kubernetes group.
pub const CORE_GROUP: &str = "core";

pub const VIRTUAL_MACHINES: &str = "kubevirt.io.virtualmachines";
pub const VIRTUAL_MACHINE_INSTANCES: &str = "kubevirt.io.virtualmachineinstances";
pub const VIRTUAL_MACHINE_IMAGES: &str = "harvesterhci.io.virtualmachineimages";
pub const NETWORK_ATTACHMENT_DEFINITIONS: &str = "k8s.cni.cncf.io.networkattachmentdefinitions";
/// Management types live on the `local` cluster.
pub const MANAGEMENT_CLUSTERS: &str = "management.cattle.io.clusters";
pub const MANAGEMENT_PROJECTS: &str = "management.cattle.io.projects";
/// Some deployments only know persistent volume claims under the alternate form.
pub const PERSISTENT_VOLUME_CLAIMS: &str = "v1.persistentvolumeclaims";
pub const EVENTS: &str = "core.v1.events";
pub const NODES: &str = "core.v1.nodes";

/// Kinds whose resource name is not `<lowercase kind> + "s"`.
static IRREGULAR_PLURALS: phf::Map<&'static str, &'static str> = phf_map! {
	"endpoints" => "endpoints",
	"events" => "events",
	"ingress" => "ingresses",
};

/// Core resources that are tried on the native surface before the
/// aggregation API.
static WELL_KNOWN_CORE: phf::Set<&'static str> = phf_set! {
	"pods",
	"nodes",
	"events",
	"namespaces",
	"services",
	"configmaps",
	"secrets",
	"persistentvolumeclaims",
	"persistentvolumes",
};

/// Lower-case and pluralize a kind into its resource name.
pub fn pluralize(kind: &str) -> String {
	let lower = kind.to_lowercase();
	if let Some(plural) = IRREGULAR_PLURALS.get(lower.as_str()) {
		return (*plural).to_string();
	}
	if lower.ends_with('s') {
		lower
	} else {
		lower + "s"
	}
}

/// Build the logical resource type for an `apiVersion`/`kind` pair.
///
/// ```
/// use rancher_client::typemap::logical_type;
///
/// assert_eq!(logical_type("v1", "Pod"), "core.v1.pods");
/// assert_eq!(logical_type("apps/v1", "Deployment"), "apps.v1.deployments");
/// ```
pub fn logical_type(api_version: &str, kind: &str) -> String {
	let resource = pluralize(kind);
	if api_version.is_empty() || api_version == "v1" {
		return format!("{CORE_GROUP}.v1.{resource}");
	}
	format!("{}.{resource}", api_version.replace('/', "."))
}

/// Group/version/resource triple addressing a type on the native API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativePath {
	/// Empty for the core group.
	pub group: String,
	pub version: String,
	pub resource: String,
}

impl NativePath {
	/// Native path of a core (`/api`) resource.
	pub fn core(resource: &str) -> Self {
		Self {
			group: String::new(),
			version: "v1".to_string(),
			resource: resource.to_string(),
		}
	}

	/// `/api/<version>` for the core group, `/apis/<group>/<version>` otherwise.
	pub fn base_path(&self) -> String {
		if self.group.is_empty() {
			format!("/api/{}", self.version)
		} else {
			format!("/apis/{}/{}", self.group, self.version)
		}
	}
}

/// Decompose a logical type into its native group/version/resource.
///
/// Returns `None` when the type has fewer than two dot-separated segments.
pub fn native_path(logical: &str) -> Option<NativePath> {
	let parts: Vec<&str> = logical.split('.').collect();
	if parts.len() < 2 {
		return None;
	}
	let resource = parts[parts.len() - 1];
	let version = parts[parts.len() - 2];
	let group = parts[..parts.len() - 2].join(".");
	let group = if group == CORE_GROUP { String::new() } else { group };
	Some(NativePath {
		group,
		version: version.to_string(),
		resource: resource.to_string(),
	})
}

/// The `v1.<rest>` spelling of a `core.v1.<rest>` type.
///
/// Some Rancher versions expose core types on the aggregation API without the
/// `core` group prefix.
pub fn alternate_form(logical: &str) -> Option<String> {
	logical
		.strip_prefix("core.v1.")
		.map(|rest| format!("v1.{rest}"))
}

/// Resource name of a well-known core type, accepting both the `core.v1.`
/// and the `v1.` spelling.
pub fn well_known_core(logical: &str) -> Option<&'static str> {
	let resource = logical
		.strip_prefix("core.v1.")
		.or_else(|| logical.strip_prefix("v1."))?;
	WELL_KNOWN_CORE.get_key(resource).copied()
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::core_pod("v1", "Pod", "core.v1.pods")]
	#[case::empty_api_version("", "ConfigMap", "core.v1.configmaps")]
	#[case::endpoints_unchanged("v1", "Endpoints", "core.v1.endpoints")]
	#[case::events_unchanged("v1", "Events", "core.v1.events")]
	#[case::ingress_irregular("networking.k8s.io/v1", "Ingress", "networking.k8s.io.v1.ingresses")]
	#[case::ingress_apps("apps/v1", "Ingress", "apps.v1.ingresses")]
	#[case::deployment("apps/v1", "Deployment", "apps.v1.deployments")]
	#[case::already_plural("harvesterhci.io/v1beta1", "Settings", "harvesterhci.io.v1beta1.settings")]
	#[case::crd("kubevirt.io/v1", "VirtualMachine", "kubevirt.io.v1.virtualmachines")]
	fn test_logical_type(#[case] api_version: &str, #[case] kind: &str, #[case] expected: &str) {
		assert_eq!(logical_type(api_version, kind), expected);
		// Deterministic across calls
		assert_eq!(logical_type(api_version, kind), logical_type(api_version, kind));
	}

	#[test]
	fn test_native_path_grouped() {
		assert_eq!(
			native_path("apps.v1.deployments"),
			Some(NativePath {
				group: "apps".to_string(),
				version: "v1".to_string(),
				resource: "deployments".to_string(),
			})
		);
	}

	#[test]
	fn test_native_path_core() {
		let path = native_path("core.v1.pods").unwrap();
		assert_eq!(path, NativePath::core("pods"));
		assert_eq!(path.base_path(), "/api/v1");
	}

	#[test]
	fn test_native_path_dotted_group() {
		let path = native_path("k8s.cni.cncf.io.v1.network-attachment-definitions").unwrap();
		assert_eq!(path.group, "k8s.cni.cncf.io");
		assert_eq!(path.version, "v1");
		assert_eq!(path.base_path(), "/apis/k8s.cni.cncf.io/v1");
	}

	#[test]
	fn test_native_path_alternate_form_is_core() {
		let path = native_path("v1.persistentvolumeclaims").unwrap();
		assert_eq!(path.group, "");
		assert_eq!(path.base_path(), "/api/v1");
	}

	#[test]
	fn test_native_path_single_segment_unmapped() {
		assert_eq!(native_path("pods"), None);
	}

	#[rstest]
	#[case::core("core.v1.pods", Some("v1.pods"))]
	#[case::grouped("apps.v1.deployments", None)]
	#[case::already_alternate("v1.pods", None)]
	fn test_alternate_form(#[case] logical: &str, #[case] expected: Option<&str>) {
		assert_eq!(alternate_form(logical).as_deref(), expected);
	}

	#[rstest]
	#[case::pods("core.v1.pods", Some("pods"))]
	#[case::alternate_spelling("v1.nodes", Some("nodes"))]
	#[case::pvc("core.v1.persistentvolumeclaims", Some("persistentvolumeclaims"))]
	#[case::not_well_known("core.v1.endpoints", None)]
	#[case::grouped("apps.v1.deployments", None)]
	#[case::suffix_only("pods", None)]
	fn test_well_known_core(#[case] logical: &str, #[case] expected: Option<&str>) {
		assert_eq!(well_known_core(logical), expected);
	}
}
