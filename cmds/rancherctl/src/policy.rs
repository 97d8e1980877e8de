//! Security policy consulted before every mutating call.

use thiserror::Error;

use crate::config::RancherConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
	#[error("{0} refused: rancherctl is in read-only mode (set readOnly: false or pass --read-only false)")]
	ReadOnly(&'static str),

	#[error("delete refused: destructive operations are disabled")]
	Destructive,

	#[error("namespace `{0}` is denied by policy")]
	DeniedNamespace(String),

	#[error("namespace `{0}` is not in the allowed namespaces")]
	NamespaceNotAllowed(String),
}

/// What the current invocation is permitted to change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
	pub read_only: bool,
	pub disable_destructive: bool,
	pub allowed_namespaces: Vec<String>,
	pub denied_namespaces: Vec<String>,
}

impl Default for Policy {
	fn default() -> Self {
		Self::from_config(&RancherConfig::default())
	}
}

impl Policy {
	pub fn from_config(config: &RancherConfig) -> Self {
		Self {
			read_only: config.read_only,
			disable_destructive: config.disable_destructive,
			allowed_namespaces: config.allowed_namespaces.clone(),
			denied_namespaces: config.denied_namespaces.clone(),
		}
	}

	/// Create, update, patch and actions.
	pub fn can_write(&self) -> bool {
		!self.read_only
	}

	pub fn can_delete(&self) -> bool {
		!self.read_only && !self.disable_destructive
	}

	/// Gate a non-delete mutation named `verb` in `namespace`.
	pub fn check_write(&self, verb: &'static str, namespace: &str) -> Result<(), PolicyError> {
		if !self.can_write() {
			return Err(PolicyError::ReadOnly(verb));
		}
		self.check_namespace(namespace)
	}

	pub fn check_delete(&self, namespace: &str) -> Result<(), PolicyError> {
		if self.read_only {
			return Err(PolicyError::ReadOnly("delete"));
		}
		if !self.can_delete() {
			return Err(PolicyError::Destructive);
		}
		self.check_namespace(namespace)
	}

	/// Cluster-scoped targets (empty namespace) always pass.
	pub fn check_namespace(&self, namespace: &str) -> Result<(), PolicyError> {
		if namespace.is_empty() {
			return Ok(());
		}
		if self.denied_namespaces.iter().any(|ns| ns == namespace) {
			return Err(PolicyError::DeniedNamespace(namespace.to_string()));
		}
		if !self.allowed_namespaces.is_empty()
			&& !self.allowed_namespaces.iter().any(|ns| ns == namespace)
		{
			return Err(PolicyError::NamespaceNotAllowed(namespace.to_string()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	fn policy(read_only: bool, disable_destructive: bool) -> Policy {
		Policy {
			read_only,
			disable_destructive,
			..Policy::default()
		}
	}

	#[rstest]
	#[case::read_only(true, false, false, false)]
	#[case::read_only_and_destructive(true, true, false, false)]
	#[case::writable(false, false, true, true)]
	#[case::no_destructive(false, true, true, false)]
	fn test_capabilities(
		#[case] read_only: bool,
		#[case] disable_destructive: bool,
		#[case] can_write: bool,
		#[case] can_delete: bool,
	) {
		let policy = policy(read_only, disable_destructive);
		assert_eq!(policy.can_write(), can_write);
		assert_eq!(policy.can_delete(), can_delete);
	}

	#[test]
	fn test_defaults_are_read_only() {
		let policy = Policy::default();
		assert_eq!(policy.check_write("create", "apps"), Err(PolicyError::ReadOnly("create")));
		assert_eq!(policy.check_delete("apps"), Err(PolicyError::ReadOnly("delete")));
	}

	#[test]
	fn test_delete_refused_when_destructive_disabled() {
		assert_eq!(policy(false, true).check_delete("apps"), Err(PolicyError::Destructive));
	}

	#[rstest]
	#[case::cluster_scoped("", &[], Ok(()))]
	#[case::denied_by_default("kube-system", &[], Err(PolicyError::DeniedNamespace("kube-system".to_string())))]
	#[case::no_allow_list("apps", &[], Ok(()))]
	#[case::allowed("apps", &["apps"], Ok(()))]
	#[case::outside_allow_list("web", &["apps"], Err(PolicyError::NamespaceNotAllowed("web".to_string())))]
	fn test_namespace_gate(
		#[case] namespace: &str,
		#[case] allowed: &[&str],
		#[case] expected: Result<(), PolicyError>,
	) {
		let policy = Policy {
			allowed_namespaces: allowed.iter().map(ToString::to_string).collect(),
			..policy(false, false)
		};
		assert_eq!(policy.check_write("update", namespace), expected);
	}
}
