//! Configuration file support for rancherctl
//!
//! Supports `.rancherctl.yaml` files that can be placed anywhere in the directory
//! hierarchy. rancherctl searches from the working directory upward to the
//! filesystem root, unless a file is given explicitly with `--config`.

use std::{
	fmt, fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The name of the config file rancherctl looks for
pub const CONFIG_FILE_NAME: &str = ".rancherctl.yaml";

/// Root configuration structure for .rancherctl.yaml
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RancherConfig {
	/// Rancher server URL; `https://` is assumed when the scheme is missing
	pub server_url: Option<String>,

	/// Rancher API bearer token (`token-xxxxx:yyyy`)
	pub token: Option<String>,

	/// Skip TLS certificate verification
	pub tls_insecure: bool,

	/// Cluster id used when `--cluster` is not given
	pub default_cluster: Option<String>,

	/// Read timeout for every request, in seconds
	pub request_timeout_secs: Option<u64>,

	/// Refuse every mutating operation
	pub read_only: bool,

	/// Refuse deletes even when writes are allowed
	pub disable_destructive: bool,

	/// When non-empty, mutations are restricted to these namespaces
	pub allowed_namespaces: Vec<String>,

	/// Namespaces mutations are never allowed in
	pub denied_namespaces: Vec<String>,
}

impl Default for RancherConfig {
	fn default() -> Self {
		Self {
			server_url: None,
			token: None,
			tls_insecure: false,
			default_cluster: None,
			request_timeout_secs: None,
			read_only: true,
			disable_destructive: false,
			allowed_namespaces: Vec::new(),
			denied_namespaces: vec!["kube-system".to_string(), "cattle-system".to_string()],
		}
	}
}

impl fmt::Debug for RancherConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RancherConfig")
			.field("server_url", &self.server_url)
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.field("tls_insecure", &self.tls_insecure)
			.field("default_cluster", &self.default_cluster)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("read_only", &self.read_only)
			.field("disable_destructive", &self.disable_destructive)
			.field("allowed_namespaces", &self.allowed_namespaces)
			.field("denied_namespaces", &self.denied_namespaces)
			.finish()
	}
}

impl RancherConfig {
	/// Load the config named by `--config`, or search from `start_dir` upward.
	///
	/// Falls back to the defaults when no file is found.
	pub fn resolve(explicit: Option<&Path>, start_dir: &Path) -> Result<Self> {
		match explicit {
			Some(path) => Self::load_from_file(path),
			None => Ok(Self::load_from_directory(start_dir)?.unwrap_or_default()),
		}
	}

	/// Load config by searching from the given directory upward
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>> {
		if let Some(config_path) = find_config_file(start_dir) {
			let config = Self::load_from_file(&config_path)?;
			Ok(Some(config))
		} else {
			Ok(None)
		}
	}

	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let config: RancherConfig = serde_yaml_with_quirks::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;
		Ok(config)
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let mut current = start_dir.to_path_buf();

	// Canonicalize if possible to handle relative paths
	if let Ok(canonical) = current.canonicalize() {
		current = canonical;
	}

	loop {
		let config_path = current.join(CONFIG_FILE_NAME);
		if config_path.exists() {
			return Some(config_path);
		}

		match current.parent() {
			Some(parent) if parent != current => current = parent.to_path_buf(),
			_ => break,
		}
	}

	None
}
