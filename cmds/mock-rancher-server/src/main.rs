//! Standalone mock Rancher cluster proxy.
//!
//! Serves YAML manifests from a directory through both the aggregation API
//! and the native Kubernetes pass-through, so rancherctl can be exercised
//! without a Rancher installation.

use std::{
	fs, io,
	path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rancher_mock::{logical_type_of, HttpMockRancherServer, MockResource, StatusOverride};
use serde::Deserialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mock-rancher-server")]
#[command(about = "Standalone mock Rancher cluster proxy for testing")]
struct Cli {
	/// Directory containing YAML manifests to serve as cluster state
	#[arg(short = 'd', long, default_value = ".")]
	data_dir: PathBuf,

	/// Bearer token clients must present
	#[arg(short = 't', long, default_value = "mock-token")]
	token: String,

	/// Downstream cluster id served under /k8s/clusters/
	#[arg(short = 'c', long, default_value = "local")]
	cluster: String,

	/// Path to write PID file (optional)
	#[arg(short = 'p', long)]
	pidfile: Option<PathBuf>,

	/// Answer every aggregation API request for a type with a fixed status, as `TYPE=STATUS`
	#[arg(long, value_parser = parse_override)]
	aggregated_status: Vec<(String, u16)>,

	/// Answer every native API request for a type with a fixed status, as `TYPE=STATUS`
	#[arg(long, value_parser = parse_override)]
	native_status: Vec<(String, u16)>,
}

fn parse_override(s: &str) -> Result<(String, u16)> {
	let Some((resource_type, status)) = s.split_once('=') else {
		bail!("expected TYPE=STATUS, got `{s}`");
	};
	let status = status
		.parse()
		.with_context(|| format!("invalid status `{status}`"))?;
	Ok((resource_type.to_string(), status))
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::from_default_env()
				.add_directive("rancher_mock=debug".parse()?)
				.add_directive("mock_rancher_server=debug".parse()?),
		)
		.with_writer(io::stderr)
		.init();

	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("failed to build tokio runtime")?
		.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
	let resources = load_manifests_from_dir(&cli.data_dir)?;
	info!(count = resources.len(), dir = %cli.data_dir.display(), "Loaded manifests");

	let overrides = cli
		.aggregated_status
		.into_iter()
		.map(|(ty, status)| StatusOverride::aggregated(ty, status))
		.chain(
			cli.native_status
				.into_iter()
				.map(|(ty, status)| StatusOverride::native(ty, status)),
		)
		.collect();

	let server = HttpMockRancherServer::builder()
		.resources(resources)
		.overrides(overrides)
		.token(cli.token)
		.cluster(cli.cluster)
		.build()
		.start()
		.await;

	let uri = server.uri();
	info!(uri = %uri, cluster = %server.cluster(), "Mock Rancher server started");

	// Shell-friendly connection settings for rancherctl
	println!("export RANCHER_SERVER_URL={uri}");
	println!("export RANCHER_TOKEN={}", server.token());
	println!("export RANCHER_CLUSTER={}", server.cluster());

	if let Some(pidfile) = &cli.pidfile {
		fs::write(pidfile, format!("{}\n", std::process::id()))
			.with_context(|| format!("failed to write pidfile to {}", pidfile.display()))?;
		debug!(path = %pidfile.display(), "Wrote PID file");
	}

	info!("Waiting for shutdown signal");
	let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
		.context("failed to register SIGTERM handler")?;

	tokio::select! {
		_ = tokio::signal::ctrl_c() => {
			info!("Received SIGINT");
		}
		_ = sigterm.recv() => {
			info!("Received SIGTERM");
		}
	}

	info!(requests = server.requests().await.len(), "Shutting down");

	if let Some(pidfile) = &cli.pidfile {
		let _ = fs::remove_file(pidfile);
	}

	Ok(())
}

/// Load YAML manifests from a directory, in file name order.
fn load_manifests_from_dir(dir: &Path) -> Result<Vec<MockResource>> {
	let mut resources = Vec::new();

	if !dir.exists() {
		return Ok(resources);
	}

	let mut entries: Vec<_> = fs::read_dir(dir)
		.with_context(|| format!("failed to read directory {}", dir.display()))?
		.filter_map(Result::ok)
		.filter(|e| {
			e.path()
				.extension()
				.is_some_and(|ext| ext == "yaml" || ext == "yml")
		})
		.collect();
	entries.sort_by_key(fs::DirEntry::path);

	for entry in entries {
		let path = entry.path();
		let content = fs::read_to_string(&path)
			.with_context(|| format!("failed to read {}", path.display()))?;

		// Multi-document files
		for doc in serde_yaml::Deserializer::from_str(&content) {
			let value = serde_json::Value::deserialize(doc)
				.with_context(|| format!("failed to parse YAML in {}", path.display()))?;

			if value.is_null() {
				continue;
			}

			match logical_type_of(&value) {
				Some(resource_type) => {
					debug!(path = %path.display(), resource_type = %resource_type, "Loaded manifest");
					resources.push(MockResource::typed(resource_type, value));
				}
				None => warn!(path = %path.display(), "Skipping document without apiVersion and kind"),
			}
		}
	}

	Ok(resources)
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_parse_override() {
		assert_eq!(
			parse_override("core.v1.pods=404").unwrap(),
			("core.v1.pods".to_string(), 404)
		);
		assert!(parse_override("core.v1.pods").is_err());
		assert!(parse_override("core.v1.pods=abc").is_err());
	}

	#[test]
	fn test_load_multi_document_manifests() {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("01-apps.yaml"),
			indoc! {"
				apiVersion: apps/v1
				kind: Deployment
				metadata:
				  name: web
				  namespace: apps
				---
				apiVersion: v1
				kind: Pod
				metadata:
				  name: web-0
				  namespace: apps
				---
				just: data
			"},
		)
		.unwrap();
		fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

		let resources = load_manifests_from_dir(dir.path()).unwrap();
		let types: Vec<_> = resources.iter().map(|r| r.resource_type.as_str()).collect();
		assert_eq!(types, vec!["apps.v1.deployments", "core.v1.pods"]);
	}

	#[test]
	fn test_missing_dir_is_empty() {
		let dir = TempDir::new().unwrap();
		let resources = load_manifests_from_dir(&dir.path().join("absent")).unwrap();
		assert!(resources.is_empty());
	}
}
