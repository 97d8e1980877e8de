//! End-to-end tests for rancherctl commands using the HTTP mock Rancher proxy.

use std::fs;

use anyhow::Result;
use assert_matches::assert_matches;
use clap::Parser;
use indoc::indoc;
use rancher_mock::{HttpMockRancherServer, MockResource, RunningHttpMockRancherServer};
use rancherctl::{
	commands::{run_async, Session},
	config::RancherConfig,
	policy::PolicyError,
	Cli,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn deployment(namespace: &str, name: &str) -> MockResource {
	MockResource::new(json!({
		"apiVersion": "apps/v1",
		"kind": "Deployment",
		"metadata": {"name": name, "namespace": namespace, "labels": {"app": name}},
		"spec": {"replicas": 1}
	}))
}

async fn start(resources: Vec<MockResource>) -> RunningHttpMockRancherServer {
	HttpMockRancherServer::builder()
		.resources(resources)
		.build()
		.start()
		.await
}

/// Run rancherctl with connection flags pointing at `server`, returning stdout.
async fn run_cli(server: &RunningHttpMockRancherServer, args: &[&str]) -> Result<String> {
	let uri = server.uri();
	let mut argv = vec![
		"rancherctl",
		"--server-url",
		uri.as_str(),
		"--token",
		server.token(),
		"--cluster",
		server.cluster(),
	];
	argv.extend_from_slice(args);

	let cli = Cli::try_parse_from(argv)?;
	let session = Session::from_config(&cli.global, RancherConfig::default())?;
	let mut out = Vec::new();
	run_async(cli.command, &session, &mut out).await?;
	Ok(String::from_utf8(out)?)
}

#[tokio::test]
async fn test_list_prints_bare_array() {
	let server = start(vec![deployment("apps", "a"), deployment("apps", "b")]).await;

	let out = run_cli(&server, &["list", "--type", "apps.v1.deployments", "-n", "apps"])
		.await
		.unwrap();

	let items: Value = serde_json::from_str(&out).unwrap();
	let names: Vec<_> = items
		.as_array()
		.unwrap()
		.iter()
		.map(|i| i["metadata"]["name"].as_str().unwrap())
		.collect();
	assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_list_page_includes_continue() {
	let server = start(vec![deployment("apps", "a"), deployment("apps", "b")]).await;

	let out = run_cli(&server, &["list", "--api-version", "apps/v1", "--kind", "Deployment", "--limit", "1"])
		.await
		.unwrap();

	let page: Value = serde_json::from_str(&out).unwrap();
	assert_eq!(page["items"].as_array().map(Vec::len), Some(1));
	assert!(page["continue"].is_string());
}

#[tokio::test]
async fn test_list_all_pages_follows_tokens() {
	let server = start(vec![
		deployment("apps", "a"),
		deployment("apps", "b"),
		deployment("apps", "c"),
	])
	.await;

	let out = run_cli(
		&server,
		&["list", "-t", "apps.v1.deployments", "--limit", "1", "--all-pages"],
	)
	.await
	.unwrap();

	let items: Value = serde_json::from_str(&out).unwrap();
	assert_eq!(items.as_array().map(Vec::len), Some(3));
	assert_eq!(server.requests().await.len(), 3);
}

#[tokio::test]
async fn test_get_as_yaml() {
	let server = start(vec![deployment("apps", "web")]).await;

	let out = run_cli(
		&server,
		&["-o", "yaml", "get", "-t", "apps.v1.deployments", "-n", "apps", "web"],
	)
	.await
	.unwrap();

	assert!(out.contains("kind: Deployment"));
	assert!(out.contains("name: web"));
}

#[tokio::test]
async fn test_writes_refused_by_default() {
	let server = start(vec![deployment("apps", "web")]).await;

	let err = run_cli(
		&server,
		&["patch", "-t", "apps.v1.deployments", "-n", "apps", "web", "-p", r#"{"spec":{"replicas":2}}"#],
	)
	.await
	.unwrap_err();

	assert_matches!(err.downcast_ref::<PolicyError>(), Some(PolicyError::ReadOnly("patch")));
	assert!(server.requests().await.is_empty());
}

#[tokio::test]
async fn test_patch_when_writable() {
	let server = start(vec![deployment("apps", "web")]).await;

	run_cli(
		&server,
		&[
			"--read-only",
			"false",
			"patch",
			"-t",
			"apps.v1.deployments",
			"-n",
			"apps",
			"web",
			"-p",
			r#"{"spec":{"replicas":2}}"#,
		],
	)
	.await
	.unwrap();

	let stored = server.object("apps.v1.deployments", "apps", "web").unwrap();
	assert_eq!(stored.pointer("/spec/replicas"), Some(&json!(2)));
	assert_eq!(stored.pointer("/metadata/labels/app"), Some(&json!("web")));
}

#[tokio::test]
async fn test_create_from_yaml_file() {
	let server = start(Vec::new()).await;
	let dir = TempDir::new().unwrap();
	let file = dir.path().join("cm.yaml");
	fs::write(
		&file,
		indoc! {"
			apiVersion: v1
			kind: ConfigMap
			metadata:
			  name: cfg
			  namespace: apps
		"},
	)
	.unwrap();

	let out = run_cli(
		&server,
		&["--read-only", "false", "create", "-f", file.to_str().unwrap()],
	)
	.await
	.unwrap();

	let created: Value = serde_json::from_str(&out).unwrap();
	assert_eq!(created["metadata"]["namespace"], json!("apps"));
	assert!(server.object("core.v1.configmaps", "apps", "cfg").is_some());
	assert_eq!(
		server.request_lines().await,
		vec!["POST /k8s/clusters/local/v1/namespaces/apps/core.v1.configmaps"]
	);
}

#[tokio::test]
async fn test_delete_in_denied_namespace_refused() {
	let server = start(vec![deployment("kube-system", "coredns")]).await;

	let err = run_cli(
		&server,
		&["--read-only", "false", "delete", "-t", "apps.v1.deployments", "-n", "kube-system", "coredns"],
	)
	.await
	.unwrap_err();

	assert_matches!(
		err.downcast_ref::<PolicyError>(),
		Some(PolicyError::DeniedNamespace(ns)) if ns == "kube-system"
	);
	assert!(server.object("apps.v1.deployments", "kube-system", "coredns").is_some());
}

#[tokio::test]
async fn test_delete_when_writable() {
	let server = start(vec![deployment("apps", "web")]).await;

	let out = run_cli(
		&server,
		&["--read-only", "false", "delete", "-t", "apps.v1.deployments", "-n", "apps", "web"],
	)
	.await
	.unwrap();

	assert!(out.contains("deleted"));
	assert!(server.object("apps.v1.deployments", "apps", "web").is_none());
}

#[tokio::test]
async fn test_action_start() {
	let server = start(vec![MockResource::typed(
		"kubevirt.io.virtualmachines",
		json!({"apiVersion": "kubevirt.io/v1", "kind": "VirtualMachine", "metadata": {"name": "vm-1", "namespace": "vms"}}),
	)])
	.await;

	run_cli(
		&server,
		&[
			"--read-only",
			"false",
			"action",
			"-t",
			"kubevirt.io.virtualmachines",
			"-n",
			"vms",
			"vm-1",
			"--action",
			"start",
		],
	)
	.await
	.unwrap();

	assert_eq!(
		server.request_lines().await,
		vec!["POST /k8s/clusters/local/v1/namespaces/vms/kubevirt.io.virtualmachines/vm-1?action=start"]
	);
}

#[tokio::test]
async fn test_not_found_is_reported() {
	let server = start(Vec::new()).await;

	let err = run_cli(&server, &["get", "-t", "apps.v1.deployments", "-n", "apps", "ghost"])
		.await
		.unwrap_err();

	assert!(err.to_string().contains("getting apps.v1.deployments ghost"));
	assert_eq!(server.requests().await.len(), 2);
}
