//! HTTP mock of the Rancher cluster proxy using wiremock.
//!
//! Both surfaces of one downstream cluster are served from a single
//! [`MockStore`], so an object written through one is visible through the
//! other:
//!
//! - `/k8s/clusters/<cluster>/v1/[namespaces/<ns>/]<type>[/<name>]`
//! - `/k8s/clusters/<cluster>/api/<v>/[namespaces/<ns>/]<resource>[/<name>]`
//! - `/k8s/clusters/<cluster>/apis/<g>/<v>/[namespaces/<ns>/]<resource>[/<name>]`

use std::{
	fmt,
	sync::{Arc, RwLock},
};

use bon::Builder;
use serde_json::{json, Value};
use tracing::{debug, trace};
use wiremock::{
	matchers::{header, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use crate::{
	helpers::{reason_for, status_body},
	store::{MockResource, MockStore, StoreError},
};

/// Shared mutable object store.
pub type SharedStore = Arc<RwLock<MockStore>>;

/// Path prefix of the per-cluster proxy.
const PROXY_PREFIX: &str = "/k8s/clusters";

/// Which API surface a route belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSurface {
	Aggregated,
	Native,
}

/// Fixed status returned for every request on one surface and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusOverride {
	pub surface: MockSurface,
	pub resource_type: String,
	pub status: u16,
}

impl StatusOverride {
	pub fn aggregated(resource_type: impl Into<String>, status: u16) -> Self {
		Self {
			surface: MockSurface::Aggregated,
			resource_type: resource_type.into(),
			status,
		}
	}

	pub fn native(resource_type: impl Into<String>, status: u16) -> Self {
		Self {
			surface: MockSurface::Native,
			resource_type: resource_type.into(),
			status,
		}
	}
}

/// A mock Rancher server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockRancherServer {
	/// Objects to serve.
	#[builder(default)]
	resources: Vec<MockResource>,
	#[builder(default)]
	overrides: Vec<StatusOverride>,
	/// Bearer token every request must carry.
	#[builder(default = "mock-token".to_string(), into)]
	token: String,
	/// Downstream cluster id served under the proxy prefix.
	#[builder(default = "local".to_string(), into)]
	cluster: String,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockRancherServer {
	server: MockServer,
	store: SharedStore,
	token: String,
	cluster: String,
}

/// A request received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub query: Option<String>,
}

impl fmt::Display for RecordedRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.method, self.path)?;
		if let Some(query) = &self.query {
			write!(f, "?{query}")?;
		}
		Ok(())
	}
}

impl HttpMockRancherServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockRancherServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), cluster = %self.cluster, "Started mock Rancher server");

		let store = Arc::new(RwLock::new(MockStore::seed(self.resources)));
		let router = Router {
			store: Arc::clone(&store),
			overrides: self.overrides,
			cluster: self.cluster.clone(),
		};

		Mock::given(path_regex(r"^/k8s/clusters/[^/]+/.*"))
			.and(header("authorization", format!("Bearer {}", self.token).as_str()))
			.respond_with(move |req: &Request| router.respond(req))
			.mount(&server)
			.await;

		// Anything without the expected bearer token
		Mock::given(path_regex(".*"))
			.respond_with(
				ResponseTemplate::new(401)
					.set_body_json(status_body(401, "Unauthorized", "missing or invalid bearer token")),
			)
			.with_priority(10)
			.mount(&server)
			.await;

		RunningHttpMockRancherServer {
			server,
			store,
			token: self.token,
			cluster: self.cluster,
		}
	}
}

impl RunningHttpMockRancherServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Token clients must present.
	pub fn token(&self) -> &str {
		&self.token
	}

	pub fn cluster(&self) -> &str {
		&self.cluster
	}

	/// Current stored state of an object.
	pub fn object(&self, resource_type: &str, namespace: &str, name: &str) -> Option<Value> {
		self.store
			.read()
			.unwrap()
			.get(resource_type, namespace, name)
			.cloned()
	}

	/// All requests received so far.
	pub async fn requests(&self) -> Vec<RecordedRequest> {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.into_iter()
			.map(|req| RecordedRequest {
				method: req.method.to_string(),
				path: req.url.path().to_string(),
				query: req.url.query().map(str::to_string),
			})
			.collect()
	}

	/// Received requests rendered as `METHOD /path?query`.
	pub async fn request_lines(&self) -> Vec<String> {
		self.requests()
			.await
			.iter()
			.map(ToString::to_string)
			.collect()
	}
}

/// A proxy path resolved to a store location.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
	surface: MockSurface,
	resource_type: String,
	namespace: String,
	name: String,
}

fn decode(segment: &str) -> String {
	urlencoding::decode(segment)
		.map(|s| s.into_owned())
		.unwrap_or_else(|_| segment.to_string())
}

/// Split `[namespaces/<ns>/]<resource>[/<name>]` into its parts.
fn split_scoped<'a>(rest: &[&'a str]) -> Option<(&'a str, &'a str, &'a str)> {
	match rest {
		["namespaces", ns, resource, tail @ ..] if tail.len() <= 1 => {
			Some((*ns, *resource, tail.first().copied().unwrap_or("")))
		}
		[resource] => Some(("", *resource, "")),
		[resource, name] => Some(("", *resource, *name)),
		_ => None,
	}
}

/// Resolve a request path for `cluster`.
///
/// Examples:
/// - `/k8s/clusters/local/v1/namespaces/default/core.v1.pods/web` ->
///   aggregated `core.v1.pods` in `default`, named `web`
/// - `/k8s/clusters/local/apis/apps/v1/deployments` -> native
///   `apps.v1.deployments`, cluster-wide list
fn parse_route(path: &str, cluster: &str) -> Option<Route> {
	let rest = path
		.strip_prefix(PROXY_PREFIX)?
		.strip_prefix('/')?
		.strip_prefix(cluster)?
		.strip_prefix('/')?;
	let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();

	let (surface, group, version, scoped) = match segments.as_slice() {
		["v1", scoped @ ..] => (MockSurface::Aggregated, "", "", scoped),
		["api", version, scoped @ ..] => (MockSurface::Native, "core", *version, scoped),
		["apis", group, version, scoped @ ..] => (MockSurface::Native, *group, *version, scoped),
		_ => return None,
	};
	let (namespace, resource, name) = split_scoped(scoped)?;
	let resource = decode(resource);
	let resource_type = match surface {
		MockSurface::Aggregated => resource,
		MockSurface::Native => format!("{group}.{version}.{resource}"),
	};

	Some(Route {
		surface,
		resource_type,
		namespace: decode(namespace),
		name: decode(name),
	})
}

fn query_param(req: &Request, key: &str) -> Option<String> {
	req.url
		.query_pairs()
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
}

fn error_response(code: u16, message: &str) -> ResponseTemplate {
	ResponseTemplate::new(code).set_body_json(status_body(code, reason_for(code), message))
}

/// Object as the aggregation API renders it: the manifest plus `id`/`type`.
fn aggregated_object(resource_type: &str, manifest: &Value) -> Value {
	let mut object = manifest.clone();
	if let Some(map) = object.as_object_mut() {
		let name = manifest.pointer("/metadata/name").and_then(Value::as_str).unwrap_or("");
		let id = match manifest.pointer("/metadata/namespace").and_then(Value::as_str) {
			Some(ns) if !ns.is_empty() => format!("{ns}/{name}"),
			_ => name.to_string(),
		};
		map.insert("id".to_string(), Value::String(id));
		map.insert("type".to_string(), Value::String(resource_type.to_string()));
	}
	object
}

const CONTINUE_PREFIX: &str = "mock-continue-";

struct Router {
	store: SharedStore,
	overrides: Vec<StatusOverride>,
	cluster: String,
}

impl Router {
	fn respond(&self, req: &Request) -> ResponseTemplate {
		let Some(route) = parse_route(req.url.path(), &self.cluster) else {
			trace!(path = %req.url.path(), "unrouted request");
			return error_response(404, "no such route");
		};

		if let Some(o) = self
			.overrides
			.iter()
			.find(|o| o.surface == route.surface && o.resource_type == route.resource_type)
		{
			trace!(?route, status = o.status, "status override");
			return error_response(o.status, "status override");
		}

		match req.method.as_str() {
			"GET" if route.name.is_empty() => self.list(&route, req),
			"GET" => self.get(&route),
			"POST" if !route.name.is_empty() => match query_param(req, "action") {
				Some(action) => self.action(&route, &action),
				None => error_response(405, "POST requires an action on a named object"),
			},
			"POST" => self.create(&route, req),
			"PUT" if !route.name.is_empty() => self.replace(&route, req),
			"DELETE" if !route.name.is_empty() => self.delete(&route),
			_ => error_response(405, "method not allowed"),
		}
	}

	fn render(&self, route: &Route, manifest: &Value) -> Value {
		match route.surface {
			MockSurface::Aggregated => aggregated_object(&route.resource_type, manifest),
			MockSurface::Native => manifest.clone(),
		}
	}

	fn list(&self, route: &Route, req: &Request) -> ResponseTemplate {
		let selector = query_param(req, "labelSelector").unwrap_or_default();
		let items = self
			.store
			.read()
			.unwrap()
			.list(&route.resource_type, &route.namespace, &selector);

		match route.surface {
			MockSurface::Native => {
				let items: Vec<_> = items.iter().map(|i| self.render(route, i)).collect();
				ResponseTemplate::new(200).set_body_json(json!({
					"kind": "List",
					"apiVersion": "v1",
					"metadata": {"resourceVersion": "1"},
					"items": items
				}))
			}
			MockSurface::Aggregated => {
				let offset = match query_param(req, "continue") {
					None => 0,
					Some(token) => match token
						.strip_prefix(CONTINUE_PREFIX)
						.and_then(|n| n.parse::<usize>().ok())
					{
						Some(offset) => offset,
						None => return error_response(400, "invalid continue token"),
					},
				};
				let limit = query_param(req, "limit")
					.and_then(|l| l.parse::<usize>().ok())
					.filter(|l| *l > 0)
					.unwrap_or(usize::MAX);

				let page: Vec<_> = items
					.iter()
					.skip(offset)
					.take(limit)
					.map(|i| self.render(route, i))
					.collect();
				let next = offset.saturating_add(page.len());

				let mut body = json!({
					"type": "collection",
					"resourceType": route.resource_type,
					"data": page,
				});
				if next < items.len() {
					body["continue"] = Value::String(format!("{CONTINUE_PREFIX}{next}"));
				}
				ResponseTemplate::new(200).set_body_json(body)
			}
		}
	}

	fn get(&self, route: &Route) -> ResponseTemplate {
		let store = self.store.read().unwrap();
		match store.get(&route.resource_type, &route.namespace, &route.name) {
			Some(manifest) => ResponseTemplate::new(200).set_body_json(self.render(route, manifest)),
			None => error_response(404, "not found"),
		}
	}

	fn create(&self, route: &Route, req: &Request) -> ResponseTemplate {
		let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
			return error_response(400, "body is not JSON");
		};
		let created = self
			.store
			.write()
			.unwrap()
			.create(&route.resource_type, &route.namespace, body);
		match created {
			Ok(manifest) => ResponseTemplate::new(201).set_body_json(self.render(route, &manifest)),
			Err(err) => store_error(err),
		}
	}

	fn replace(&self, route: &Route, req: &Request) -> ResponseTemplate {
		let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
			return error_response(400, "body is not JSON");
		};
		let replaced = self.store.write().unwrap().replace(
			&route.resource_type,
			&route.namespace,
			&route.name,
			body,
		);
		match replaced {
			Ok(manifest) => ResponseTemplate::new(200).set_body_json(self.render(route, &manifest)),
			Err(err) => store_error(err),
		}
	}

	fn delete(&self, route: &Route) -> ResponseTemplate {
		let removed = self
			.store
			.write()
			.unwrap()
			.remove(&route.resource_type, &route.namespace, &route.name);
		match (removed, route.surface) {
			(Ok(_), MockSurface::Aggregated) => ResponseTemplate::new(204),
			(Ok(manifest), MockSurface::Native) => ResponseTemplate::new(200).set_body_json(manifest),
			(Err(err), _) => store_error(err),
		}
	}

	fn action(&self, route: &Route, action: &str) -> ResponseTemplate {
		let exists = self
			.store
			.read()
			.unwrap()
			.get(&route.resource_type, &route.namespace, &route.name)
			.is_some();
		if !exists {
			return error_response(404, "not found");
		}
		debug!(resource_type = %route.resource_type, name = %route.name, %action, "action invoked");
		ResponseTemplate::new(204)
	}
}

fn store_error(err: StoreError) -> ResponseTemplate {
	match err {
		StoreError::NotFound => error_response(404, "not found"),
		StoreError::AlreadyExists => error_response(409, "already exists"),
		StoreError::MissingName => error_response(400, "metadata.name is required"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_aggregated_routes() {
		assert_eq!(
			parse_route("/k8s/clusters/local/v1/namespaces/default/core.v1.pods/web", "local"),
			Some(Route {
				surface: MockSurface::Aggregated,
				resource_type: "core.v1.pods".to_string(),
				namespace: "default".to_string(),
				name: "web".to_string(),
			})
		);
		let list = parse_route("/k8s/clusters/local/v1/apps.v1.deployments", "local").unwrap();
		assert_eq!(list.resource_type, "apps.v1.deployments");
		assert!(list.namespace.is_empty() && list.name.is_empty());
	}

	#[test]
	fn test_parse_native_routes() {
		let core = parse_route("/k8s/clusters/c-1/api/v1/namespaces/ns/configmaps/cfg", "c-1").unwrap();
		assert_eq!(core.surface, MockSurface::Native);
		assert_eq!(core.resource_type, "core.v1.configmaps");
		assert_eq!((core.namespace.as_str(), core.name.as_str()), ("ns", "cfg"));

		let grouped = parse_route("/k8s/clusters/c-1/apis/apps/v1/deployments", "c-1").unwrap();
		assert_eq!(grouped.resource_type, "apps.v1.deployments");

		let node = parse_route("/k8s/clusters/c-1/api/v1/nodes/n1", "c-1").unwrap();
		assert_eq!((node.namespace.as_str(), node.name.as_str()), ("", "n1"));
	}

	#[test]
	fn test_parse_rejects_other_clusters_and_paths() {
		assert_eq!(parse_route("/k8s/clusters/other/v1/core.v1.pods", "local"), None);
		assert_eq!(parse_route("/k8s/clusters/local/metrics", "local"), None);
		assert_eq!(parse_route("/v3/clusters", "local"), None);
	}

	#[test]
	fn test_aggregated_object_adds_id_and_type() {
		let manifest = json!({"kind": "Pod", "metadata": {"name": "web", "namespace": "ns"}});
		let object = aggregated_object("core.v1.pods", &manifest);
		assert_eq!(object["id"], "ns/web");
		assert_eq!(object["type"], "core.v1.pods");
		assert_eq!(object["kind"], "Pod");
	}
}
