//! Verb dispatch across the aggregation and native surfaces.
//!
//! Each verb picks the surface to try first from the logical type, and on a
//! recoverable miss (404, and 403 for the well-known core first attempt)
//! retries exactly once on the other surface:
//!
//! | Verb | First | Fallback |
//! |---|---|---|
//! | list / get, well-known core | native `/api/v1` | aggregated chain on 404/403 |
//! | list / get | aggregated | native path, else alternate `v1.` form, on 404 |
//! | create | aggregated | none |
//! | update / delete | aggregated | native path on 404 |
//! | action | aggregated | none |

use std::future::Future;

use http::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
	error::{ClientError, Surface, TransportError, Verb},
	merge::merge_json,
	normalize,
	resource::{ListOptions, ObjectRef, ResourceCollection, ResourceObject},
	transport::{ApiRequest, KubeTransport, RawResponse, Transport, TransportSettings},
	typemap::{self, NativePath},
};

/// Path prefix of the Rancher per-cluster proxy.
pub const PROXY_PREFIX: &str = "/k8s/clusters";

/// Result of one attempt against a surface.
#[derive(Debug)]
enum Outcome<T> {
	Success(T),
	/// Recoverable on the other surface.
	Miss(ClientError),
	Terminal(ClientError),
}

/// Failures that hand the call over to the other surface.
#[derive(Debug, Clone, Copy)]
enum FallbackOn {
	NotFound,
	NotFoundOrForbidden,
}

impl FallbackOn {
	fn matches(self, err: &ClientError) -> bool {
		match self {
			Self::NotFound => err.is_not_found(),
			Self::NotFoundOrForbidden => err.is_not_found() || err.is_forbidden(),
		}
	}
}

impl<T> Outcome<T> {
	fn classify(result: Result<T, ClientError>, fallback_on: FallbackOn) -> Self {
		match result {
			Ok(value) => Self::Success(value),
			Err(err) if fallback_on.matches(&err) => Self::Miss(err),
			Err(err) => Self::Terminal(err),
		}
	}
}

/// Await `primary`; on a miss matching `fallback_on`, hand its error to
/// `fallback` unless the call was canceled in the meantime.
async fn with_fallback<T, P, F, Fut>(
	cancel: &CancellationToken,
	primary: P,
	fallback_on: FallbackOn,
	fallback: F,
) -> Result<T, ClientError>
where
	P: Future<Output = Result<T, ClientError>>,
	F: FnOnce(ClientError) -> Fut,
	Fut: Future<Output = Result<T, ClientError>>,
{
	match Outcome::classify(primary.await, fallback_on) {
		Outcome::Success(value) => Ok(value),
		Outcome::Terminal(err) => Err(err),
		Outcome::Miss(err) => {
			if cancel.is_cancelled() {
				return Err(ClientError::Canceled);
			}
			debug!(
				surface = ?err.surface(),
				status = ?err.status(),
				"surface missed, trying fallback"
			);
			fallback(err).await
		}
	}
}

fn encode(segment: &str) -> std::borrow::Cow<'_, str> {
	urlencoding::encode(segment)
}

fn cluster_prefix(cluster: &str) -> String {
	format!("{PROXY_PREFIX}/{}", encode(cluster))
}

/// `/<prefix>/<cluster>/v1[/namespaces/<ns>]/<type>[/<name>]`
fn aggregated_path(cluster: &str, resource_type: &str, namespace: &str, name: &str) -> String {
	let mut path = cluster_prefix(cluster) + "/v1";
	if !namespace.is_empty() {
		path.push_str("/namespaces/");
		path.push_str(&encode(namespace));
	}
	path.push('/');
	path.push_str(&encode(resource_type));
	if !name.is_empty() {
		path.push('/');
		path.push_str(&encode(name));
	}
	path
}

/// `/<prefix>/<cluster>/api/<v>` or `/apis/<g>/<v>`, then
/// `[/namespaces/<ns>]/<resource>[/<name>]`.
fn native_object_path(cluster: &str, native: &NativePath, namespace: &str, name: &str) -> String {
	let mut path = cluster_prefix(cluster) + &native.base_path();
	if !namespace.is_empty() {
		path.push_str("/namespaces/");
		path.push_str(&encode(namespace));
	}
	path.push('/');
	path.push_str(&encode(&native.resource));
	if !name.is_empty() {
		path.push('/');
		path.push_str(&encode(name));
	}
	path
}

fn limit_param(limit: u32) -> String {
	if limit > 0 {
		limit.to_string()
	} else {
		String::new()
	}
}

fn decoded<R>(surface: Surface, verb: Verb, result: Result<R, serde_json::Error>) -> Result<R, ClientError> {
	result.map_err(|source| ClientError::Decode {
		surface,
		verb,
		source,
	})
}

fn require_name(target: ObjectRef<'_>, verb: Verb) -> Result<(), ClientError> {
	if target.name.is_empty() {
		return Err(ClientError::MissingName { verb });
	}
	Ok(())
}

fn encode_body(body: &Value) -> Result<Vec<u8>, ClientError> {
	serde_json::to_vec(body).map_err(ClientError::Encode)
}

/// Resource access over both surfaces of a Rancher server.
///
/// Holds no mutable state; one instance may serve any number of concurrent
/// calls.
#[derive(Debug, Clone)]
pub struct ResourceClient<T = KubeTransport> {
	transport: T,
}

impl ResourceClient<KubeTransport> {
	/// Connect to a Rancher server with a bearer token.
	pub fn connect(settings: &TransportSettings) -> Result<Self, TransportError> {
		Ok(Self::new(KubeTransport::new(settings)?))
	}
}

impl<T: Transport> ResourceClient<T> {
	pub fn new(transport: T) -> Self {
		Self { transport }
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// List resources of a logical type.
	#[instrument(skip(self, opts, cancel), fields(namespace = %opts.namespace))]
	pub async fn list(
		&self,
		cluster: &str,
		resource_type: &str,
		opts: &ListOptions,
		cancel: &CancellationToken,
	) -> Result<ResourceCollection, ClientError> {
		let aggregated = || self.list_aggregated_first(cluster, resource_type, opts, cancel);
		match typemap::well_known_core(resource_type) {
			Some(resource) => {
				let native = NativePath::core(resource);
				with_fallback(
					cancel,
					self.list_native(cluster, &native, opts, cancel),
					FallbackOn::NotFoundOrForbidden,
					|_| aggregated(),
				)
				.await
			}
			None => aggregated().await,
		}
	}

	async fn list_aggregated_first(
		&self,
		cluster: &str,
		resource_type: &str,
		opts: &ListOptions,
		cancel: &CancellationToken,
	) -> Result<ResourceCollection, ClientError> {
		with_fallback(
			cancel,
			self.list_aggregated(cluster, resource_type, opts, cancel),
			FallbackOn::NotFound,
			|miss| async move {
				if let Some(native) = typemap::native_path(resource_type) {
					return self.list_native(cluster, &native, opts, cancel).await;
				}
				if let Some(alternate) = typemap::alternate_form(resource_type) {
					return self.list_aggregated(cluster, &alternate, opts, cancel).await;
				}
				Err(miss)
			},
		)
		.await
	}

	async fn list_aggregated(
		&self,
		cluster: &str,
		resource_type: &str,
		opts: &ListOptions,
		cancel: &CancellationToken,
	) -> Result<ResourceCollection, ClientError> {
		let request = ApiRequest::new(
			Method::GET,
			aggregated_path(cluster, resource_type, &opts.namespace, ""),
		)
		.query("limit", limit_param(opts.limit))
		.query("continue", opts.continuation.as_str())
		.query("labelSelector", opts.label_selector.as_str())
		.query("fieldSelector", opts.field_selector.as_str());

		let response = self
			.exchange(Surface::Aggregated, Verb::List, request, cancel)
			.await?;
		decoded(
			Surface::Aggregated,
			Verb::List,
			normalize::aggregated_collection(&response.body),
		)
	}

	async fn list_native(
		&self,
		cluster: &str,
		native: &NativePath,
		opts: &ListOptions,
		cancel: &CancellationToken,
	) -> Result<ResourceCollection, ClientError> {
		let request = ApiRequest::new(
			Method::GET,
			native_object_path(cluster, native, &opts.namespace, ""),
		)
		.query("limit", limit_param(opts.limit))
		.query("labelSelector", opts.label_selector.as_str())
		.query("fieldSelector", opts.field_selector.as_str());

		let response = self
			.exchange(Surface::Native, Verb::List, request, cancel)
			.await?;
		decoded(
			Surface::Native,
			Verb::List,
			normalize::normalize_list(&response.body),
		)
	}

	/// Fetch a single object.
	#[instrument(skip_all, fields(
		cluster = %target.cluster,
		resource_type = %target.resource_type,
		namespace = %target.namespace,
		name = %target.name,
	))]
	pub async fn get(
		&self,
		target: ObjectRef<'_>,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		require_name(target, Verb::Get)?;
		let aggregated = || self.get_aggregated_first(target, cancel);
		match typemap::well_known_core(target.resource_type) {
			Some(resource) => {
				let native = NativePath::core(resource);
				with_fallback(
					cancel,
					self.get_native(target, &native, cancel),
					FallbackOn::NotFoundOrForbidden,
					|_| aggregated(),
				)
				.await
			}
			None => aggregated().await,
		}
	}

	async fn get_aggregated_first(
		&self,
		target: ObjectRef<'_>,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		with_fallback(
			cancel,
			self.get_aggregated(target, target.resource_type, cancel),
			FallbackOn::NotFound,
			|miss| async move {
				if let Some(native) = typemap::native_path(target.resource_type) {
					return self.get_native(target, &native, cancel).await;
				}
				if let Some(alternate) = typemap::alternate_form(target.resource_type) {
					return self.get_aggregated(target, &alternate, cancel).await;
				}
				Err(miss)
			},
		)
		.await
	}

	async fn get_aggregated(
		&self,
		target: ObjectRef<'_>,
		resource_type: &str,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		let request = ApiRequest::new(
			Method::GET,
			aggregated_path(target.cluster, resource_type, target.namespace, target.name),
		);
		let response = self
			.exchange(Surface::Aggregated, Verb::Get, request, cancel)
			.await?;
		decoded(Surface::Aggregated, Verb::Get, normalize::normalize(&response.body))
	}

	async fn get_native(
		&self,
		target: ObjectRef<'_>,
		native: &NativePath,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		let request = ApiRequest::new(
			Method::GET,
			native_object_path(target.cluster, native, target.namespace, target.name),
		);
		let response = self
			.exchange(Surface::Native, Verb::Get, request, cancel)
			.await?;
		decoded(Surface::Native, Verb::Get, normalize::normalize(&response.body))
	}

	/// Create an object in `target`'s namespace (empty for cluster-scoped).
	///
	/// Aggregation API only; `target.name` is ignored.
	#[instrument(skip_all, fields(
		cluster = %target.cluster,
		resource_type = %target.resource_type,
		namespace = %target.namespace,
	))]
	pub async fn create(
		&self,
		target: ObjectRef<'_>,
		body: &Value,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		let request = ApiRequest::new(
			Method::POST,
			aggregated_path(target.cluster, target.resource_type, target.namespace, ""),
		)
		.body(encode_body(body)?);
		let response = self
			.exchange(Surface::Aggregated, Verb::Create, request, cancel)
			.await?;
		decoded(Surface::Aggregated, Verb::Create, normalize::normalize(&response.body))
	}

	/// Replace an object. The write is unconditional.
	#[instrument(skip_all, fields(
		cluster = %target.cluster,
		resource_type = %target.resource_type,
		namespace = %target.namespace,
		name = %target.name,
	))]
	pub async fn update(
		&self,
		target: ObjectRef<'_>,
		body: &Value,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		require_name(target, Verb::Update)?;
		let payload = encode_body(body)?;
		let request = ApiRequest::new(
			Method::PUT,
			aggregated_path(target.cluster, target.resource_type, target.namespace, target.name),
		)
		.body(payload.clone());

		with_fallback(
			cancel,
			async {
				let response = self
					.exchange(Surface::Aggregated, Verb::Update, request, cancel)
					.await?;
				decoded(Surface::Aggregated, Verb::Update, normalize::normalize(&response.body))
			},
			FallbackOn::NotFound,
			|miss| async move {
				let Some(native) = typemap::native_path(target.resource_type) else {
					return Err(miss);
				};
				let request = ApiRequest::new(
					Method::PUT,
					native_object_path(target.cluster, &native, target.namespace, target.name),
				)
				.body(payload);
				let response = self
					.exchange(Surface::Native, Verb::Update, request, cancel)
					.await?;
				decoded(Surface::Native, Verb::Update, normalize::normalize(&response.body))
			},
		)
		.await
	}

	/// Read-modify-write with a JSON merge patch.
	///
	/// The object is fetched, `patch` is deep-merged into its
	/// `apiVersion`/`kind`/`metadata`/`spec`/`status`, and the result is
	/// written back with [`Self::update`].
	#[instrument(skip_all, fields(
		cluster = %target.cluster,
		resource_type = %target.resource_type,
		namespace = %target.namespace,
		name = %target.name,
	))]
	pub async fn patch(
		&self,
		target: ObjectRef<'_>,
		patch: &Value,
		cancel: &CancellationToken,
	) -> Result<ResourceObject, ClientError> {
		require_name(target, Verb::Update)?;
		if !patch.is_object() {
			return Err(ClientError::InvalidPatch);
		}
		let existing = self.get(target, cancel).await?;
		let merged = merge_json(existing.to_manifest(), patch.clone());
		self.update(target, &merged, cancel).await
	}

	/// Delete an object.
	#[instrument(skip_all, fields(
		cluster = %target.cluster,
		resource_type = %target.resource_type,
		namespace = %target.namespace,
		name = %target.name,
	))]
	pub async fn delete(
		&self,
		target: ObjectRef<'_>,
		cancel: &CancellationToken,
	) -> Result<(), ClientError> {
		require_name(target, Verb::Delete)?;
		let request = ApiRequest::new(
			Method::DELETE,
			aggregated_path(target.cluster, target.resource_type, target.namespace, target.name),
		);

		with_fallback(
			cancel,
			async {
				self.exchange(Surface::Aggregated, Verb::Delete, request, cancel)
					.await
					.map(drop)
			},
			FallbackOn::NotFound,
			|miss| async move {
				let Some(native) = typemap::native_path(target.resource_type) else {
					return Err(miss);
				};
				let request = ApiRequest::new(
					Method::DELETE,
					native_object_path(target.cluster, &native, target.namespace, target.name),
				);
				self.exchange(Surface::Native, Verb::Delete, request, cancel)
					.await
					.map(drop)
			},
		)
		.await
	}

	/// Invoke a named action on an object (`?action=<action>`), such as
	/// starting a virtual machine.
	#[instrument(skip_all, fields(
		cluster = %target.cluster,
		resource_type = %target.resource_type,
		name = %target.name,
		action = %action,
	))]
	pub async fn action(
		&self,
		target: ObjectRef<'_>,
		action: &str,
		body: Option<&Value>,
		cancel: &CancellationToken,
	) -> Result<(), ClientError> {
		require_name(target, Verb::Action)?;
		let mut request = ApiRequest::new(
			Method::POST,
			aggregated_path(target.cluster, target.resource_type, target.namespace, target.name),
		)
		.query("action", action);
		if let Some(body) = body {
			request = request.body(encode_body(body)?);
		}
		self.exchange(Surface::Aggregated, Verb::Action, request, cancel)
			.await
			.map(drop)
	}

	/// Issue one request, racing it against cancellation, and turn non-2xx
	/// responses into [`ClientError::Status`].
	async fn exchange(
		&self,
		surface: Surface,
		verb: Verb,
		request: ApiRequest,
		cancel: &CancellationToken,
	) -> Result<RawResponse, ClientError> {
		if cancel.is_cancelled() {
			return Err(ClientError::Canceled);
		}
		debug!(%surface, %verb, method = %request.method, path = %request.path, "request");

		let response = tokio::select! {
			biased;
			() = cancel.cancelled() => return Err(ClientError::Canceled),
			response = self.transport.send(request) => response
				.map_err(|source| ClientError::Transport { surface, verb, source })?,
		};

		if !response.status.is_success() {
			return Err(ClientError::Status {
				surface,
				verb,
				status: response.status,
				body: response.body_text(),
			});
		}
		Ok(response)
	}
}
