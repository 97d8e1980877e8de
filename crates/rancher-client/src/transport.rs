//! Authenticated HTTP transport to the Rancher proxy.

use std::{fmt, future::Future, time::Duration};

use bytes::Bytes;
use http::{header, Method, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use kube::{client::Body, Client, Config};
use tracing::trace;

use crate::error::TransportError;

/// Default timeout for reading proxy responses.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

const APPLICATION_JSON: &str = "application/json";

/// A request relative to the proxy base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
	pub method: Method,
	/// Absolute path, already percent-encoded.
	pub path: String,
	/// Unencoded query parameters, in order.
	pub query: Vec<(&'static str, String)>,
	/// JSON body for writes.
	pub body: Option<Vec<u8>>,
}

impl ApiRequest {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: None,
		}
	}

	/// Add a query parameter unless `value` is empty.
	#[must_use]
	pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
		let value = value.into();
		if !value.is_empty() {
			self.query.push((key, value));
		}
		self
	}

	#[must_use]
	pub fn body(mut self, body: Vec<u8>) -> Self {
		self.body = Some(body);
		self
	}

	/// Path with the percent-encoded query string appended.
	pub fn path_and_query(&self) -> String {
		if self.query.is_empty() {
			return self.path.clone();
		}
		let query = self
			.query
			.iter()
			.map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
			.collect::<Vec<_>>()
			.join("&");
		format!("{}?{query}", self.path)
	}
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
	pub status: StatusCode,
	pub body: Bytes,
}

impl RawResponse {
	/// Body as text for error reporting.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Issues requests against the proxy.
///
/// Implementations must be safe for concurrent use from many tasks.
pub trait Transport: Send + Sync {
	fn send(
		&self,
		request: ApiRequest,
	) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// Bearer token, redacted from debug output.
#[derive(Clone)]
struct BearerToken(String);

impl fmt::Debug for BearerToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("BearerToken(<redacted>)")
	}
}

/// Connection settings for [`KubeTransport`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
	/// Rancher server URL; `https://` is assumed when no scheme is given.
	pub server_url: String,
	pub token: String,
	/// Skip TLS certificate verification.
	pub insecure: bool,
	pub read_timeout: Duration,
}

impl TransportSettings {
	pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
		Self {
			server_url: server_url.into(),
			token: token.into(),
			insecure: false,
			read_timeout: DEFAULT_READ_TIMEOUT,
		}
	}
}

/// [`Transport`] over a `kube` client pointed at the Rancher server.
///
/// The client owns a shared connection pool; clones are cheap.
#[derive(Clone)]
pub struct KubeTransport {
	client: Client,
	token: BearerToken,
}

impl fmt::Debug for KubeTransport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KubeTransport")
			.field("token", &self.token)
			.finish_non_exhaustive()
	}
}

impl KubeTransport {
	pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
		let url = with_default_scheme(&settings.server_url);
		let uri: Uri = url.parse().map_err(|source| TransportError::InvalidUrl {
			url: url.clone(),
			source,
		})?;

		let mut config = Config::new(uri);
		config.accept_invalid_certs = settings.insecure;
		config.read_timeout = Some(settings.read_timeout);
		let client = Client::try_from(config).map_err(TransportError::ClientSetup)?;

		Ok(Self {
			client,
			token: BearerToken(settings.token.clone()),
		})
	}

	fn build(&self, request: ApiRequest) -> Result<Request<Body>, TransportError> {
		let path_and_query = request.path_and_query();
		let mut builder = Request::builder()
			.method(request.method)
			.uri(&path_and_query)
			.header(header::AUTHORIZATION, format!("Bearer {}", self.token.0))
			.header(header::ACCEPT, APPLICATION_JSON);
		let body = match request.body {
			Some(bytes) => {
				builder = builder.header(header::CONTENT_TYPE, APPLICATION_JSON);
				Body::from(bytes)
			}
			None => Body::empty(),
		};
		builder
			.body(body)
			.map_err(|source| TransportError::Request {
				path: path_and_query,
				source,
			})
	}
}

impl Transport for KubeTransport {
	fn send(
		&self,
		request: ApiRequest,
	) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
		async move {
			let request = self.build(request)?;
			trace!(method = %request.method(), uri = %request.uri(), "sending request");

			let response = self
				.client
				.send(request)
				.await
				.map_err(TransportError::Send)?;
			let status = response.status();
			let body = response
				.into_body()
				.collect()
				.await
				.map_err(|e| TransportError::Body(e.to_string()))?
				.to_bytes();

			trace!(%status, len = body.len(), "received response");
			Ok(RawResponse { status, body })
		}
	}
}

fn with_default_scheme(url: &str) -> String {
	if url.contains("://") {
		url.trim_end_matches('/').to_string()
	} else {
		format!("https://{}", url.trim_end_matches('/'))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_scheme() {
		assert_eq!(with_default_scheme("rancher.example.com"), "https://rancher.example.com");
		assert_eq!(with_default_scheme("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
	}

	#[test]
	fn test_query_skips_empty_values_and_encodes() {
		let request = ApiRequest::new(Method::GET, "/k8s/clusters/local/v1/core.v1.pods")
			.query("limit", "10")
			.query("continue", "")
			.query("labelSelector", "app in (web,api)");

		assert_eq!(
			request.path_and_query(),
			"/k8s/clusters/local/v1/core.v1.pods?limit=10&labelSelector=app%20in%20%28web%2Capi%29"
		);
	}

	#[test]
	fn test_path_without_query() {
		let request = ApiRequest::new(Method::DELETE, "/k8s/clusters/local/v1/core.v1.pods/web");
		assert_eq!(request.path_and_query(), "/k8s/clusters/local/v1/core.v1.pods/web");
	}

	#[test]
	fn test_token_is_redacted() {
		let token = BearerToken("secret-token".to_string());
		assert!(!format!("{token:?}").contains("secret"));
	}
}
