//! Resource access for Kubernetes clusters managed by a Rancher server.
//!
//! Rancher exposes each downstream cluster through two surfaces: its own
//! aggregation API (`/k8s/clusters/<id>/v1/<type>`) and a pass-through to the
//! cluster's Kubernetes API (`/k8s/clusters/<id>/api/...`,
//! `/k8s/clusters/<id>/apis/...`). Not every type is reachable through both,
//! and permissions can differ between them. [`ResourceClient`] routes each
//! verb to the surface most likely to serve it, falls back to the other on a
//! miss, and returns objects in one shape regardless of where they came from.
//!
//! ```no_run
//! use rancher_client::{ListOptions, ResourceClient, TransportSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ResourceClient::connect(&TransportSettings::new(
//! 	"rancher.example.com",
//! 	"token-xxxxx:yyyy",
//! ))?;
//! let pods = client
//! 	.list("local", "core.v1.pods", &ListOptions::default(), &CancellationToken::new())
//! 	.await?;
//! for pod in pods.data {
//! 	println!("{}/{}", pod.metadata.namespace, pod.metadata.name);
//! }
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod error;
mod merge;
pub mod normalize;
mod resource;
mod transport;
pub mod typemap;

pub use dispatch::{ResourceClient, PROXY_PREFIX};
pub use error::{ClientError, Surface, TransportError, Verb};
pub use merge::merge_json;
pub use resource::{ListOptions, ObjectMeta, ObjectRef, ResourceCollection, ResourceObject, TypeMeta};
pub use transport::{
	ApiRequest, KubeTransport, RawResponse, Transport, TransportSettings, DEFAULT_READ_TIMEOUT,
};
