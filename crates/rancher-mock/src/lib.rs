//! Mock Rancher cluster proxy for testing.
//!
//! Provides an HTTP server that answers on both the aggregation API and the
//! native Kubernetes pass-through of one downstream cluster.

mod helpers;
pub mod http;
mod store;

pub use helpers::logical_type_of;
pub use http::{
	HttpMockRancherServer, MockSurface, RecordedRequest, RunningHttpMockRancherServer, StatusOverride,
};
pub use store::{MockResource, MockStore, StoreError};
