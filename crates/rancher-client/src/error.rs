//! Error taxonomy for resource access.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Which API surface a request went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
	/// The Rancher aggregation API (`/v1/<type>`).
	Aggregated,
	/// The per-cluster Kubernetes API (`/api`, `/apis`).
	Native,
}

impl fmt::Display for Surface {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Aggregated => f.write_str("aggregated"),
			Self::Native => f.write_str("native"),
		}
	}
}

/// Operation a request belongs to, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
	List,
	Get,
	Create,
	Update,
	Delete,
	Action,
}

impl fmt::Display for Verb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::List => "list",
			Self::Get => "get",
			Self::Create => "create",
			Self::Update => "update",
			Self::Delete => "delete",
			Self::Action => "action",
		})
	}
}

/// Connection-level failures raised before a status code is available.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("invalid server URL `{url}`")]
	InvalidUrl {
		url: String,
		#[source]
		source: http::uri::InvalidUri,
	},

	#[error("building HTTP client")]
	ClientSetup(#[source] kube::Error),

	#[error("building request for {path}")]
	Request {
		path: String,
		#[source]
		source: http::Error,
	},

	#[error("sending request")]
	Send(#[source] kube::Error),

	#[error("reading response body: {0}")]
	Body(String),
}

/// Errors returned by resource operations.
#[derive(Debug, Error)]
pub enum ClientError {
	/// The request never produced a status. Never triggers a fallback.
	#[error("{surface} {verb} request failed")]
	Transport {
		surface: Surface,
		verb: Verb,
		#[source]
		source: TransportError,
	},

	/// A non-2xx response, with the raw body for diagnosis.
	#[error("{surface} {verb} {status}: {body}")]
	Status {
		surface: Surface,
		verb: Verb,
		status: StatusCode,
		body: String,
	},

	/// A 2xx response whose body could not be decoded.
	#[error("{surface} {verb} decode")]
	Decode {
		surface: Surface,
		verb: Verb,
		#[source]
		source: serde_json::Error,
	},

	#[error("encoding request body")]
	Encode(#[source] serde_json::Error),

	#[error("merge patch must be a JSON object")]
	InvalidPatch,

	/// A single-object verb was given an empty name. Rejected before any
	/// request, since the path would otherwise address the whole collection.
	#[error("{verb} requires an object name")]
	MissingName { verb: Verb },

	#[error("operation canceled")]
	Canceled,
}

impl ClientError {
	/// HTTP status of a rejected request.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Status { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Surface that rejected or failed the request.
	pub fn surface(&self) -> Option<Surface> {
		match self {
			Self::Transport { surface, .. }
			| Self::Status { surface, .. }
			| Self::Decode { surface, .. } => Some(*surface),
			_ => None,
		}
	}

	pub fn is_not_found(&self) -> bool {
		self.status() == Some(StatusCode::NOT_FOUND)
	}

	pub fn is_forbidden(&self) -> bool {
		self.status() == Some(StatusCode::FORBIDDEN)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn status_error(status: StatusCode) -> ClientError {
		ClientError::Status {
			surface: Surface::Native,
			verb: Verb::List,
			status,
			body: "{\"reason\":\"NotFound\"}".to_string(),
		}
	}

	#[test]
	fn test_status_predicates() {
		assert!(status_error(StatusCode::NOT_FOUND).is_not_found());
		assert!(!status_error(StatusCode::NOT_FOUND).is_forbidden());
		assert!(status_error(StatusCode::FORBIDDEN).is_forbidden());
		assert!(!ClientError::Canceled.is_not_found());
		assert_eq!(ClientError::Canceled.status(), None);
	}

	#[test]
	fn test_missing_name_message() {
		let err = ClientError::MissingName { verb: Verb::Delete };
		assert_eq!(err.to_string(), "delete requires an object name");
		assert_eq!(err.surface(), None);
	}

	#[test]
	fn test_status_message_names_surface_and_body() {
		let message = status_error(StatusCode::NOT_FOUND).to_string();
		assert_eq!(message, "native list 404 Not Found: {\"reason\":\"NotFound\"}");
	}
}
