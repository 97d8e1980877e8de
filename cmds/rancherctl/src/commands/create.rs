//! Create command handler.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rancher_client::ObjectRef;
use tracing::{info, instrument};

use super::{util::read_document, Session, TypeArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct CreateArgs {
	#[command(flatten)]
	pub resource: TypeArgs,

	/// Namespace to create in; defaults to metadata.namespace of the document
	#[arg(short = 'n', long)]
	pub namespace: Option<String>,

	/// JSON or YAML document, `-` for stdin
	#[arg(short = 'f', long)]
	pub file: PathBuf,
}

/// Run the create command.
///
/// When no type flags are given, the type is derived from the document's
/// `apiVersion`/`kind`.
#[instrument(skip_all)]
pub async fn run<W: Write>(args: CreateArgs, session: &Session, writer: W) -> Result<()> {
	let body = read_document(&args.file)?;
	let resource_type = match args.resource.logical_type() {
		Ok(ty) => ty,
		Err(e) => match (
			body.get("apiVersion").and_then(|v| v.as_str()),
			body.get("kind").and_then(|v| v.as_str()),
		) {
			(Some(api_version), Some(kind)) => rancher_client::typemap::logical_type(api_version, kind),
			_ => return Err(e),
		},
	};
	let namespace = args.namespace.unwrap_or_else(|| {
		body.pointer("/metadata/namespace")
			.and_then(|v| v.as_str())
			.unwrap_or_default()
			.to_string()
	});
	session.policy.check_write("create", &namespace)?;

	let target = ObjectRef::new(&session.cluster, &resource_type).in_namespace(&namespace);
	let created = session
		.client
		.create(target, &body, &session.cancel)
		.await
		.with_context(|| format!("creating {resource_type}"))?;
	info!(resource_type = %resource_type, name = %created.metadata.name, "created");

	output::write_object(session.output, &created, writer)
}
