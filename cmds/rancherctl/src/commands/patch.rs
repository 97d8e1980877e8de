//! Patch command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use rancher_client::ObjectRef;
use tracing::{info, instrument};

use super::{util::parse_document, ObjectArgs, Session};
use crate::output;

#[derive(Args, Debug)]
pub struct PatchArgs {
	#[command(flatten)]
	pub object: ObjectArgs,

	/// JSON merge patch, e.g. `{"spec":{"replicas":3}}`
	#[arg(short = 'p', long)]
	pub patch: String,
}

/// Run the patch command.
#[instrument(skip_all, fields(name = %args.object.name))]
pub async fn run<W: Write>(args: PatchArgs, session: &Session, writer: W) -> Result<()> {
	let resource_type = args.object.resource.logical_type()?;
	session.policy.check_write("patch", &args.object.namespace)?;
	let patch = parse_document(&args.patch).context("parsing --patch")?;

	let target = ObjectRef::new(&session.cluster, &resource_type)
		.in_namespace(&args.object.namespace)
		.named(&args.object.name);
	let patched = session
		.client
		.patch(target, &patch, &session.cancel)
		.await
		.with_context(|| format!("patching {resource_type} {}", args.object.name))?;
	info!(resource_type = %resource_type, name = %patched.metadata.name, "patched");

	output::write_object(session.output, &patched, writer)
}
