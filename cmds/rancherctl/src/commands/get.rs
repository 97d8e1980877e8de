//! Get command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use rancher_client::ObjectRef;
use tracing::instrument;

use super::{ObjectArgs, Session};
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
	#[command(flatten)]
	pub object: ObjectArgs,
}

/// Run the get command.
#[instrument(skip_all, fields(name = %args.object.name))]
pub async fn run<W: Write>(args: GetArgs, session: &Session, writer: W) -> Result<()> {
	let resource_type = args.object.resource.logical_type()?;
	let target = ObjectRef::new(&session.cluster, &resource_type)
		.in_namespace(&args.object.namespace)
		.named(&args.object.name);

	let object = session
		.client
		.get(target, &session.cancel)
		.await
		.with_context(|| format!("getting {resource_type} {}", args.object.name))?;

	output::write_object(session.output, &object, writer)
}
