//! Update command handler.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rancher_client::ObjectRef;
use tracing::{info, instrument};

use super::{util::read_document, ObjectArgs, Session};
use crate::output;

#[derive(Args, Debug)]
pub struct UpdateArgs {
	#[command(flatten)]
	pub object: ObjectArgs,

	/// JSON or YAML document replacing the object, `-` for stdin
	#[arg(short = 'f', long)]
	pub file: PathBuf,
}

/// Run the update command.
#[instrument(skip_all, fields(name = %args.object.name))]
pub async fn run<W: Write>(args: UpdateArgs, session: &Session, writer: W) -> Result<()> {
	let resource_type = args.object.resource.logical_type()?;
	session.policy.check_write("update", &args.object.namespace)?;
	let body = read_document(&args.file)?;

	let target = ObjectRef::new(&session.cluster, &resource_type)
		.in_namespace(&args.object.namespace)
		.named(&args.object.name);
	let updated = session
		.client
		.update(target, &body, &session.cancel)
		.await
		.with_context(|| format!("updating {resource_type} {}", args.object.name))?;
	info!(resource_type = %resource_type, name = %updated.metadata.name, "updated");

	output::write_object(session.output, &updated, writer)
}
