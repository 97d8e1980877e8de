//! Action command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use rancher_client::ObjectRef;
use tracing::{info, instrument};

use super::{util::parse_document, ObjectArgs, Session};

#[derive(Args, Debug)]
pub struct ActionArgs {
	#[command(flatten)]
	pub object: ObjectArgs,

	/// Action name, e.g. `start`, `stop`, `restart`
	#[arg(short = 'a', long)]
	pub action: String,

	/// Optional JSON or YAML action input
	#[arg(long)]
	pub input: Option<String>,
}

/// Run the action command.
#[instrument(skip_all, fields(name = %args.object.name, action = %args.action))]
pub async fn run<W: Write>(args: ActionArgs, session: &Session, mut writer: W) -> Result<()> {
	let resource_type = args.object.resource.logical_type()?;
	session.policy.check_write("action", &args.object.namespace)?;
	let input = args
		.input
		.as_deref()
		.map(parse_document)
		.transpose()
		.context("parsing --input")?;

	let target = ObjectRef::new(&session.cluster, &resource_type)
		.in_namespace(&args.object.namespace)
		.named(&args.object.name);
	session
		.client
		.action(target, &args.action, input.as_ref(), &session.cancel)
		.await
		.with_context(|| format!("{} on {resource_type} {}", args.action, args.object.name))?;
	info!(resource_type = %resource_type, "action accepted");

	writeln!(writer, "{} accepted for {resource_type} {}", args.action, args.object.name)?;
	Ok(())
}
