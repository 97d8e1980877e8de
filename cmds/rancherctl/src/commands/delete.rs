//! Delete command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use rancher_client::ObjectRef;
use tracing::{info, instrument};

use super::{ObjectArgs, Session};

#[derive(Args, Debug)]
pub struct DeleteArgs {
	#[command(flatten)]
	pub object: ObjectArgs,
}

/// Run the delete command.
#[instrument(skip_all, fields(name = %args.object.name))]
pub async fn run<W: Write>(args: DeleteArgs, session: &Session, mut writer: W) -> Result<()> {
	let resource_type = args.object.resource.logical_type()?;
	session.policy.check_delete(&args.object.namespace)?;

	let target = ObjectRef::new(&session.cluster, &resource_type)
		.in_namespace(&args.object.namespace)
		.named(&args.object.name);
	session
		.client
		.delete(target, &session.cancel)
		.await
		.with_context(|| format!("deleting {resource_type} {}", args.object.name))?;
	info!(resource_type = %resource_type, name = %args.object.name, "deleted");

	writeln!(writer, "{resource_type} {} deleted", args.object.name)?;
	Ok(())
}
