//! List command handler.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::Args;
use rancher_client::{ListOptions, ResourceCollection};
use tracing::{debug, instrument};

use super::{Session, TypeArgs};
use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
	#[command(flatten)]
	pub resource: TypeArgs,

	/// Namespace to list in; omit to list across all namespaces
	#[arg(short = 'n', long, default_value = "")]
	pub namespace: String,

	/// Label selector, e.g. `app=web`
	#[arg(short = 'l', long, default_value = "")]
	pub selector: String,

	/// Field selector, e.g. `status.phase=Running`
	#[arg(long, default_value = "")]
	pub field_selector: String,

	/// Page size; 0 leaves it to the server
	#[arg(long, default_value_t = 0)]
	pub limit: u32,

	/// Continuation token from a previous page
	#[arg(long = "continue", default_value = "")]
	pub continuation: String,

	/// Follow continuation tokens until every page has been fetched
	#[arg(long)]
	pub all_pages: bool,
}

/// Run the list command.
#[instrument(skip_all)]
pub async fn run<W: Write>(args: ListArgs, session: &Session, writer: W) -> Result<()> {
	let resource_type = args.resource.logical_type()?;
	let opts = ListOptions::builder()
		.namespace(args.namespace)
		.label_selector(args.selector)
		.field_selector(args.field_selector)
		.limit(args.limit)
		.continuation(args.continuation)
		.build();

	let collection = if args.all_pages {
		list_all(session, &resource_type, opts).await?
	} else {
		session
			.client
			.list(&session.cluster, &resource_type, &opts, &session.cancel)
			.await
			.with_context(|| format!("listing {resource_type}"))?
	};

	output::write_collection(session.output, &collection, writer)
}

/// Fetch every page, starting at `opts.continuation`.
async fn list_all(session: &Session, resource_type: &str, mut opts: ListOptions) -> Result<ResourceCollection> {
	let mut all = ResourceCollection::default();
	loop {
		let page = session
			.client
			.list(&session.cluster, resource_type, &opts, &session.cancel)
			.await
			.with_context(|| format!("listing {resource_type}"))?;
		debug!(items = page.data.len(), more = page.has_more(), "fetched page");

		let next = following_page(resource_type, &opts, &page)?;
		all.data.extend(page.data);
		match next {
			Some(next) => opts = next,
			None => return Ok(all),
		}
	}
}

/// Options for the page after `page`, or `None` on the last page.
///
/// A token equal to the one just sent would never make progress.
fn following_page(resource_type: &str, opts: &ListOptions, page: &ResourceCollection) -> Result<Option<ListOptions>> {
	if !page.has_more() {
		return Ok(None);
	}
	if page.continuation == opts.continuation {
		bail!(
			"listing {resource_type}: server repeated continue token `{}`",
			page.continuation
		);
	}
	Ok(Some(opts.next_page(page)))
}
