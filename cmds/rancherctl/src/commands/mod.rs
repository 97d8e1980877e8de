//! Command handlers and the state they share.

pub mod action;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod patch;
pub mod update;

pub mod util;

use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{builder::NonEmptyStringValueParser, Args, Subcommand};
use rancher_client::{typemap, ResourceClient, TransportSettings, DEFAULT_READ_TIMEOUT};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Level};

use crate::{config::RancherConfig, output::OutputFormat, policy::Policy};

/// Connection, policy and output flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
	/// Config file; defaults to the nearest .rancherctl.yaml
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Rancher server URL
	#[arg(long, global = true, env = "RANCHER_SERVER_URL")]
	pub server_url: Option<String>,

	/// Rancher API bearer token
	#[arg(long, global = true, env = "RANCHER_TOKEN", hide_env_values = true)]
	pub token: Option<String>,

	/// Skip TLS certificate verification
	#[arg(long, global = true, env = "RANCHER_TLS_INSECURE")]
	pub tls_insecure: bool,

	/// Downstream cluster id (`local` for the management cluster)
	#[arg(short = 'c', long, global = true, env = "RANCHER_CLUSTER")]
	pub cluster: Option<String>,

	/// Request read timeout in seconds
	#[arg(long, global = true)]
	pub timeout: Option<u64>,

	/// Refuse mutating operations (overrides readOnly from the config file)
	#[arg(long, global = true)]
	pub read_only: Option<bool>,

	/// Refuse deletes even when writes are allowed
	#[arg(long, global = true)]
	pub disable_destructive: bool,

	/// Output format
	#[arg(short = 'o', long, global = true, value_enum, default_value_t)]
	pub output: OutputFormat,

	/// Log level (trace, debug, info, warn, error); defaults to RUST_LOG, then info
	#[arg(long, global = true)]
	pub log_level: Option<Level>,
}

/// Resource type, either as a logical type or as apiVersion/kind.
#[derive(Args, Debug, Clone, Default)]
pub struct TypeArgs {
	/// Logical resource type, e.g. `core.v1.pods` or `apps.v1.deployments`
	#[arg(short = 't', long = "type", conflicts_with_all = ["api_version", "kind"])]
	pub resource_type: Option<String>,

	/// API version, used together with --kind
	#[arg(long, requires = "kind")]
	pub api_version: Option<String>,

	/// Kind, used together with --api-version
	#[arg(long, requires = "api_version")]
	pub kind: Option<String>,
}

impl TypeArgs {
	pub fn logical_type(&self) -> Result<String> {
		match (&self.resource_type, &self.api_version, &self.kind) {
			(Some(ty), _, _) => Ok(ty.clone()),
			(None, Some(api_version), Some(kind)) => Ok(typemap::logical_type(api_version, kind)),
			_ => anyhow::bail!("a resource type is required: pass --type, or --api-version with --kind"),
		}
	}
}

/// A single named object.
#[derive(Args, Debug, Clone)]
pub struct ObjectArgs {
	#[command(flatten)]
	pub resource: TypeArgs,

	/// Object name
	#[arg(value_parser = NonEmptyStringValueParser::new())]
	pub name: String,

	/// Namespace; omit for cluster-scoped resources
	#[arg(short = 'n', long, default_value = "")]
	pub namespace: String,
}

#[derive(Subcommand)]
pub enum Commands {
	/// List resources of a type
	List(list::ListArgs),

	/// Show a single resource
	Get(get::GetArgs),

	/// Create a resource from a JSON or YAML document
	Create(create::CreateArgs),

	/// Replace a resource with a JSON or YAML document
	Update(update::UpdateArgs),

	/// Apply a JSON merge patch to a resource
	Patch(patch::PatchArgs),

	/// Delete a resource
	Delete(delete::DeleteArgs),

	/// Invoke an action on a resource, e.g. start a virtual machine
	Action(action::ActionArgs),
}

/// Everything a command needs to talk to Rancher.
pub struct Session {
	pub client: ResourceClient,
	pub cluster: String,
	pub policy: Policy,
	pub output: OutputFormat,
	pub cancel: CancellationToken,
}

impl Session {
	/// Merge flags over the config file and connect.
	pub fn open(global: &GlobalArgs) -> Result<Self> {
		let cwd = std::env::current_dir().context("resolving working directory")?;
		let config = RancherConfig::resolve(global.config.as_deref(), &cwd)?;
		debug!(?config, "loaded configuration");
		Self::from_config(global, config)
	}

	pub fn from_config(global: &GlobalArgs, config: RancherConfig) -> Result<Self> {
		let server_url = global
			.server_url
			.clone()
			.or_else(|| config.server_url.clone())
			.context("no Rancher server URL: pass --server-url, set RANCHER_SERVER_URL, or set serverUrl in the config file")?;
		let token = global
			.token
			.clone()
			.or_else(|| config.token.clone())
			.context("no Rancher token: pass --token, set RANCHER_TOKEN, or set token in the config file")?;

		let settings = TransportSettings {
			insecure: global.tls_insecure || config.tls_insecure,
			read_timeout: global
				.timeout
				.or(config.request_timeout_secs)
				.map_or(DEFAULT_READ_TIMEOUT, Duration::from_secs),
			..TransportSettings::new(server_url, token)
		};
		if settings.insecure {
			warn!("TLS certificate verification is disabled");
		}
		let client = ResourceClient::connect(&settings)
			.with_context(|| format!("connecting to {}", settings.server_url))?;

		let mut policy = Policy::from_config(&config);
		if let Some(read_only) = global.read_only {
			policy.read_only = read_only;
		}
		policy.disable_destructive |= global.disable_destructive;

		Ok(Self {
			client,
			cluster: global
				.cluster
				.clone()
				.or(config.default_cluster)
				.unwrap_or_else(|| "local".to_string()),
			policy,
			output: global.output,
			cancel: CancellationToken::new(),
		})
	}
}

/// Run a command to completion, canceling in-flight requests on Ctrl-C.
pub fn run<W: Write>(command: Commands, global: GlobalArgs, writer: W) -> Result<()> {
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")?;

	runtime.block_on(async move {
		let session = Session::open(&global)?;
		let cancel = session.cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				warn!("interrupted, canceling");
				cancel.cancel();
			}
		});
		run_async(command, &session, writer).await
	})
}

/// Dispatch a parsed command against an open session.
pub async fn run_async<W: Write>(command: Commands, session: &Session, writer: W) -> Result<()> {
	match command {
		Commands::List(args) => list::run(args, session, writer).await,
		Commands::Get(args) => get::run(args, session, writer).await,
		Commands::Create(args) => create::run(args, session, writer).await,
		Commands::Update(args) => update::run(args, session, writer).await,
		Commands::Patch(args) => patch::run(args, session, writer).await,
		Commands::Delete(args) => delete::run(args, session, writer).await,
		Commands::Action(args) => action::run(args, session, writer).await,
	}
}
