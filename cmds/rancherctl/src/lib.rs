//! Command-line access to resources on Rancher-managed clusters.

pub mod commands;
pub mod config;
pub mod output;
pub mod policy;
pub mod telemetry;

use clap::Parser;

#[derive(Parser)]
#[command(name = "rancherctl")]
#[command(about = "Inspect and modify resources on Rancher-managed clusters", long_about = None)]
#[command(version)]
pub struct Cli {
	#[command(flatten)]
	pub global: commands::GlobalArgs,

	#[command(subcommand)]
	pub command: commands::Commands,
}
