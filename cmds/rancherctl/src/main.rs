use anyhow::Result;
use clap::Parser;
use rancherctl::{
	commands::{self, util::BrokenPipeGuard},
	telemetry, Cli,
};

#[cfg(all(
	target_os = "linux",
	feature = "mimalloc",
	not(feature = "system-alloc")
))]
#[global_allocator]
static GLOBAL: mimallocator::Mimalloc = mimallocator::Mimalloc;

fn main() -> Result<()> {
	let cli = Cli::parse();

	let _telemetry = telemetry::init(cli.global.log_level)?;

	let stdout = BrokenPipeGuard::new(std::io::stdout());
	commands::run(cli.command, cli.global, stdout)
}
