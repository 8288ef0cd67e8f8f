//! tokyo: browse a library directory through tokyo accessors.

mod cli;
mod session;

use std::io::Write;

use clap::Parser;
use cli::{Cli, Command};
use serde::Serialize;
use session::Session;
use tokyo_accessor::AccessorConfig;
use tokyo_library::{DirectoryStrategy, LocationsStrategy};
use tokyo_proto::Query;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = match &cli.config {
		Some(path) => AccessorConfig::load(path)?,
		None => AccessorConfig::named("tokyo"),
	};
	info!(root = %cli.root.display(), accessor = %config.name, "tokyo.start");

	let params = cli.command.params();
	match cli.command {
		Command::Locations { .. } => {
			let mut session = Session::open(&cli.root, config, LocationsStrategy)?;
			session.set_params(params)?;
			print_json(&session.fetch(Query::new()).await?)?;
			session.close();
		}
		Command::List { paths, .. } => {
			let mut session = Session::open(&cli.root, config, DirectoryStrategy)?;
			session.set_params(params)?;
			let mut view = Vec::new();
			for path in paths {
				view = session.fetch(Query::new().with("path", path)).await?;
			}
			print_json(&view)?;
			session.close();
		}
	}
	Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
	let mut stdout = std::io::stdout().lock();
	serde_json::to_writer_pretty(&mut stdout, value)?;
	writeln!(stdout)?;
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("tokyo=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
