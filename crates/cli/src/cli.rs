use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokyo_proto::Params;

#[derive(Parser, Debug)]
#[command(name = "tokyo")]
#[command(about = "Browse a library directory through tokyo accessors")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Library root served by the local backend
	#[arg(long, short, value_name = "DIR", default_value = ".")]
	pub root: PathBuf,

	/// Accessor configuration file (TOML)
	#[arg(long, short, value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(long, short)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print the library locations
	Locations {
		/// Case-insensitive name filter
		#[arg(long, short)]
		search: Option<String>,
		/// Sort order
		#[arg(long, value_enum)]
		sort: Option<LocationSort>,
	},
	/// List directories, relative to the root
	List {
		/// Paths to list, in order
		#[arg(default_value = "/")]
		paths: Vec<String>,
		/// Include dot entries
		#[arg(long, short = 'a')]
		hidden: bool,
		/// Reverse entry order
		#[arg(long)]
		desc: bool,
	},
}

/// Location sort keys.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSort {
	/// By display name.
	Name,
	/// By path.
	Path,
}

impl Command {
	/// Accessor params implied by the subcommand flags.
	pub fn params(&self) -> Params {
		let mut params = Params::new();
		match self {
			Self::Locations { search, sort } => {
				if let Some(search) = search {
					params.insert("search", search.as_str());
				}
				match sort {
					Some(LocationSort::Name) => {
						params.insert("sort", "name");
					}
					Some(LocationSort::Path) => {
						params.insert("sort", "path");
					}
					None => {}
				}
			}
			Self::List { hidden, desc, .. } => {
				params.insert("hidden", *hidden);
				params.insert("sort", if *desc { "desc" } else { "asc" });
			}
		}
		params
	}
}
