#![allow(missing_docs)]

use clap::{ArgAction, Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "propbind", about = "Property binding resolution and copy tools")]
struct Cli {
	/// Raise log verbosity (`-v` debug, `-vv` trace).
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Parse and format a property path.
	Path(cmd::path::Args),
	/// Resolve a scenario's bindings and print the compiled copies.
	Resolve(cmd::resolve::Args),
	/// Resolve a scenario, run every copy batch and print the results.
	Copy(cmd::copy::Args),
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> propbind::bind::Result<()> {
	let cli = Cli::parse();
	cmd::util::init_logging(cli.verbose);

	match cli.command {
		Commands::Path(args) => cmd::path::run(args),
		Commands::Resolve(args) => cmd::resolve::run(args),
		Commands::Copy(args) => cmd::copy::run(args),
	}
}
