use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use fsched_cli::cli::Cli;
use fsched_cli::error::CliError;

#[tokio::main]
async fn main() {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(err) if err.kind() == ErrorKind::InvalidSubcommand => {
			let name = match err.get(ContextKind::InvalidSubcommand) {
				Some(ContextValue::String(name)) => name.clone(),
				_ => String::new(),
			};
			let _ = err.print();
			std::process::exit(CliError::CommandNotFound(name).exit_code());
		}
		Err(err) => err.exit(),
	};

	std::process::exit(fsched_cli::run(cli).await);
}
