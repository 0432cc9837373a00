mod cli;
mod controller;
mod gateway;
mod model;
mod render;
mod session;
mod store;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_script_mode =
        args.json || !matches!(args.command, None | Some(cli::Command::Console));

    match cli::run(args).await {
        Ok(()) => {
            // Explicit exit keeps scripting modes from waiting on runtime teardown.
            if is_script_mode {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}
