//! Command dispatch: bridges CLI args to the server, watcher and record
//! service, then to output formatting.

pub mod config_cmd;
pub mod logs;
pub mod serve;
pub mod soldiers;
pub mod threats;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve(args) => serve::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Soldiers(args) => soldiers::handle(args, global).await,
        Command::Logs(args) => logs::handle(args, global).await,
        Command::Threats(args) => threats::handle(args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = crate::cli::Cli::command();
            generate(args.shell, &mut cmd, "sentinel", &mut std::io::stdout());
            Ok(())
        }
    }
}
