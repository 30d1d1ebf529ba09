//! Command dispatch: bridges CLI args -> core repositories -> output formatting.

pub mod config_cmd;
pub mod list;
pub mod records;
pub mod util;

use sgivu_core::Backend;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    backend: &Backend,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => list::handle(backend, cfg, args, global).await,
        Command::Get(args) => records::get(backend, cfg, args, global).await,
        Command::Delete(args) => records::delete(backend, cfg, args, global).await,
        Command::Status(args) => records::status(backend, cfg, args, global).await,
        Command::Counts(args) => records::counts(backend, cfg, args, global).await,
        // Handled before a backend is built
        Command::Resources | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
