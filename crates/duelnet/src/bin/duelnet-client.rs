//! `duelnet-client`: find another player through the central server and
//! connect to them directly.
//!
//! Exits with 0 when the user is done, 1 when the rendezvous failed or the
//! client could not start.

use std::process::ExitCode;

use clap::Parser;
use duelnet::cli::{self, ClientArgs};
use duelnet::prelude::*;

fn main() -> ExitCode {
    let args = ClientArgs::parse();
    cli::init_logging(args.log_level.as_deref());

    match play(&args) {
        Ok(State::NeedToExit) => ExitCode::SUCCESS,
        Ok(state) => {
            tracing::debug!(state = state.name(), "client finished in a failure state");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "client could not start");
            ExitCode::FAILURE
        }
    }
}

fn play(args: &ClientArgs) -> Result<State, DuelnetError> {
    let mut config: ClientConfig = cli::load_config(args.config.as_deref())?;
    cli::apply_client_overrides(&mut config, args);

    let mut rendezvous = Rendezvous::new(config, ConsoleUser::stdio())?;
    Ok(rendezvous.run(State::NeedToConnectToCentralServer))
}
