//! `duelnet-server`: the central matchmaking server.

use std::process::ExitCode;

use clap::Parser;
use duelnet::cli::{self, ServerArgs};
use duelnet::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ServerArgs::parse();
    cli::init_logging(args.log_level.as_deref());

    match serve(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "central server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn serve(args: &ServerArgs) -> Result<(), DuelnetError> {
    let mut config: ServerConfig = cli::load_config(args.config.as_deref())?;
    config.apply_cli_overrides(args);

    let server = CentralServer::builder().config(config).build().await?;
    server.run().await
}
