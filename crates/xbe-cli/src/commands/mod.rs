//! Command implementations

pub mod auth;

use anyhow::Result;
use xbe_auth::Settings;

use crate::cli::{Cli, Commands};

pub fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().with_base_url(cli.base_url);

    match cli.command {
        Commands::Auth(command) => auth::execute(command, &settings, cli.json),
    }
}
