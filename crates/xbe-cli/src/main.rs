//! `xbe` CLI entry point.

use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod logging;
mod output;

use cli::Cli;

fn main() -> ExitCode {
    logging::init();

    let cli = Cli::parse();
    let json = cli.json;

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::print_error(&err, json);
            ExitCode::FAILURE
        }
    }
}
