//! Command-line definitions

use clap::{Args, Parser, Subcommand};
use xbe_auth::config::{BASE_URL_ENV, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(name = "xbe", version, about = "Command-line client for the XBE API")]
pub struct Cli {
    /// API base URL
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the stored API token
    #[command(subcommand)]
    Auth(AuthCommand),
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Store an API token for the base URL (keychain, or the config file if the keychain is unavailable)
    Login(LoginArgs),
    /// Remove the stored token for the base URL from the keychain and the config file
    Logout,
    /// Show which token would be used and where it comes from
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// API token; read from stdin when omitted
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// API token (overrides stored token)
    #[arg(long)]
    pub token: Option<String>,

    /// Disable automatic token lookup
    #[arg(long, conflicts_with = "token")]
    pub no_auth: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login_with_token() {
        let cli = Cli::try_parse_from([
            "xbe",
            "auth",
            "login",
            "--token",
            "abc",
            "--base-url",
            "https://staging.example.com/",
        ])
        .unwrap();

        assert_eq!(cli.base_url, "https://staging.example.com/");
        match cli.command {
            Commands::Auth(AuthCommand::Login(args)) => assert_eq!(args.token.as_deref(), Some("abc")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_status_flags() {
        let cli = Cli::try_parse_from(["xbe", "--json", "auth", "status", "--no-auth"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Auth(AuthCommand::Status(args)) => {
                assert!(args.no_auth);
                assert!(args.token.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_auth_conflicts_with_token() {
        let result = Cli::try_parse_from(["xbe", "auth", "status", "--no-auth", "--token", "abc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_logout_takes_no_token() {
        assert!(Cli::try_parse_from(["xbe", "auth", "logout", "--token", "abc"]).is_err());
        assert!(Cli::try_parse_from(["xbe", "auth", "logout"]).is_ok());
    }
}
