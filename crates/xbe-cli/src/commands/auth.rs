//! `xbe auth login | logout | status`

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;
use xbe_auth::{
    normalize_base_url, CombinedTokenStore, Settings, Token, TokenResolver, TokenSource,
    TokenStore,
};

use crate::cli::{AuthCommand, LoginArgs, StatusArgs};
use crate::output::{output, CommandOutput};

pub fn execute(command: AuthCommand, settings: &Settings, json_mode: bool) -> Result<()> {
    let resolver = TokenResolver::from_settings(settings);

    match command {
        AuthCommand::Login(args) => {
            let store = resolver.store().context("Failed to locate token storage")?;
            let token = match args.token {
                Some(token) => token,
                None => read_token(&mut io::stdin().lock(), io::stdin().is_terminal())?,
            };
            let result = login(store, &settings.base_url, &token)?;
            output(&result, json_mode);
        }
        AuthCommand::Logout => {
            let store = resolver.store().context("Failed to locate token storage")?;
            let result = logout(store, &settings.base_url)?;
            output(&result, json_mode);
        }
        AuthCommand::Status(args) => {
            let result = status(&resolver, &settings.base_url, &args);
            output(&result, json_mode);
            if result.error.is_some() {
                bail!("Token lookup failed");
            }
        }
    }
    Ok(())
}

/// Read one line from `input`, prompting on stderr when interactive
fn read_token(input: &mut impl BufRead, interactive: bool) -> Result<String> {
    if interactive {
        eprint!("Paste your API token: ");
        io::stderr().flush().ok();
    }

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read token from stdin")?;
    let token = line.trim().to_string();
    if token.is_empty() {
        bail!("No token provided. Pass --token or pipe the token on stdin.");
    }
    Ok(token)
}

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    pub base_url: String,
    pub stored_in: TokenSource,
    pub location: String,
}

impl CommandOutput for LoginOutput {
    fn to_human(&self) -> String {
        let mut message = format!(
            "Logged in to {}. Token stored in {}.",
            self.base_url, self.location
        );
        if self.stored_in == TokenSource::File {
            message.push_str("\nThe system keychain was unavailable; the file is protected by filesystem permissions only.");
        }
        message
    }
}

pub fn login(store: &CombinedTokenStore, base_url: &str, token: &str) -> Result<LoginOutput> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Token must not be empty");
    }

    let key = normalize_base_url(base_url);
    let stored_in = store
        .set(&key, &Token::new(token))
        .context("Failed to save token")?;
    debug!(key = %key, stored_in = %stored_in, "login complete");

    let location = match stored_in {
        TokenSource::Keychain => store.primary().describe(),
        _ => store.secondary().describe(),
    };

    Ok(LoginOutput {
        base_url: key,
        stored_in,
        location,
    })
}

#[derive(Debug, Serialize)]
pub struct LogoutOutput {
    pub base_url: String,
    pub removed: bool,
}

impl CommandOutput for LogoutOutput {
    fn to_human(&self) -> String {
        if self.removed {
            format!("Logged out of {}.", self.base_url)
        } else {
            format!("No stored token for {}.", self.base_url)
        }
    }
}

pub fn logout(store: &CombinedTokenStore, base_url: &str) -> Result<LogoutOutput> {
    let key = normalize_base_url(base_url);
    let removed = store.delete(&key).context("Failed to remove token")?;
    Ok(LogoutOutput {
        base_url: key,
        removed,
    })
}

#[derive(Debug, Serialize)]
pub struct BackendReport {
    pub source: TokenSource,
    pub store: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub base_url: String,
    pub authenticated: bool,
    pub source: TokenSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_detail: Option<String>,
    /// Why the lookup failed, when it failed for a reason other than "no token"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub backends: Vec<BackendReport>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Base URL: {}", self.base_url)];
        match (&self.source, &self.source_detail, &self.error) {
            (_, _, Some(error)) => lines.push(format!("Token lookup failed: {}", error)),
            (TokenSource::None, Some(detail), None) => {
                lines.push(format!("Not authenticated: {}", detail))
            }
            (TokenSource::None, None, None) => {
                lines.push("Not authenticated. Run `xbe auth login` first.".to_string())
            }
            (_, Some(detail), None) => {
                lines.push(format!("Authenticated via {} ({})", self.source, detail))
            }
            (_, None, None) => lines.push(format!("Authenticated via {}", self.source)),
        }

        if !self.backends.is_empty() {
            lines.push("\nStored tokens:".to_string());
            for backend in &self.backends {
                match &backend.error {
                    Some(error) => lines.push(format!("  - {}: error: {}", backend.store, error)),
                    None => lines.push(format!("  - {}: {}", backend.store, backend.state)),
                }
            }
        }
        lines.join("\n")
    }
}

/// Resolve the token for `base_url` and report every backend
///
/// Lookup failures end up in [`StatusOutput::error`] rather than as an
/// `Err`, so the per-backend report is always produced.
pub fn status(resolver: &TokenResolver, base_url: &str, args: &StatusArgs) -> StatusOutput {
    let key = normalize_base_url(base_url);

    if args.no_auth {
        return StatusOutput {
            base_url: key,
            authenticated: false,
            source: TokenSource::None,
            source_detail: Some("token lookup disabled (--no-auth)".to_string()),
            error: None,
            backends: Vec::new(),
        };
    }

    let backends = match resolver.store() {
        Ok(store) => store
            .backend_status(&key)
            .into_iter()
            .map(|status| BackendReport {
                source: status.source,
                store: status.store,
                state: status.state.as_str(),
                error: status.state.error().map(str::to_string),
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "no token storage to report on");
            Vec::new()
        }
    };

    let (source, source_detail, error) = match resolver.resolve(args.token.as_deref(), base_url) {
        Ok(resolved) => (resolved.source, Some(resolved.source_detail), None),
        Err(e) if e.is_not_found() => (TokenSource::None, None, None),
        Err(e) => (TokenSource::None, None, Some(e.to_string())),
    };

    StatusOutput {
        base_url: key,
        authenticated: source != TokenSource::None,
        source,
        source_detail,
        error,
        backends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::tempdir;
    use xbe_auth::{EnvTokenStore, FileTokenStore, MemoryTokenStore};

    const URL: &str = "https://app.x-b-e.com/";

    fn file_backed(path: &std::path::Path) -> TokenResolver {
        TokenResolver::new(
            EnvTokenStore::with_vars(["XBE_CLI_TEST_UNSET"]),
            CombinedTokenStore::new(
                Arc::new(MemoryTokenStore::unavailable()),
                Arc::new(FileTokenStore::new(path)),
            ),
        )
    }

    fn status_args(token: Option<&str>, no_auth: bool) -> StatusArgs {
        StatusArgs {
            token: token.map(str::to_string),
            no_auth,
        }
    }

    #[test]
    fn test_read_token_trims_input() {
        let mut input = Cursor::new("  tok-123 \n");
        assert_eq!(read_token(&mut input, false).unwrap(), "tok-123");
    }

    #[test]
    fn test_read_token_rejects_empty_input() {
        let mut input = Cursor::new("\n");
        assert!(read_token(&mut input, false).is_err());
    }

    #[test]
    fn test_login_status_logout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("xbe").join("config.json");
        let resolver = file_backed(&path);

        let logged_in = login(resolver.store().unwrap(), URL, "secret-token").unwrap();
        assert_eq!(logged_in.base_url, "https://app.x-b-e.com");
        assert_eq!(logged_in.stored_in, TokenSource::File);
        assert!(logged_in.to_human().contains("config.json"));

        let report = status(&resolver, URL, &status_args(None, false));
        assert!(report.authenticated);
        assert_eq!(report.source, TokenSource::File);
        assert_eq!(report.backends.len(), 2);
        assert_eq!(report.backends[0].state, "error");
        assert_eq!(report.backends[1].state, "present");

        // The token never appears in any output
        let human = report.to_human();
        let json = report.to_json().to_string();
        assert!(!human.contains("secret-token"));
        assert!(!json.contains("secret-token"));

        let err = logout(resolver.store().unwrap(), URL).unwrap_err();
        // Keychain unreachable is a real error even though the file copy is gone
        assert!(format!("{:#}", err).contains("token store unavailable"));
        assert!(!FileTokenStore::new(&path).has("https://app.x-b-e.com").unwrap());
    }

    #[test]
    fn test_logout_without_token() {
        let resolver = TokenResolver::new(
            EnvTokenStore::with_vars(["XBE_CLI_TEST_UNSET"]),
            CombinedTokenStore::new(
                Arc::new(MemoryTokenStore::new()),
                Arc::new(MemoryTokenStore::new()),
            ),
        );

        let result = logout(resolver.store().unwrap(), URL).unwrap();
        assert!(!result.removed);
        assert!(result.to_human().contains("No stored token"));
    }

    #[test]
    fn test_login_rejects_blank_token() {
        let dir = tempdir().unwrap();
        let resolver = file_backed(&dir.path().join("config.json"));
        assert!(login(resolver.store().unwrap(), URL, "   ").is_err());
    }

    #[test]
    fn test_status_not_logged_in() {
        let dir = tempdir().unwrap();
        let resolver = file_backed(&dir.path().join("config.json"));

        let report = status(&resolver, URL, &status_args(None, false));
        assert!(!report.authenticated);
        assert_eq!(report.source, TokenSource::None);
        assert!(report.to_human().contains("xbe auth login"));
    }

    #[test]
    fn test_status_with_explicit_token() {
        let dir = tempdir().unwrap();
        let resolver = file_backed(&dir.path().join("config.json"));

        let report = status(&resolver, URL, &status_args(Some("abc"), false));
        assert!(report.authenticated);
        assert_eq!(report.source, TokenSource::Explicit);
        assert_eq!(report.to_json()["source"], "explicit");
    }

    #[test]
    fn test_status_no_auth() {
        let dir = tempdir().unwrap();
        let resolver = file_backed(&dir.path().join("config.json"));

        let report = status(&resolver, URL, &status_args(None, true));
        assert!(!report.authenticated);
        assert!(report.backends.is_empty());
        assert!(report.to_human().contains("--no-auth"));
    }

    #[test]
    fn test_status_surfaces_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        let resolver = file_backed(&path);

        let report = status(&resolver, URL, &status_args(None, false));
        assert!(!report.authenticated);
        assert!(report.error.as_deref().unwrap().contains("Failed to parse token file"));
        assert!(report.to_human().contains("Token lookup failed"));
        assert_eq!(report.to_json()["error"], report.error.clone().unwrap().as_str());
    }

    #[test]
    fn test_status_reports_backends_when_both_fail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        let resolver = file_backed(&path);

        let report = status(&resolver, URL, &status_args(None, false));
        assert!(report.error.is_some());
        assert_eq!(report.backends.len(), 2);
        assert_eq!(report.backends[0].state, "error");
        assert!(report.backends[0].error.as_deref().unwrap().contains("token store unavailable"));
        assert_eq!(report.backends[1].state, "error");
        assert!(report.backends[1].error.as_deref().unwrap().contains("config.json"));
    }
}
