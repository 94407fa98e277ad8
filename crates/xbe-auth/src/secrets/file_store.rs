//! JSON file token store
//!
//! Stores tokens at `{config_dir}/xbe/config.json` as
//! `{"tokens": {"<normalized-base-url>": "<token>"}}`.
//!
//! Every write replaces the whole document: the new content is written to a
//! temp file in the same directory and renamed over the old one. The
//! directory is created owner-only (`0700`) and the file is owner
//! read/write (`0600`). There is no locking; concurrent writers race and the
//! last rename wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{StoreError, StoreResult, Token, TokenStore};
use crate::config::Settings;

/// On-disk document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenFile {
    #[serde(default)]
    tokens: BTreeMap<String, String>,

    /// Fields this crate doesn't know about, carried across rewrites
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Token store backed by a JSON file
///
/// The file is created lazily on the first `set`; `get` and `delete` never
/// create it.
///
/// # Example
///
/// ```no_run
/// use xbe_auth::secrets::{FileTokenStore, Token, TokenStore};
///
/// let store = FileTokenStore::new("/tmp/xbe/config.json");
/// store.set("https://app.x-b-e.com", &Token::new("tok-..."))?;
/// # Ok::<(), xbe_auth::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the location resolved from `settings`
    pub fn at_default_location(settings: &Settings) -> StoreResult<Self> {
        Ok(Self::new(settings.token_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document
    ///
    /// A missing file is `NotFound` for `key`; a file that fails to parse is
    /// a `Parse` error.
    fn load(&self, key: &str) -> StoreResult<TokenFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "token file does not exist");
                return Err(StoreError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| StoreError::parse(&self.path, &e))
    }

    /// Atomically replace the document on disk
    fn save(&self, doc: &TokenFile) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        create_private_dir(dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".config.json.")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, doc).map_err(io::Error::from)?;
        tmp.write_all(b"\n")?;
        restrict_file_permissions(tmp.as_file())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %self.path.display(), entries = doc.tokens.len(), "saved token file");
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn restrict_file_permissions(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_file_permissions(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn name(&self) -> &str {
        "file"
    }

    fn describe(&self) -> String {
        format!("token file {}", self.path.display())
    }

    fn get(&self, key: &str) -> StoreResult<Token> {
        let doc = self.load(key)?;
        match doc.tokens.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(Token::new(value.as_str())),
            _ => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn set(&self, key: &str, token: &Token) -> StoreResult<()> {
        // A corrupt file is never overwritten; only a missing one starts empty.
        let mut doc = match self.load(key) {
            Ok(doc) => doc,
            Err(e) if e.is_not_found() => TokenFile::default(),
            Err(e) => return Err(e),
        };
        doc.tokens.insert(key.to_string(), token.expose().to_string());
        self.save(&doc)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut doc = self.load(key)?;
        if doc.tokens.remove(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        self.save(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY: &str = "https://app.x-b-e.com";

    #[test]
    fn test_fresh_store_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("xbe").join("config.json"));

        assert!(store.get(KEY).unwrap_err().is_not_found());
        assert!(store.get("").unwrap_err().is_not_found());
        assert!(!store.exists());
    }

    #[test]
    fn test_set_get_and_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("xbe").join("config.json");

        FileTokenStore::new(&path).set(KEY, &Token::new("secret")).unwrap();

        // A fresh instance reads what the first one wrote
        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get(KEY).unwrap().expose(), "secret");

        reopened.set(KEY, &Token::new("rotated")).unwrap();
        assert_eq!(reopened.get(KEY).unwrap().expose(), "rotated");
    }

    #[test]
    fn test_document_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileTokenStore::new(&path);

        store.set(KEY, &Token::new("secret")).unwrap();
        store.set("https://staging.example.com", &Token::new("other")).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tokens"][KEY], "secret");
        assert_eq!(value["tokens"]["https://staging.example.com"], "other");
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("config.json"));

        store.set(KEY, &Token::new("secret")).unwrap();
        store.delete(KEY).unwrap();
        assert!(store.get(KEY).unwrap_err().is_not_found());

        // Second delete finds nothing
        assert!(store.delete(KEY).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_never_set_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileTokenStore::new(&path);

        // No file yet: NotFound, and the file is not created
        assert!(store.delete(KEY).unwrap_err().is_not_found());
        assert!(!path.exists());

        // File exists but without this key
        store.set("https://other.example.com", &Token::new("x")).unwrap();
        assert!(store.delete(KEY).unwrap_err().is_not_found());
        assert_eq!(store.get("https://other.example.com").unwrap().expose(), "x");
    }

    #[test]
    fn test_empty_value_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, format!(r#"{{"tokens": {{"{}": ""}}}}"#, KEY)).unwrap();

        let store = FileTokenStore::new(&path);
        assert!(store.get(KEY).unwrap_err().is_not_found());
    }

    #[test]
    fn test_corrupt_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(matches!(store.get(KEY), Err(StoreError::Parse { .. })));
        assert!(matches!(store.delete(KEY), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_set_refuses_to_overwrite_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(matches!(
            store.set(KEY, &Token::new("secret")),
            Err(StoreError::Parse { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_parse_error_does_not_leak_token() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tokens": {"k": "super-secret-value"#).unwrap();

        let err = FileTokenStore::new(&path).get("k").unwrap_err();
        assert!(!err.to_string().contains("super-secret-value"));
    }

    #[test]
    fn test_mistyped_token_is_not_quoted_in_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tokens": "tok-SUPERSECRET"}"#).unwrap();
        let store = FileTokenStore::new(&path);

        let err = store.get(KEY).unwrap_err();
        match &err {
            StoreError::Parse { kind, line, .. } => {
                assert_eq!(*kind, "unexpected structure");
                assert_eq!(*line, 1);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(err.to_string().contains("line 1"));

        let errors = [
            err,
            store.set(KEY, &Token::new("new")).unwrap_err(),
            store.delete(KEY).unwrap_err(),
        ];
        for err in errors {
            assert!(!err.to_string().contains("SUPERSECRET"));
            assert!(!format!("{:?}", err).contains("SUPERSECRET"));
            assert!(std::error::Error::source(&err).is_none());
        }
    }

    #[test]
    fn test_unknown_fields_survive_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tokens": {}, "default_profile": "prod"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        store.set(KEY, &Token::new("secret")).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["default_profile"], "prod");
        assert_eq!(value["tokens"][KEY], "secret");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("config.json"));
        store.set(KEY, &Token::new("a")).unwrap();
        store.set(KEY, &Token::new("b")).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["config.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let app_dir = dir.path().join("xbe");
        let path = app_dir.join("config.json");
        FileTokenStore::new(&path).set(KEY, &Token::new("secret")).unwrap();

        let dir_mode = fs::metadata(&app_dir).unwrap().permissions().mode() & 0o777;
        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);
    }

    #[test]
    fn test_default_location() {
        let settings = Settings::default().with_config_dir("/cfg");
        let store = FileTokenStore::at_default_location(&settings).unwrap();
        assert_eq!(store.path(), Path::new("/cfg/xbe/config.json"));
        assert!(store.describe().contains("config.json"));
    }
}
