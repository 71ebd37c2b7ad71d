//! Connection profiles
//!
//! Profiles live in an INI file, one section per environment:
//!
//! ```ini
//! [demo]
//! host = localhost
//! port = 8069
//! database = demo
//! username = admin
//! password = admin
//! ```
//!
//! `scheme` defaults to `http`, `host` to `localhost`, `port` to `8069` and
//! `username` to `admin`. A profile without `password` leaves the password to
//! the prompt.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::cli::Connection;
use crate::error::{CliError, CliResult};

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "erpshell.ini";

const DEFAULT_SERVER: &str = "http://localhost:8069";
const DEFAULT_USER: &str = "admin";

#[derive(Debug, Clone, Deserialize)]
struct RawProfile {
    #[serde(default = "default_scheme")]
    scheme: String,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    database: Option<String>,
    #[serde(default = "default_username")]
    username: String,
    password: Option<String>,
}

fn default_scheme() -> String {
    "http".into()
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    8069
}

fn default_username() -> String {
    DEFAULT_USER.into()
}

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub server: String,
    pub database: Option<String>,
    pub user: String,
    pub password: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.into(),
            database: None,
            user: DEFAULT_USER.into(),
            password: None,
        }
    }
}

impl From<RawProfile> for Profile {
    fn from(raw: RawProfile) -> Self {
        Self {
            server: format!("{}://{}:{}", raw.scheme, raw.host, raw.port),
            database: raw.database,
            user: raw.username,
            password: raw.password.filter(|p| !p.is_empty()),
        }
    }
}

impl Profile {
    /// Command-line flags win over the profile.
    pub fn with_overrides(mut self, connection: &Connection) -> Self {
        if let Some(server) = &connection.server {
            self.server.clone_from(server);
        }
        if let Some(database) = &connection.database {
            self.database = Some(database.clone());
        }
        if let Some(user) = &connection.user {
            // another user does not inherit the profile password
            if *user != self.user {
                self.password = None;
            }
            self.user.clone_from(user);
        }
        if let Some(password) = &connection.password {
            self.password = Some(password.clone());
        }
        self
    }
}

/// Profiles read from one configuration file.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    profiles: BTreeMap<String, RawProfile>,
}

impl ProfileStore {
    /// Load the profiles of `path`.
    ///
    /// # Errors
    ///
    /// [`CliError::Config`] if the file is missing or malformed.
    pub fn load(path: &Path) -> CliResult<Self> {
        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini).required(true))
            .build()?;
        let profiles: BTreeMap<String, RawProfile> = settings.try_deserialize()?;
        tracing::debug!(path = %path.display(), profiles = profiles.len(), "configuration loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            profiles,
        })
    }

    /// Load the explicit file, else the first default location that exists.
    /// No file at all yields an empty store.
    ///
    /// # Errors
    ///
    /// See [`ProfileStore::load`].
    pub fn discover(explicit: Option<&Path>) -> CliResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_locations().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Profile names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Settings of profile `name`.
    ///
    /// # Errors
    ///
    /// [`CliError::UnknownProfile`] if the file has no such section.
    pub fn resolve(&self, name: &str) -> CliResult<Profile> {
        self.profiles
            .get(name)
            .cloned()
            .map(Profile::from)
            .ok_or_else(|| CliError::UnknownProfile {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }
}

/// `./erpshell.ini`, then `<config dir>/erpshell/erpshell.ini`.
pub fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("erpshell").join(CONFIG_FILE));
    }
    locations
}

/// Settings for this invocation: the `--env` profile if any, then the flags.
///
/// # Errors
///
/// Configuration errors, and [`CliError::UnknownProfile`].
pub fn resolve_connection(connection: &Connection) -> CliResult<Profile> {
    let base = match &connection.env {
        Some(env) => ProfileStore::discover(connection.config.as_deref())?.resolve(env)?,
        None => Profile::default(),
    };
    Ok(base.with_overrides(connection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ini(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const SAMPLE: &str = "\
[demo]
host = localhost
port = 8069
database = demo
username = admin
password = admin

[prod]
scheme = https
host = erp.example.com
port = 443
database = production
";

    #[test]
    fn test_resolve_profiles() {
        let file = ini(SAMPLE);
        let store = ProfileStore::load(file.path()).unwrap();
        assert_eq!(store.names(), vec!["demo", "prod"]);

        assert_eq!(
            store.resolve("demo").unwrap(),
            Profile {
                server: "http://localhost:8069".into(),
                database: Some("demo".into()),
                user: "admin".into(),
                password: Some("admin".into()),
            }
        );
        assert_eq!(
            store.resolve("prod").unwrap(),
            Profile {
                server: "https://erp.example.com:443".into(),
                database: Some("production".into()),
                user: "admin".into(),
                password: None,
            }
        );
    }

    #[test]
    fn test_unknown_profile() {
        let file = ini(SAMPLE);
        let store = ProfileStore::load(file.path()).unwrap();
        match store.resolve("staging").unwrap_err() {
            CliError::UnknownProfile { name, available } => {
                assert_eq!(name, "staging");
                assert_eq!(available, "demo, prod");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = ProfileStore::load(Path::new("/nonexistent/erpshell.ini")).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_flags_override_profile() {
        let file = ini(SAMPLE);
        let connection = Connection {
            config: Some(file.path().to_path_buf()),
            env: Some("demo".into()),
            database: Some("other".into()),
            user: Some("bob".into()),
            ..Default::default()
        };
        let profile = resolve_connection(&connection).unwrap();
        assert_eq!(profile.server, "http://localhost:8069");
        assert_eq!(profile.database.as_deref(), Some("other"));
        assert_eq!(profile.user, "bob");
        assert_eq!(profile.password, None);

        let connection = Connection {
            password: Some("pw".into()),
            server: Some("http://10.0.0.2:8069".into()),
            ..Default::default()
        };
        let profile = resolve_connection(&connection).unwrap();
        assert_eq!(profile.server, "http://10.0.0.2:8069");
        assert_eq!(profile.user, "admin");
        assert_eq!(profile.password.as_deref(), Some("pw"));
    }
}
