//! Session bootstrap and authentication.
//!
//! Connecting is strictly ordered:
//!
//! 1. ask `db.server_version` to learn the protocol generation,
//! 2. build the five services with the method sets of that generation,
//! 3. check the target database is listed by `db.list` (warn if not),
//! 4. authenticate, going to the server only on a credential cache miss.
//!
//! The credential cache is an explicit object shared by `Arc`; clients built
//! with the same cache reuse each other's logins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::reporter::{Reporter, repr};
use crate::service::{ProtocolGeneration, SERVICE_NAMES, Service};
use crate::transport::Transport;

/// Who is logging in where. Password deliberately excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerIdentity {
    pub server: String,
    pub database: String,
    pub user: String,
}

impl ServerIdentity {
    pub fn new(server: impl Into<String>, database: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
            user: user.into(),
        }
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.user, self.server, self.database)
    }
}

/// A successful login: numeric user id and the password that worked.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub uid: i64,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("uid", &self.uid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Logins keyed by [`ServerIdentity`]. Entries are never expired; a later
/// successful login for the same identity overwrites the entry.
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: Mutex<HashMap<ServerIdentity, Credential>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &ServerIdentity) -> Option<Credential> {
        self.entries.lock().get(identity).cloned()
    }

    pub fn insert(&self, identity: ServerIdentity, credential: Credential) {
        self.entries.lock().insert(identity, credential);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Asks the operator for a password.
pub trait PasswordPrompt: Send + Sync + fmt::Debug {
    /// `None` when the operator gave up.
    fn prompt(&self, identity: &ServerIdentity) -> Option<String>;
}

/// The authentication triple prepended to every `object`, `wizard` and
/// `report` call.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub database: String,
    pub uid: i64,
    pub password: String,
}

impl Auth {
    pub fn args(&self) -> Vec<Value> {
        vec![json!(self.database), json!(self.uid), json!(self.password)]
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("database", &self.database)
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

/// The negotiated services of one server.
#[derive(Debug, Clone)]
pub struct Services {
    pub generation: ProtocolGeneration,
    pub server_version: String,
    pub db: Service,
    pub common: Service,
    pub object: Service,
    pub wizard: Service,
    pub report: Service,
}

impl Services {
    /// Probe the server version and build every service for its generation.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] if the version probe fails;
    /// [`Error::UnexpectedResult`] if it does not return a string.
    pub async fn negotiate(
        transport: Arc<dyn Transport>,
        reporter: Arc<dyn Reporter>,
        verbose: bool,
    ) -> Result<Self> {
        // server_version exists on every generation
        let probe = Service::for_generation(
            "db",
            ProtocolGeneration::Legacy,
            Arc::clone(&transport),
            Arc::clone(&reporter),
        )
        .with_verbose(verbose);
        let version = probe.call("server_version", vec![]).await?;
        let server_version = match version {
            Value::String(s) => s,
            other => return Err(Error::unexpected("db.server_version", repr(&other))),
        };
        let generation = ProtocolGeneration::from_server_version(&server_version);
        tracing::info!(server = %transport.endpoint(), version = %server_version, %generation, "negotiated protocol");

        let [db, common, object, wizard, report] = SERVICE_NAMES.map(|name| {
            Service::for_generation(name, generation, Arc::clone(&transport), Arc::clone(&reporter))
                .with_verbose(verbose)
        });
        Ok(Self {
            generation,
            server_version,
            db,
            common,
            object,
            wizard,
            report,
        })
    }

    /// Look up a service by name.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] for names outside [`SERVICE_NAMES`].
    pub fn get(&self, name: &str) -> Result<&Service> {
        match name {
            "db" => Ok(&self.db),
            "common" => Ok(&self.common),
            "object" => Ok(&self.object),
            "wizard" => Ok(&self.wizard),
            "report" => Ok(&self.report),
            other => Err(Error::missing_attribute("client", other)),
        }
    }

    /// Names returned by `db.list`.
    ///
    /// # Errors
    ///
    /// Whatever the call raised, or [`Error::UnexpectedResult`] if the result
    /// is not a list of strings.
    pub async fn list_databases(&self) -> Result<Vec<String>> {
        let listed = self.db.call("list", vec![]).await?;
        serde_json::from_value(listed.clone()).map_err(|_| Error::unexpected("db.list", repr(&listed)))
    }

    /// Whether `database` is served; reports the soft condition when not.
    ///
    /// # Errors
    ///
    /// Faults from `db.list`.
    pub async fn check_database(&self, database: &str, reporter: &dyn Reporter) -> Result<bool> {
        let databases = self.list_databases().await?;
        if databases.iter().any(|d| d == database) {
            return Ok(true);
        }
        tracing::warn!(%database, "database not found");
        reporter.error(&format!(
            "Database {} does not exist: {}",
            repr(&json!(database)),
            repr(&json!(databases))
        ));
        Ok(false)
    }
}

/// Log `identity` in, consulting `cache` first.
///
/// Returns `Ok(None)` when the server refused the credentials; the refusal has
/// already been reported.
///
/// # Errors
///
/// [`Error::PasswordRequired`] when no password is available, plus any fault
/// from `common.login`.
pub async fn authenticate(
    common: &Service,
    identity: &ServerIdentity,
    password: Option<String>,
    cache: &CredentialCache,
    prompt: Option<&dyn PasswordPrompt>,
    reporter: &dyn Reporter,
) -> Result<Option<Credential>> {
    if let Some(cached) = cache.get(identity) {
        let same_password = password.as_ref().is_none_or(|p| *p == cached.password);
        if same_password {
            tracing::debug!(%identity, uid = cached.uid, "using cached credential");
            return Ok(Some(cached));
        }
    }

    let password = match password {
        Some(password) => password,
        None => prompt
            .and_then(|p| p.prompt(identity))
            .ok_or_else(|| Error::PasswordRequired {
                identity: identity.clone(),
            })?,
    };

    let answer = common
        .call(
            "login",
            vec![json!(identity.database), json!(identity.user), json!(password)],
        )
        .await?;
    match answer.as_i64().filter(|uid| *uid != 0) {
        Some(uid) => {
            tracing::info!(%identity, uid, "logged in");
            let credential = Credential { uid, password };
            cache.insert(identity.clone(), credential.clone());
            Ok(Some(credential))
        }
        None => {
            tracing::warn!(%identity, "login refused");
            reporter.error("Invalid username or password");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_overwrites_same_identity() {
        let cache = CredentialCache::new();
        let identity = ServerIdentity::new("http://127.0.0.1:8069", "db", "usr");
        cache.insert(
            identity.clone(),
            Credential {
                uid: 1,
                password: "a".into(),
            },
        );
        cache.insert(
            identity.clone(),
            Credential {
                uid: 1,
                password: "b".into(),
            },
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&identity).unwrap().password, "b");
        assert!(cache.get(&ServerIdentity::new("http://127.0.0.1:8069", "db", "other")).is_none());
    }

    #[test]
    fn test_secrets_are_not_debug_printed() {
        let credential = Credential {
            uid: 7,
            password: "hunter2".into(),
        };
        assert!(!format!("{credential:?}").contains("hunter2"));
        let auth = Auth {
            database: "db".into(),
            uid: 7,
            password: "hunter2".into(),
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
        assert_eq!(auth.args(), vec![json!("db"), json!(7), json!("hunter2")]);
    }
}
