//! Client and session handles.
//!
//! Both are cheaply cloneable `Arc` wrappers; all clones share one connection
//! and one login.
//!
//! - [`Session`] holds the negotiated services and the current login. Every
//!   record, wizard, report and database operation is issued through it.
//! - [`Client`] adds the per-client model registry on top, so that resolving
//!   the same model name twice hands back the same [`Model`].
//!
//! Models keep a [`Session`], never a [`Client`], so the registry does not
//! form a reference cycle with the handles it stores.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::reporter::Reporter;
use crate::service::{ProtocolGeneration, Service};
use crate::session::{self, Auth, CredentialCache, PasswordPrompt, ServerIdentity, Services};

/// State shared by every clone of a [`Session`].
pub(crate) struct SessionInner {
    pub(crate) services: Services,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) cache: Arc<CredentialCache>,
    pub(crate) prompt: Option<Arc<dyn PasswordPrompt>>,
    /// Current login; `None` until a login succeeds.
    pub(crate) login: RwLock<Option<(ServerIdentity, Auth)>>,
}

/// Negotiated services plus the current login.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    pub(crate) fn new(
        services: Services,
        reporter: Arc<dyn Reporter>,
        cache: Arc<CredentialCache>,
        prompt: Option<Arc<dyn PasswordPrompt>>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                services,
                reporter,
                cache,
                prompt,
                login: RwLock::new(None),
            }),
        }
    }

    /// Server address as reported by the transport.
    pub fn server(&self) -> &str {
        self.inner.services.db.server()
    }

    pub fn server_version(&self) -> &str {
        &self.inner.services.server_version
    }

    pub fn generation(&self) -> ProtocolGeneration {
        self.inner.services.generation
    }

    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    /// Look up one of the five services by name.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] for any other name.
    pub fn service(&self, name: &str) -> Result<&Service> {
        self.inner.services.get(name)
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.inner.reporter.as_ref()
    }

    pub fn credential_cache(&self) -> &Arc<CredentialCache> {
        &self.inner.cache
    }

    /// Who is logged in, if anyone.
    pub fn identity(&self) -> Option<ServerIdentity> {
        self.inner.login.read().as_ref().map(|(identity, _)| identity.clone())
    }

    pub fn uid(&self) -> Option<i64> {
        self.inner.login.read().as_ref().map(|(_, auth)| auth.uid)
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner.login.read().is_some()
    }

    /// Authentication triple for data calls.
    ///
    /// # Errors
    ///
    /// [`Error::NotLoggedIn`] before a successful login.
    pub(crate) fn auth(&self) -> Result<Auth> {
        self.inner
            .login
            .read()
            .as_ref()
            .map(|(_, auth)| auth.clone())
            .ok_or(Error::NotLoggedIn)
    }

    /// Log in as `user`, on `database` or on the current database.
    ///
    /// The database is checked against `db.list` first; when it is missing
    /// the condition is reported and no login is attempted. A cached
    /// credential for the same identity is reused without any network call
    /// unless a different password is given. On success the session switches
    /// to the new login; on refusal it keeps whatever login it had.
    ///
    /// Returns the uid, or `None` when the login did not happen.
    ///
    /// # Errors
    ///
    /// [`Error::Assertion`] when no database is given and none is current,
    /// [`Error::PasswordRequired`] when no password can be obtained, and
    /// transport faults.
    pub async fn login(&self, user: &str, password: Option<String>, database: Option<&str>) -> Result<Option<i64>> {
        let database = match database {
            Some(database) => database.to_string(),
            None => self
                .identity()
                .map(|identity| identity.database)
                .ok_or_else(|| Error::Assertion("no database selected".into()))?,
        };

        let services = &self.inner.services;
        if !services.check_database(&database, self.reporter()).await? {
            return Ok(None);
        }

        let identity = ServerIdentity::new(self.server(), database, user);
        let credential = session::authenticate(
            &services.common,
            &identity,
            password,
            &self.inner.cache,
            self.inner.prompt.as_deref(),
            self.reporter(),
        )
        .await?;

        Ok(credential.map(|credential| {
            let auth = Auth {
                database: identity.database.clone(),
                uid: credential.uid,
                password: credential.password,
            };
            *self.inner.login.write() = Some((identity, auth));
            credential.uid
        }))
    }

    /// `object.execute(db, uid, password, model, method, *args)`.
    pub(crate) async fn object_execute(&self, model: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        self.authenticated_call(&self.inner.services.object, "execute", [model, method], args)
            .await
    }

    /// Call `service.method` with the authentication triple, then `leading`,
    /// then `args`.
    pub(crate) async fn authenticated_call<const N: usize>(
        &self,
        service: &Service,
        method: &str,
        leading: [&str; N],
        args: Vec<Value>,
    ) -> Result<Value> {
        let bound = service.method(method)?;
        let mut params = self.auth()?.args();
        params.extend(leading.iter().map(|s| Value::String((*s).to_string())));
        params.extend(args);
        bound.call(params).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("server", &self.server())
            .field("generation", &self.generation())
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

/// Connected client: a [`Session`] plus the memo of resolved models.
///
/// All [`Session`] operations are available through `Deref`.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use erpshell_client::{ClientBuilder, SearchOptions, Transport};
///
/// # async fn example(transport: Arc<dyn Transport>) -> erpshell_client::Result<()> {
/// let client = ClientBuilder::new()
///     .connect(transport, "demo", "admin", Some("admin".into()))
///     .await?;
///
/// let ids = client
///     .search("res.partner", vec!["name like Agrolait"], SearchOptions::new().limit(5))
///     .await?;
/// if let Some(users) = client.model("res.users").await? {
///     println!("{} users", users.count(Vec::<&str>::new(), SearchOptions::new()).await?);
/// }
/// # let _ = ids;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) session: Session,
    pub(crate) registry: Arc<Mutex<HashMap<String, Arc<Model>>>>,
}

impl Client {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Deref for Client {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .field("models", &self.registry.lock().len())
            .finish()
    }
}
