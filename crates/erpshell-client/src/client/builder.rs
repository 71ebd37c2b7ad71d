//! Client builder
//!
//! Provides a fluent interface for configuring a client before connecting.

use std::sync::Arc;

use crate::error::Result;
use crate::reporter::{ConsoleReporter, Reporter};
use crate::session::{CredentialCache, PasswordPrompt, Services};
use crate::transport::Transport;

use super::core::{Client, Session};

/// Builder for configuring and connecting clients
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use erpshell_client::{ClientBuilder, CredentialCache, MemoryReporter, Transport};
///
/// # async fn example(transport: Arc<dyn Transport>) -> erpshell_client::Result<()> {
/// let cache = Arc::new(CredentialCache::new());
/// let client = ClientBuilder::new()
///     .with_verbose(true)
///     .with_reporter(Arc::new(MemoryReporter::new()))
///     .with_credential_cache(Arc::clone(&cache))
///     .connect(transport, "demo", "admin", Some("admin".into()))
///     .await?;
/// assert!(client.is_logged_in());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    verbose: bool,
    reporter: Option<Arc<dyn Reporter>>,
    cache: Option<Arc<CredentialCache>>,
    prompt: Option<Arc<dyn PasswordPrompt>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo every remote call and its (truncated) result via the reporter.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Where operator-facing notices go. Defaults to [`ConsoleReporter`].
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Share logins with other clients built from the same cache.
    pub fn with_credential_cache(mut self, cache: Arc<CredentialCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ask for passwords that were not supplied and are not cached.
    pub fn with_password_prompt(mut self, prompt: Arc<dyn PasswordPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Negotiate the services without logging in.
    ///
    /// Enough for database administration (`db.*`) and for a later
    /// [`Session::login`].
    ///
    /// # Errors
    ///
    /// Faults raised by the `db.server_version` probe.
    pub async fn build(self, transport: Arc<dyn Transport>) -> Result<Client> {
        let reporter = self.reporter.unwrap_or_else(|| Arc::new(ConsoleReporter));
        let services = Services::negotiate(transport, Arc::clone(&reporter), self.verbose).await?;
        let session = Session::new(services, reporter, self.cache.unwrap_or_default(), self.prompt);
        Ok(Client::new(session))
    }

    /// Negotiate, then log in.
    ///
    /// A missing database or refused credentials are reported and leave the
    /// client connected but logged out; data calls then fail with
    /// [`Error::NotLoggedIn`](crate::Error::NotLoggedIn).
    ///
    /// # Errors
    ///
    /// Transport faults, and [`Error::PasswordRequired`](crate::Error::PasswordRequired)
    /// when no password is given, none is cached and no prompt is configured.
    pub async fn connect(
        self,
        transport: Arc<dyn Transport>,
        database: &str,
        user: &str,
        password: Option<String>,
    ) -> Result<Client> {
        let client = self.build(transport).await?;
        client.login(user, password, Some(database)).await?;
        Ok(client)
    }
}
