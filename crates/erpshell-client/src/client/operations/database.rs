//! Database administration through the `db` service

use std::time::Duration;

use serde_json::{Value, json};

use crate::client::core::Session;
use crate::error::{Error, Result};
use crate::reporter::repr;

/// Delay between two `db.get_progress` polls.
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Parameters of a new database.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDatabase {
    pub name: String,
    pub demo: bool,
    pub lang: String,
    /// Password of the initial admin user.
    pub user_password: String,
}

impl NewDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            demo: false,
            lang: "en_US".into(),
            user_password: "admin".into(),
        }
    }

    pub fn demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn user_password(mut self, password: impl Into<String>) -> Self {
        self.user_password = password.into();
        self
    }
}

impl Session {
    /// Names of the databases the server offers.
    pub async fn databases(&self) -> Result<Vec<String>> {
        self.inner.services.list_databases().await
    }

    /// Create a database, wait for it to be ready, then log into it as the
    /// first user the server reports.
    ///
    /// Progress is polled once per second; there is no deadline.
    ///
    /// # Errors
    ///
    /// Transport faults, and [`Error::UnexpectedResult`] if `db.get_progress`
    /// answers in an unknown shape.
    pub async fn create_database(&self, admin_password: &str, database: NewDatabase) -> Result<Option<i64>> {
        let db = &self.inner.services.db;
        let job = db
            .call(
                "create",
                vec![
                    json!(admin_password),
                    json!(database.name),
                    json!(database.demo),
                    json!(database.lang),
                    json!(database.user_password),
                ],
            )
            .await?;
        tracing::info!(database = %database.name, "database creation started");

        let users = loop {
            let answer = db.call("get_progress", vec![json!(admin_password), job.clone()]).await?;
            let (progress, users) = parse_progress(&answer)?;
            tracing::debug!(database = %database.name, progress, "database creation progress");
            if progress >= 1.0 {
                break users;
            }
            tokio::time::sleep(PROGRESS_POLL_INTERVAL).await;
        };

        let (login, password) = users
            .first()
            .and_then(|user| Some((user.get("login")?.as_str()?, user.get("password")?.as_str()?)))
            .ok_or_else(|| Error::unexpected("db.get_progress", "no user in the new database"))?;
        self.login(login, Some(password.to_string()), Some(&database.name)).await
    }
}

/// `[progress, [{login, password}, ...]]`
fn parse_progress(answer: &Value) -> Result<(f64, Vec<Value>)> {
    let bad = || Error::unexpected("db.get_progress", repr(answer));
    let progress = answer.get(0).and_then(Value::as_f64).ok_or_else(bad)?;
    let users = match answer.get(1) {
        Some(Value::Array(users)) => users.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(bad()),
    };
    Ok((progress, users))
}
