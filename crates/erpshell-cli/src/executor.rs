//! Command execution using erpshell-client

use std::sync::Arc;

use serde_json::{Value, json};

use erpshell_client::{Client, ClientBuilder, DomainInput, FieldSpec, Kwargs, NewDatabase, Selector, Transport};
use erpshell_http::JsonRpcTransport;

use crate::cli::{Commands, Connection, CreateDbArgs, OutputFormat, parse_json_arg};
use crate::config::{Profile, resolve_connection};
use crate::error::{CliError, CliResult};
use crate::formatter::{Formatter, TerminalReporter};
use crate::prompt::TerminalPrompt;

/// Execute CLI commands
#[derive(Debug)]
pub struct CommandExecutor {
    pub formatter: Formatter,
    colored: bool,
    verbose_rpc: bool,
}

impl CommandExecutor {
    pub fn new(format: OutputFormat, colored: bool, verbose_rpc: bool) -> Self {
        Self {
            formatter: Formatter::new(format, colored),
            colored,
            verbose_rpc,
        }
    }

    /// Display an error with rich formatting
    pub fn display_error(&self, error: &CliError) {
        self.formatter.display_error(error);
    }

    /// Execute a command
    ///
    /// # Errors
    ///
    /// Configuration, connection and login failures, then whatever the
    /// operation reports.
    pub async fn execute(&self, command: Commands, connection: &Connection) -> CliResult<()> {
        let profile = resolve_connection(connection)?;
        tracing::debug!(server = %profile.server, database = ?profile.database, user = %profile.user, "resolved connection");

        match command {
            Commands::Version => {
                let client = self.anonymous(&profile).await?;
                self.formatter.display_info(
                    "Server",
                    &[
                        ("server", client.server().to_string()),
                        ("version", client.server_version().to_string()),
                        ("protocol", client.generation().to_string()),
                    ],
                )
            }
            Commands::Databases => {
                let client = self.anonymous(&profile).await?;
                let databases = client.databases().await?;
                self.formatter.display_names("databases", &databases)
            }
            Commands::CreateDb(args) => self.create_database(&profile, args).await,
            command => {
                let client = self.logged_in(&profile).await?;
                self.execute_on(&client, command).await
            }
        }
    }

    /// Run a record or module command on a logged-in client.
    ///
    /// # Errors
    ///
    /// Whatever the operation reports.
    pub async fn execute_on(&self, client: &Client, command: Commands) -> CliResult<()> {
        match command {
            Commands::Search { model, terms, paging } => {
                let ids = client.search(&model, terms, paging.to_options()).await?;
                self.formatter.display(&ids)
            }
            Commands::Count { model, terms } => {
                let count = client.count(&model, terms, Default::default()).await?;
                self.formatter.display(&json!(count))
            }
            Commands::Read {
                model,
                selector,
                fields,
                paging,
            } => {
                let records = client
                    .read(
                        &model,
                        selector_from_args(selector),
                        FieldSpec::from(fields.as_deref()),
                        paging.to_options(),
                    )
                    .await?;
                self.formatter.display(&records)
            }
            Commands::Call { name, args, kwargs } => {
                let args = args.iter().map(|a| parse_json_arg(a)).collect();
                let kwargs: Kwargs = kwargs.into_iter().collect();
                let result = client.call(&name, args, kwargs).await?;
                self.formatter.display(&result)
            }
            Commands::Models { pattern } => {
                let models = client.models(&pattern).await?;
                self.formatter.display_names("models", &models)
            }
            Commands::Keys { model } => {
                let keys = client.keys(&model).await?.unwrap_or_default();
                self.formatter.display_names("fields", &keys)
            }
            Commands::Fields { model, field: Some(field) } => {
                let definition = client.field(&model, &field).await?.unwrap_or(Value::Null);
                self.formatter.display(&definition)
            }
            Commands::Fields { model, field: None } => {
                let fields = client.fields(&model).await?.unwrap_or_default();
                self.formatter.display(&Value::Object(fields))
            }
            Commands::Modules {
                pattern,
                installed,
                uninstalled,
            } => {
                let filter = match (installed, uninstalled) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                let modules = client.modules(&pattern, filter).await?;
                self.formatter.display_modules(&modules)
            }
            Commands::Install { modules } => Ok(client.install(&as_strs(&modules)).await?),
            Commands::Upgrade { modules } => Ok(client.upgrade(&as_strs(&modules)).await?),
            Commands::Uninstall { modules } => Ok(client.uninstall(&as_strs(&modules)).await?),
            Commands::Version | Commands::Databases | Commands::CreateDb(_) => Err(CliError::InvalidArguments(
                "this command does not run on a logged-in session".into(),
            )),
        }
    }

    async fn create_database(&self, profile: &Profile, args: CreateDbArgs) -> CliResult<()> {
        let admin_password = args
            .admin_password
            .or_else(|| TerminalPrompt::ask("Server admin password"))
            .ok_or_else(|| CliError::InvalidArguments("the server admin password is required (--admin-password)".into()))?;
        let client = self.anonymous(profile).await?;
        let database = NewDatabase::new(&args.name)
            .demo(args.demo)
            .lang(args.lang)
            .user_password(args.user_password);
        let uid = client.create_database(&admin_password, database).await?;
        let identity = client.identity();
        match (uid, identity) {
            (Some(uid), Some(identity)) => self.formatter.display_info(
                "Database created",
                &[
                    ("database", identity.database),
                    ("user", identity.user),
                    ("uid", uid.to_string()),
                ],
            ),
            _ => Err(CliError::LoginFailed {
                user: "admin".into(),
                database: args.name,
            }),
        }
    }

    fn builder(&self) -> ClientBuilder {
        ClientBuilder::new()
            .with_verbose(self.verbose_rpc)
            .with_reporter(Arc::new(TerminalReporter::new(self.colored)))
            .with_password_prompt(Arc::new(TerminalPrompt))
    }

    fn transport(profile: &Profile) -> CliResult<Arc<dyn Transport>> {
        Ok(Arc::new(JsonRpcTransport::connect(&profile.server)?))
    }

    /// A client that has not logged in, for server-level commands.
    async fn anonymous(&self, profile: &Profile) -> CliResult<Client> {
        Ok(self.builder().build(Self::transport(profile)?).await?)
    }

    async fn logged_in(&self, profile: &Profile) -> CliResult<Client> {
        let database = profile.database.as_deref().ok_or(CliError::NoDatabase)?;
        let client = self
            .builder()
            .connect(Self::transport(profile)?, database, &profile.user, profile.password.clone())
            .await?;
        if !client.is_logged_in() {
            return Err(CliError::LoginFailed {
                user: profile.user.clone(),
                database: database.to_string(),
            });
        }
        Ok(client)
    }
}

fn as_strs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}

/// Integers are record ids (one id stays a scalar), anything else is a domain.
pub fn selector_from_args(args: Vec<String>) -> Selector {
    let ids: Option<Vec<i64>> = args.iter().map(|a| a.trim().parse().ok()).collect();
    match ids {
        Some(ids) if ids.len() == 1 => Selector::Ids(json!(ids[0])),
        Some(ids) if !ids.is_empty() => Selector::Ids(json!(ids)),
        _ => Selector::Domain(DomainInput::from(args)),
    }
}
