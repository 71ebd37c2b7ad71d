//! CLI argument parsing

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;

use erpshell_client::SearchOptions;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "erpshell",
    version,
    about = "Command-line client for OpenERP-style business servers",
    long_about = "erpshell talks to an OpenERP-style server over JSON-RPC.\n\
                  Records are searched with loose text terms (\"name like Agro\", \"active = True\"),\n\
                  any model method can be called by name, and modules can be installed,\n\
                  upgraded or uninstalled in one step.\n\n\
                  Connection settings come from a profile of erpshell.ini (--env) and/or\n\
                  the --server, --db, --user and --password flags."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub connection: Connection,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Echo every remote call and its result
    #[arg(long, global = true)]
    pub verbose_rpc: bool,
}

/// Where and as whom to connect
#[derive(Args, Debug, Clone, Default)]
pub struct Connection {
    /// Configuration file (default: ./erpshell.ini, then the user config directory)
    #[arg(long, global = true, env = "ERPSHELL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile (section) of the configuration file
    #[arg(long, short = 'e', global = true, env = "ERPSHELL_ENV")]
    pub env: Option<String>,

    /// Server address, e.g. http://localhost:8069
    #[arg(long, short = 's', global = true, env = "ERPSHELL_SERVER")]
    pub server: Option<String>,

    /// Database name
    #[arg(long = "db", short = 'd', global = true, env = "ERPSHELL_DB")]
    pub database: Option<String>,

    /// User name
    #[arg(long, short = 'u', global = true, env = "ERPSHELL_USER")]
    pub user: Option<String>,

    /// Password (prompted for when neither given nor configured)
    #[arg(long, global = true, env = "ERPSHELL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Human,
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    Compact,
    /// Tables for record lists
    Table,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the server version and protocol generation
    Version,

    /// List the databases of the server
    Databases,

    /// Create a database and log into it
    CreateDb(CreateDbArgs),

    /// Search record ids
    Search {
        /// Model name, e.g. res.partner
        model: String,

        /// Domain terms, e.g. "name like Agro" "active = True"
        terms: Vec<String>,

        #[command(flatten)]
        paging: Paging,
    },

    /// Count matching records
    Count {
        /// Model name
        model: String,

        /// Domain terms
        terms: Vec<String>,
    },

    /// Read records by ids or by domain terms
    Read {
        /// Model name
        model: String,

        /// Record ids, or domain terms
        selector: Vec<String>,

        /// Field names separated by spaces, or a template such as "%(name)s <%(email)s>"
        #[arg(long, short = 'F')]
        fields: Option<String>,

        #[command(flatten)]
        paging: Paging,
    },

    /// Call any operation or model method by name
    Call {
        /// Operation (search, read, wizard, ...), model method, or Model attribute
        name: String,

        /// Positional arguments as JSON; anything that is not JSON is a string
        args: Vec<String>,

        /// Keyword argument as key=JSON (repeatable)
        #[arg(long = "kw", short = 'k', value_parser = parse_kwarg)]
        kwargs: Vec<(String, Value)>,
    },

    /// List models whose name is like PATTERN
    Models {
        /// Name pattern
        #[arg(default_value = "")]
        pattern: String,
    },

    /// Show field definitions of a model
    Fields {
        /// Model name
        model: String,

        /// Only this field
        field: Option<String>,
    },

    /// List field names of a model
    Keys {
        /// Model name
        model: String,
    },

    /// List modules by state
    Modules {
        /// Name pattern
        #[arg(default_value = "")]
        pattern: String,

        /// Only installed modules
        #[arg(long, conflicts_with = "uninstalled")]
        installed: bool,

        /// Only modules that are not installed
        #[arg(long)]
        uninstalled: bool,
    },

    /// Install modules
    Install {
        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Upgrade modules
    Upgrade {
        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Uninstall modules
    Uninstall {
        #[arg(required = true)]
        modules: Vec<String>,
    },
}

/// `create-db` arguments
#[derive(Args, Debug, Clone)]
pub struct CreateDbArgs {
    /// Name of the new database
    pub name: String,

    /// Server administration password (prompted for when absent)
    #[arg(long, env = "ERPSHELL_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Load demonstration data
    #[arg(long)]
    pub demo: bool,

    /// Language of the new database
    #[arg(long, default_value = "en_US")]
    pub lang: String,

    /// Password of the new admin user
    #[arg(long, default_value = "admin")]
    pub user_password: String,
}

/// Search window options
#[derive(Args, Debug, Clone, Default)]
pub struct Paging {
    /// Skip this many records
    #[arg(long)]
    pub offset: Option<i64>,

    /// Return at most this many records
    #[arg(long)]
    pub limit: Option<i64>,

    /// Sort specification, e.g. "name desc"
    #[arg(long)]
    pub order: Option<String>,
}

impl Paging {
    pub fn to_options(&self) -> SearchOptions {
        let mut options = SearchOptions::new();
        if let Some(offset) = self.offset {
            options = options.offset(offset);
        }
        if let Some(limit) = self.limit {
            options = options.limit(limit);
        }
        if let Some(order) = &self.order {
            options = options.order(order.clone());
        }
        options
    }
}

/// Positional argument of `call`: JSON when it parses, a string otherwise.
pub fn parse_json_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// `key=JSON` keyword argument.
pub fn parse_kwarg(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), parse_json_arg(value)))
}
