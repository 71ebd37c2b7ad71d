//! Remote service proxy.
//!
//! A server exposes a handful of named services (`db`, `common`, `object`,
//! `wizard`, `report`), each with a fixed set of methods that depends on the
//! server's protocol generation. A [`Service`] carries that allow-list: looking
//! up a name it does not advertise fails locally with
//! [`Error::MissingAttribute`], so typos never cost a round-trip.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use erpshell_client::{ConsoleReporter, ProtocolGeneration, Service, Transport};
//! # use serde_json::json;
//! # async fn example(transport: Arc<dyn Transport>) -> erpshell_client::Result<()> {
//! let db = Service::for_generation("db", ProtocolGeneration::Modern, transport, Arc::new(ConsoleReporter));
//! let databases = db.method("list")?.call(vec![]).await?;
//! assert!(db.method("lsit").is_err());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::reporter::{Reporter, repr};
use crate::transport::Transport;

/// The two incompatible server API shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolGeneration {
    /// Servers before 6.1: no `execute_kw`, no `create_database`/`db_exist`,
    /// module upgrades finalised through the `module.upgrade` wizard.
    Legacy,
    /// Servers from 6.1 on.
    Modern,
}

impl ProtocolGeneration {
    /// Classify a `db.server_version` string such as `"5.0.16"` or `"6.1-1"`.
    ///
    /// Anything that does not start with a readable `major.minor` is treated
    /// as modern.
    pub fn from_server_version(version: &str) -> Self {
        let mut parts = version
            .split(|c: char| !c.is_ascii_digit())
            .map(|p| p.parse::<u32>().ok());
        match (parts.next().flatten(), parts.next().flatten()) {
            (Some(major), minor) if (major, minor.unwrap_or(0)) < (6, 1) => Self::Legacy,
            _ => Self::Modern,
        }
    }

    pub fn is_legacy(self) -> bool {
        self == Self::Legacy
    }
}

impl fmt::Display for ProtocolGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy (< 6.1)"),
            Self::Modern => write!(f, "modern (>= 6.1)"),
        }
    }
}

/// Service names negotiated at bootstrap, in construction order.
pub const SERVICE_NAMES: [&str; 5] = ["db", "common", "object", "wizard", "report"];

const DB_METHODS: &[&str] = &[
    "create",
    "drop",
    "dump",
    "restore",
    "rename",
    "list",
    "list_lang",
    "change_admin_password",
    "server_version",
    "migrate_databases",
    "get_progress",
];
const COMMON_METHODS: &[&str] = &[
    "about",
    "login",
    "timezone_get",
    "get_server_environment",
    "login_message",
    "check_connectivity",
];
const OBJECT_METHODS: &[&str] = &["execute", "exec_workflow"];
const WIZARD_METHODS: &[&str] = &["execute", "create"];
const REPORT_METHODS: &[&str] = &["report", "report_get"];

const DB_METHODS_6_1: &[&str] = &["create_database", "db_exist"];
const COMMON_METHODS_6_1: &[&str] = &[
    "get_stats",
    "list_http_services",
    "version",
    "authenticate",
    "get_os_time",
    "get_sqlcount",
];
const OBJECT_METHODS_6_1: &[&str] = &["execute_kw"];
const REPORT_METHODS_6_1: &[&str] = &["render_report"];

/// Methods a service advertises on a given generation. Unknown services
/// advertise nothing.
pub fn methods_for(service: &str, generation: ProtocolGeneration) -> Vec<&'static str> {
    let (base, modern): (&[&str], &[&str]) = match service {
        "db" => (DB_METHODS, DB_METHODS_6_1),
        "common" => (COMMON_METHODS, COMMON_METHODS_6_1),
        "object" => (OBJECT_METHODS, OBJECT_METHODS_6_1),
        "wizard" => (WIZARD_METHODS, &[]),
        "report" => (REPORT_METHODS, REPORT_METHODS_6_1),
        _ => (&[], &[]),
    };
    let mut methods = base.to_vec();
    if generation == ProtocolGeneration::Modern {
        methods.extend_from_slice(modern);
    }
    methods
}

/// A named service with its fixed method allow-list.
#[derive(Clone)]
pub struct Service {
    server: String,
    name: String,
    methods: Arc<[String]>,
    verbose: bool,
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn Reporter>,
}

impl Service {
    pub fn new<I, S>(
        name: impl Into<String>,
        methods: I,
        verbose: bool,
        transport: Arc<dyn Transport>,
        reporter: Arc<dyn Reporter>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            server: transport.endpoint(),
            name: name.into(),
            methods: methods.into_iter().map(Into::into).collect(),
            verbose,
            transport,
            reporter,
        }
    }

    /// Service with the standard method set for `generation`.
    pub fn for_generation(
        name: &str,
        generation: ProtocolGeneration,
        transport: Arc<dyn Transport>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self::new(name, methods_for(name, generation), false, transport, reporter)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m == name)
    }

    /// Look up an advertised method.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] when `name` is not in the allow-list.
    pub fn method(&self, name: &str) -> Result<BoundMethod<'_>> {
        if !self.has_method(name) {
            return Err(Error::missing_attribute(self.to_string(), name));
        }
        Ok(BoundMethod {
            service: self,
            method: name.to_string(),
        })
    }

    /// Shorthand for `self.method(name)?.call(args)`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingAttribute`] for unknown methods, [`Error::Transport`]
    /// for anything the call itself raised.
    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.method(name)?.call(args).await
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Service '{}#{}'>", self.server, self.name)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("server", &self.server)
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

/// A method looked up on a [`Service`], ready to be called.
#[derive(Debug)]
pub struct BoundMethod<'a> {
    service: &'a Service,
    method: String,
}

/// Longest result echo printed in verbose mode.
const VERBOSE_MAX_LEN: usize = 300;

impl BoundMethod<'_> {
    pub fn name(&self) -> &str {
        &self.method
    }

    /// Issue exactly one remote call. Faults are returned as they came.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] for connection or server faults.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        let service = self.service;
        tracing::debug!(service = %service.name, method = %self.method, args = args.len(), "rpc call");
        if service.verbose {
            let rendered: Vec<String> = args.iter().map(repr).collect();
            service.reporter.notice(&format!(
                "--> {}.{}({})",
                service.name,
                self.method,
                rendered.join(", ")
            ));
        }

        let result = service.transport.request(&service.name, &self.method, args).await;

        match &result {
            Ok(value) if service.verbose => {
                let mut echo = repr(value);
                if echo.len() > VERBOSE_MAX_LEN {
                    let cut = (0..=VERBOSE_MAX_LEN).rev().find(|&i| echo.is_char_boundary(i)).unwrap_or(0);
                    echo.truncate(cut);
                    echo.push_str("...");
                }
                service.reporter.notice(&format!("<-- {echo}"));
            }
            Err(e) => tracing::debug!(service = %service.name, method = %self.method, error = %e, "rpc fault"),
            _ => {}
        }
        Ok(result?)
    }
}

impl fmt::Display for BoundMethod<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Method '{}#{}.{}'>", self.service.server, self.service.name, self.method)
    }
}
