//! # erpshell client
//!
//! Schema-less client for OpenERP-style business servers. Any method of any
//! model can be called without a local description of the model: arguments
//! and results are plain JSON values.
//!
//! ## Layers
//!
//! ```text
//! Client / Model          record operations, model handles, module actions
//!        ↓
//! Session                 protocol generation, login, credential cache
//!        ↓
//! Service / BoundMethod   per-generation method allow-lists
//!        ↓
//! Transport               request(service, method, args) -> value
//! ```
//!
//! The transport is a trait; `erpshell-http` provides a JSON-RPC one.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use erpshell_client::{ClientBuilder, SearchOptions, Transport};
//!
//! # async fn example(transport: Arc<dyn Transport>) -> erpshell_client::Result<()> {
//! let client = ClientBuilder::new()
//!     .connect(transport, "demo", "admin", Some("admin".into()))
//!     .await?;
//!
//! // loose text terms are compiled to (field, operator, value) triples
//! let names = client
//!     .read("res.partner", vec!["name like Agro", "active = True"], "%(name)s", SearchOptions::new())
//!     .await?;
//! println!("{names}");
//!
//! client.upgrade(&["sale"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Protocol generations
//!
//! Servers before 6.1 lack `execute_kw`, `render_report` and the
//! database-creation helpers, and finalise module changes through a wizard.
//! The generation is detected once from `db.server_version` and every
//! service is built with the matching method set, so calling a method the
//! server does not have fails locally with [`Error::MissingAttribute`].

pub mod client;
pub mod domain;
pub mod error;
pub mod model;
pub mod reporter;
pub mod service;
pub mod session;
pub mod transport;

pub use client::{
    Client, ClientBuilder, FieldSpec, Kwargs, ModuleAction, NewDatabase, OPERATIONS, PendingModule, SearchOptions,
    Selector, Session, WizardRef,
};
pub use domain::{Domain, DomainInput, DomainTerm, Operator, TermInput};
pub use error::{Error, Result};
pub use model::{Model, attribute_name, model_name_from_attribute};
pub use reporter::{ConsoleReporter, Level, MemoryReporter, Reporter, repr};
pub use service::{BoundMethod, ProtocolGeneration, SERVICE_NAMES, Service, methods_for};
pub use session::{Auth, Credential, CredentialCache, PasswordPrompt, ServerIdentity, Services};
pub use transport::{Transport, TransportError, TransportResult};
