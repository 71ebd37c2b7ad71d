//! Client implementation
//!
//! - `core`: [`Session`] and [`Client`], the shared connection state
//! - `builder`: [`ClientBuilder`] for construction and login
//! - `options`: argument shapes of the record operations
//! - `operations`: the operations themselves, one module per family
//! - `dispatch`: calling operations by name with untyped arguments

pub mod builder;
pub mod core;
pub mod dispatch;
pub mod operations;
pub mod options;

pub use builder::ClientBuilder;
pub use self::core::{Client, Session};
pub use dispatch::OPERATIONS;
pub use operations::database::NewDatabase;
pub use operations::modules::{ModuleAction, PendingModule};
pub use operations::wizards::WizardRef;
pub use options::{FieldSpec, Kwargs, SearchOptions, Selector};
