//! Client operations
//!
//! Each module adds an `impl` block for one family of operations:
//!
//! - `records`: search, count, read, write, create, copy, unlink and
//!   generic `execute` on `object`
//! - `models`: model resolution, memoized handles, field introspection
//! - `modules`: module listing and the install / upgrade / uninstall dispatcher
//! - `wizards`: wizard and report services
//! - `database`: database listing and creation

pub mod database;
pub mod models;
pub mod modules;
pub mod records;
pub mod wizards;
