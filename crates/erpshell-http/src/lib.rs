//! # erpshell HTTP transport
//!
//! JSON-RPC client transport for OpenERP-style servers. Every call is one
//! `POST <server>/jsonrpc` carrying
//!
//! ```text
//! {"jsonrpc": "2.0", "method": "call",
//!  "params": {"service": "object", "method": "execute", "args": [...]},
//!  "id": 1}
//! ```
//!
//! and the answer's `result` is handed back untouched. Server faults in the
//! `error` member become [`TransportError::Fault`]; nothing is retried.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use erpshell_client::ClientBuilder;
//! use erpshell_http::{HttpTransportConfig, JsonRpcTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = JsonRpcTransport::new(HttpTransportConfig {
//!     server: "http://localhost:8069".to_string(),
//!     timeout: Duration::from_secs(60),
//!     ..Default::default()
//! })?;
//! let client = ClientBuilder::new()
//!     .connect(Arc::new(transport), "demo", "admin", Some("admin".into()))
//!     .await?;
//! println!("{}", client.server_version());
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub, clippy::all)]
#![deny(unsafe_code)]

mod transport;

pub use transport::{HttpTransportConfig, JsonRpcTransport, normalize_server};

pub use erpshell_client::{Transport, TransportError, TransportResult};
