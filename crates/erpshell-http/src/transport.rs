//! JSON-RPC over HTTP client transport

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use erpshell_client::{Transport, TransportError, TransportResult};

/// Path of the JSON-RPC dispatcher on the server.
const JSONRPC_PATH: &str = "jsonrpc";

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Server address, e.g. `http://localhost:8069`. A missing scheme means
    /// `http`.
    pub server: String,

    /// Deadline for one request, response body included
    pub timeout: Duration,

    /// User agent string (None disables the header)
    pub user_agent: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            server: "http://localhost:8069".to_string(),
            timeout: Duration::from_secs(120),
            user_agent: Some(format!("erpshell/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: RpcParams<'a>,
    id: u64,
}

#[derive(Debug, Serialize)]
struct RpcParams<'a> {
    service: &'a str,
    method: &'a str,
    args: &'a [Value],
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcFault>,
}

#[derive(Debug, Deserialize)]
struct RpcFault {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcFaultData>,
}

#[derive(Debug, Deserialize)]
struct RpcFaultData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<RpcFault> for TransportError {
    /// Prefer the server-side exception name and message over the generic
    /// envelope ("Odoo Server Error", code 200).
    fn from(fault: RpcFault) -> Self {
        let data = fault.data.unwrap_or(RpcFaultData {
            name: None,
            message: None,
        });
        let code = data.name.unwrap_or_else(|| match fault.code {
            Value::String(code) => code,
            Value::Null => String::new(),
            other => other.to_string(),
        });
        let message = data.message.filter(|m| !m.is_empty()).unwrap_or(fault.message);
        TransportError::Fault { code, message }
    }
}

/// Canonical form of a server address: scheme present, no trailing slash.
pub fn normalize_server(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        server.to_string()
    } else {
        format!("http://{server}")
    }
}

fn map_request_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_decode() || error.is_body() {
        TransportError::Protocol(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}

/// JSON-RPC client transport
pub struct JsonRpcTransport {
    server: String,
    endpoint_url: Url,
    http_client: HttpClient,
    next_id: AtomicU64,
}

impl std::fmt::Debug for JsonRpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcTransport")
            .field("endpoint", &self.endpoint_url.as_str())
            .finish_non_exhaustive()
    }
}

impl JsonRpcTransport {
    /// Create a transport for `config.server`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Connection`] if the address is not a valid URL or
    /// the HTTP client cannot be built.
    pub fn new(config: HttpTransportConfig) -> TransportResult<Self> {
        let server = normalize_server(&config.server);
        let endpoint_url = Url::parse(&format!("{server}/"))
            .and_then(|base| base.join(JSONRPC_PATH))
            .map_err(|e| TransportError::Connection(format!("invalid server address '{server}': {e}")))?;

        let mut client_builder = HttpClient::builder().timeout(config.timeout).gzip(true);
        if let Some(ref user_agent) = config.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        }
        let http_client = client_builder
            .build()
            .map_err(|e| TransportError::Connection(format!("cannot build HTTP client: {e}")))?;

        debug!(endpoint = %endpoint_url, "JSON-RPC transport ready");
        Ok(Self {
            server,
            endpoint_url,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Transport for `server` with default settings.
    ///
    /// # Errors
    ///
    /// See [`JsonRpcTransport::new`].
    pub fn connect(server: &str) -> TransportResult<Self> {
        Self::new(HttpTransportConfig {
            server: server.to_string(),
            ..Default::default()
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint_url(&self) -> &Url {
        &self.endpoint_url
    }
}

#[async_trait]
impl Transport for JsonRpcTransport {
    async fn request(&self, service: &str, method: &str, args: Vec<Value>) -> TransportResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            method: "call",
            params: RpcParams {
                service,
                method,
                args: &args,
            },
            id,
        };
        debug!(id, service, method, args = args.len(), "sending JSON-RPC request");

        let response = self
            .http_client
            .post(self.endpoint_url.clone())
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, service, method, "JSON-RPC request rejected");
            return Err(TransportError::Connection(format!("POST {} failed: {status}", self.endpoint_url)));
        }

        let bytes = response.bytes().await.map_err(|e| map_request_error(&e))?;
        trace!(id, size = bytes.len(), "JSON-RPC response received");
        let reply: RpcResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Protocol(format!("invalid JSON-RPC response: {e}")))?;

        match reply {
            RpcResponse { error: Some(fault), .. } => {
                let error = TransportError::from(fault);
                debug!(id, %error, "JSON-RPC fault");
                Err(error)
            }
            RpcResponse { result: Some(result), .. } => Ok(result),
            // a method returning None comes back as `"result": null`
            RpcResponse { result: None, .. } => Ok(Value::Null),
        }
    }

    fn endpoint(&self) -> String {
        self.server.clone()
    }
}
