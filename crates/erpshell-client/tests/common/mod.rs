//! Recording transport shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use erpshell_client::{
    Client, ClientBuilder, CredentialCache, MemoryReporter, Transport, TransportError, TransportResult,
};

pub const SERVER: &str = "http://127.0.0.1:8069";
pub const DATABASE: &str = "database";
pub const USER: &str = "user";
pub const PASSWORD: &str = "passwd";
pub const UID: i64 = 1;

/// One recorded call: service, method, positional arguments.
pub type Call = (String, String, Vec<Value>);

type Responder = dyn Fn(&str, &str, &[Value]) -> Option<Value> + Send + Sync;

/// Transport that records every request and answers from scripted queues.
///
/// Lookup order for an answer: the queue for `service.method`, then the
/// responder closure, then `true`.
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    queues: Mutex<HashMap<String, VecDeque<TransportResult<Value>>>>,
    responder: Mutex<Option<Box<Responder>>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport").field("calls", &self.calls.lock().len()).finish()
    }
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue answers for `service.method`, consumed in order.
    pub fn push(&self, key: &str, answers: impl IntoIterator<Item = Value>) {
        self.queues
            .lock()
            .entry(key.to_string())
            .or_default()
            .extend(answers.into_iter().map(Ok));
    }

    pub fn push_error(&self, key: &str, error: TransportError) {
        self.queues.lock().entry(key.to_string()).or_default().push_back(Err(error));
    }

    pub fn respond_with(&self, responder: impl Fn(&str, &str, &[Value]) -> Option<Value> + Send + Sync + 'static) {
        *self.responder.lock() = Some(Box::new(responder));
    }

    /// Drain the recorded calls.
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, service: &str, method: &str, args: Vec<Value>) -> TransportResult<Value> {
        self.calls.lock().push((service.to_string(), method.to_string(), args.clone()));
        let key = format!("{service}.{method}");
        if let Some(answer) = self.queues.lock().get_mut(&key).and_then(VecDeque::pop_front) {
            return answer;
        }
        if let Some(responder) = self.responder.lock().as_ref() {
            if let Some(answer) = responder(service, method, &args) {
                return Ok(answer);
            }
        }
        Ok(json!(true))
    }

    fn endpoint(&self) -> String {
        SERVER.to_string()
    }
}

/// Expected call on `service.method`.
pub fn call(service: &str, method: &str, args: Vec<Value>) -> Call {
    (service.to_string(), method.to_string(), args)
}

/// Authentication triple of the logged-in test user.
pub fn auth() -> Vec<Value> {
    vec![json!(DATABASE), json!(UID), json!(PASSWORD)]
}

/// Expected `object.execute(AUTH, model, method, *args)`.
pub fn obj(model: &str, method: &str, args: Vec<Value>) -> Call {
    let mut params = auth();
    params.push(json!(model));
    params.push(json!(method));
    params.extend(args);
    call("object", "execute", params)
}

/// Expected authenticated call on another service.
pub fn authed(service: &str, method: &str, args: Vec<Value>) -> Call {
    let mut params = auth();
    params.extend(args);
    call(service, method, params)
}

/// The calls every bootstrap makes before logging in.
pub fn startup_calls() -> Vec<Call> {
    vec![call("db", "server_version", vec![]), call("db", "list", vec![])]
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub reporter: MemoryReporter,
    pub client: Client,
}

/// A client logged in as the test user on a server of `version`, with the
/// bootstrap calls already drained.
pub async fn connected(version: &str) -> Harness {
    let transport = MockTransport::new();
    transport.push("db.server_version", [json!(version)]);
    transport.push("db.list", [json!([DATABASE])]);
    transport.push("common.login", [json!(UID)]);
    let reporter = MemoryReporter::new();
    let client = ClientBuilder::new()
        .with_reporter(Arc::new(reporter.clone()))
        .with_credential_cache(Arc::new(CredentialCache::new()))
        .connect(transport.clone(), DATABASE, USER, Some(PASSWORD.into()))
        .await
        .expect("connect");
    assert!(client.is_logged_in());
    transport.take_calls();
    Harness {
        transport,
        reporter,
        client,
    }
}
