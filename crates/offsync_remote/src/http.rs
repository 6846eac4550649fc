//! HTTP remote.
//!
//! The actual HTTP client is abstracted via [`HttpClient`] so the same
//! remote runs over `reqwest` in production and over an in-process
//! [`LoopbackClient`] in tests.

use crate::error::{RemoteError, RemoteResult};
use crate::protocol::{
    decode, encode, ErrorBody, FetchRequest, FetchResponse, HealthResponse, UpsertRequest,
    UpsertResponse, FETCH_PATH, HEALTH_PATH, UPSERT_PATH,
};
use crate::store::RemoteStore;
use offsync_core::{Record, RecordId, Table};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }
}

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// POSTs `body` to `url` with a bearer credential.
    ///
    /// Returns `Unavailable` or `Timeout` if no response arrived; any
    /// response, whatever its status, is `Ok`.
    fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> RemoteResult<HttpResponse>;
}

/// A remote row store spoken to over HTTP with CBOR bodies.
pub struct HttpRemote<C: HttpClient> {
    base_url: String,
    credential: String,
    client: C,
}

impl<C: HttpClient> HttpRemote<C> {
    /// Creates an HTTP remote.
    pub fn new(base_url: impl Into<String>, credential: impl Into<String>, client: C) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.into(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn post_cbor<Req, Res>(&self, endpoint: &str, request: &Req) -> RemoteResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let body = encode(request)?;
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.post(&url, &self.credential, body)?;
        debug!(%url, status = response.status, bytes = response.body.len(), "remote response");

        match response.status {
            200..=299 => decode(&response.body),
            400..=499 => Err(RemoteError::Rejected(error_message(&response))),
            _ => Err(RemoteError::Unavailable(error_message(&response))),
        }
    }
}

fn error_message(response: &HttpResponse) -> String {
    match decode::<ErrorBody>(&response.body) {
        Ok(body) => format!("{}: {}", response.status, body.error),
        Err(_) => format!("HTTP {}", response.status),
    }
}

impl<C: HttpClient> RemoteStore for HttpRemote<C> {
    fn ping(&self) -> RemoteResult<()> {
        let health: HealthResponse = self.post_cbor(HEALTH_PATH, &())?;
        if health.ok {
            Ok(())
        } else {
            Err(RemoteError::unavailable("remote reports unhealthy"))
        }
    }

    fn upsert(&self, table: Table, record: &Record) -> RemoteResult<()> {
        let request = UpsertRequest {
            table,
            record: record.clone(),
        };
        let response: UpsertResponse = self.post_cbor(UPSERT_PATH, &request)?;
        if response.id != record.id {
            return Err(RemoteError::Protocol(format!(
                "acknowledged {} for row {}",
                response.id, record.id
            )));
        }
        Ok(())
    }

    fn fetch_for_owner(&self, table: Table, owner_id: RecordId) -> RemoteResult<Vec<Record>> {
        let response: FetchResponse =
            self.post_cbor(FETCH_PATH, &FetchRequest { table, owner_id })?;
        Ok(response.rows)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST to `path` and returns the response.
    fn handle_post(&self, path: &str, bearer: &str, body: &[u8]) -> HttpResponse;
}

/// An [`HttpClient`] that routes requests straight into a server object.
///
/// The "network" can be cut with [`set_reachable`](Self::set_reachable).
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    reachable: AtomicBool,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a loopback client connected to `server`.
    pub fn new(server: S) -> Self {
        Self {
            server,
            reachable: AtomicBool::new(true),
        }
    }

    /// Switches the simulated network on or off.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Returns the server.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> RemoteResult<HttpResponse> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(RemoteError::unavailable("connection refused"));
        }
        let path = url.find("/v1/").map_or(url, |i| &url[i..]);
        Ok(self.server.handle_post(path, bearer, &body))
    }
}
