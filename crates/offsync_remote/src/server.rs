//! Server side of the remote row protocol.

use crate::error::RemoteError;
use crate::http::{HttpResponse, LoopbackServer};
use crate::memory::MemoryRemote;
use crate::protocol::{
    decode, encode, ErrorBody, FetchRequest, FetchResponse, HealthResponse, UpsertRequest,
    UpsertResponse, FETCH_PATH, HEALTH_PATH, UPSERT_PATH,
};
use crate::store::RemoteStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serves the row protocol over a [`MemoryRemote`].
///
/// Every request must carry the configured bearer credential.
pub struct RowServer {
    rows: Arc<MemoryRemote>,
    credential: String,
}

impl RowServer {
    /// Creates a server over `rows` accepting `credential`.
    pub fn new(rows: Arc<MemoryRemote>, credential: impl Into<String>) -> Self {
        Self {
            rows,
            credential: credential.into(),
        }
    }

    /// Returns the backing row store.
    pub fn rows(&self) -> &Arc<MemoryRemote> {
        &self.rows
    }

    fn route(&self, path: &str, body: &[u8]) -> Result<HttpResponse, HttpResponse> {
        match path {
            HEALTH_PATH => {
                let ok = self.rows.ping().is_ok();
                reply(if ok { 200 } else { 503 }, &HealthResponse { ok })
            }
            UPSERT_PATH => {
                let request: UpsertRequest = decode(body).map_err(bad_request)?;
                self.rows
                    .upsert(request.table, &request.record)
                    .map_err(failure)?;
                reply(
                    200,
                    &UpsertResponse {
                        id: request.record.id,
                    },
                )
            }
            FETCH_PATH => {
                let request: FetchRequest = decode(body).map_err(bad_request)?;
                let rows = self
                    .rows
                    .fetch_for_owner(request.table, request.owner_id)
                    .map_err(failure)?;
                reply(200, &FetchResponse { rows })
            }
            other => Err(error(404, format!("no route for {other}"))),
        }
    }
}

impl LoopbackServer for RowServer {
    fn handle_post(&self, path: &str, bearer: &str, body: &[u8]) -> HttpResponse {
        if bearer != self.credential {
            warn!(path, "request with bad credential");
            return error(401, "invalid credential");
        }
        debug!(path, bytes = body.len(), "row request");
        self.route(path, body).unwrap_or_else(|response| response)
    }
}

fn reply<T: Serialize>(status: u16, value: &T) -> Result<HttpResponse, HttpResponse> {
    let body = encode(value).map_err(|e| error(500, e.to_string()))?;
    Ok(HttpResponse::new(status, body))
}

fn error(status: u16, message: impl Into<String>) -> HttpResponse {
    let body = encode(&ErrorBody::new(message)).unwrap_or_default();
    HttpResponse::new(status, body)
}

fn bad_request(err: RemoteError) -> HttpResponse {
    error(400, err.to_string())
}

fn failure(err: RemoteError) -> HttpResponse {
    match err {
        RemoteError::Rejected(message) => error(409, message),
        RemoteError::Protocol(message) => error(400, message),
        other => error(503, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_credential_is_401() {
        let server = RowServer::new(Arc::new(MemoryRemote::new()), "secret");
        let response = server.handle_post(HEALTH_PATH, "wrong", &[]);
        assert_eq!(response.status, 401);
        let body: ErrorBody = decode(&response.body).unwrap();
        assert!(body.error.contains("credential"));
    }

    #[test]
    fn unknown_route_is_404() {
        let server = RowServer::new(Arc::new(MemoryRemote::new()), "secret");
        assert_eq!(server.handle_post("/v1/nope", "secret", &[]).status, 404);
    }

    #[test]
    fn malformed_body_is_400() {
        let server = RowServer::new(Arc::new(MemoryRemote::new()), "secret");
        assert_eq!(server.handle_post(UPSERT_PATH, "secret", &[0xFF]).status, 400);
    }

    #[test]
    fn health_follows_reachability() {
        let rows = Arc::new(MemoryRemote::new());
        let server = RowServer::new(Arc::clone(&rows), "secret");
        assert_eq!(server.handle_post(HEALTH_PATH, "secret", &[]).status, 200);

        rows.set_reachable(false);
        assert_eq!(server.handle_post(HEALTH_PATH, "secret", &[]).status, 503);
    }
}
