//! Blocking `reqwest` implementation of [`HttpClient`].

use crate::error::{RemoteError, RemoteResult};
use crate::http::{HttpClient, HttpResponse};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

const CBOR: &str = "application/cbor";

/// HTTP client backed by `reqwest`'s blocking API.
///
/// Every request is bounded by the timeout given at construction. Must not
/// be created or dropped on an async runtime thread; the sync scheduler
/// runs attempts on the blocking pool.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Protocol(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn post(&self, url: &str, bearer: &str, body: Vec<u8>) -> RemoteResult<HttpResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer)
            .header(CONTENT_TYPE, CBOR)
            .body(body)
            .send()
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(map_send_error)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn map_send_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Unavailable(err.to_string())
    }
}
