use overc_core::{AlertRecord, Scope, StateRecord, StatesQuery, StatusSnapshot};
use std::future::Future;
use thiserror::Error;

pub mod http;

pub use http::{format_http_error, HttpClient};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("request {method} {url} failed: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },
    #[error("request {method} {url} returned {status} {reason}")]
    Status {
        method: String,
        url: String,
        status: u16,
        reason: String,
    },
    #[error("malformed response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Read-only status, state and alert endpoints.
pub trait StatusApi: Send + Sync + 'static {
    fn fetch_status(
        &self,
        scope: &Scope,
    ) -> impl Future<Output = Result<StatusSnapshot, ClientError>> + Send;

    fn fetch_states(
        &self,
        service_id: &str,
        query: &StatesQuery,
    ) -> impl Future<Output = Result<Vec<StateRecord>, ClientError>> + Send;

    fn fetch_alerts(
        &self,
        scope: &Scope,
        hours: u32,
    ) -> impl Future<Output = Result<Vec<AlertRecord>, ClientError>> + Send;
}

/// Mutating item endpoints.
pub trait ItemApi: Send + Sync + 'static {
    fn delete_server(&self, server_id: &str)
        -> impl Future<Output = Result<(), ClientError>> + Send;

    fn delete_service(
        &self,
        service_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
