use overc_core::scope::{item_path, ItemKind};
use overc_core::{
    AlertRecord, AlertsPayload, DashboardEvent, EventBus, Scope, StateRecord, StatesPayload,
    StatesQuery, StatusBarUpdate, StatusSnapshot,
};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ClientError, ItemApi, StatusApi};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// HTTP implementation of [`StatusApi`] and [`ItemApi`].
///
/// Every request passes through the status bar interception: `ajax_in_progress`
/// is raised before the call and lowered after the response or failure, and
/// failures additionally publish a formatted `http_error`. The error is still
/// returned to the caller.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    bus: EventBus,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration, bus: EventBus) -> Result<Self, ClientError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base url is empty".to_string()));
        }
        reqwest::Url::parse(base_url).map_err(|error| {
            ClientError::Configuration(format!("invalid base url '{base_url}': {error}"))
        })?;
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            ClientError::Configuration(format!("failed to build HTTP client: {error}"))
        })?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            bus,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let suffix = path.trim_start_matches('/');
        format!("{base}/{suffix}")
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self.send(method, path, query).await?;
        let url = response.url().to_string();
        response
            .json::<T>()
            .await
            .map_err(|error| ClientError::Decode {
                url,
                message: error.to_string(),
            })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ClientError> {
        let url = self.endpoint(path);
        self.bus
            .publish(DashboardEvent::StatusBar(StatusBarUpdate::ajax(true)));
        let outcome = self
            .client
            .request(method.clone(), &url)
            .query(query)
            .send()
            .await;
        self.bus
            .publish(DashboardEvent::StatusBar(StatusBarUpdate::ajax(false)));

        match outcome {
            Err(error) => {
                let message = error.to_string();
                self.report_failure(format_http_error(method.as_str(), &url, None, &message));
                Err(ClientError::Transport {
                    method: method.to_string(),
                    url,
                    message,
                })
            }
            Ok(response) if !response.status().is_success() => {
                let status = response.status();
                let reason = status.canonical_reason().unwrap_or_default().to_string();
                self.report_failure(format_http_error(
                    method.as_str(),
                    &url,
                    Some(status.as_u16()),
                    &reason,
                ));
                Err(ClientError::Status {
                    method: method.to_string(),
                    url,
                    status: status.as_u16(),
                    reason,
                })
            }
            Ok(response) => {
                debug!(event = "http_request_ok", method = %method, url = %url);
                Ok(response)
            }
        }
    }

    fn report_failure(&self, message: String) {
        warn!(event = "http_request_failed", error = %message);
        self.bus
            .publish(DashboardEvent::StatusBar(StatusBarUpdate::http_error(message)));
    }
}

/// Formats a failed call the way the status bar shows it:
/// `"GET http://host/api/status/": 500 Internal Server Error`.
pub fn format_http_error(method: &str, url: &str, status: Option<u16>, reason: &str) -> String {
    let target = format!("\"{method} {url}\"");
    match status {
        Some(status) => format!("{target}: {status} {reason}").trim_end().to_string(),
        None => format!("{target}: {reason}"),
    }
}

impl StatusApi for HttpClient {
    async fn fetch_status(&self, scope: &Scope) -> Result<StatusSnapshot, ClientError> {
        self.request_json(Method::GET, &scope.status_path(), &[])
            .await
    }

    async fn fetch_states(
        &self,
        service_id: &str,
        query: &StatesQuery,
    ) -> Result<Vec<StateRecord>, ClientError> {
        let payload: StatesPayload = self
            .request_json(
                Method::GET,
                &Scope::states_path(service_id),
                &query.to_pairs(),
            )
            .await?;
        Ok(payload.states)
    }

    async fn fetch_alerts(&self, scope: &Scope, hours: u32) -> Result<Vec<AlertRecord>, ClientError> {
        let payload: AlertsPayload = self
            .request_json(
                Method::GET,
                &scope.alerts_path(),
                &[("hours", hours.to_string())],
            )
            .await?;
        Ok(payload.alerts)
    }
}

impl ItemApi for HttpClient {
    async fn delete_server(&self, server_id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &item_path(ItemKind::Server, server_id), &[])
            .await?;
        Ok(())
    }

    async fn delete_service(&self, service_id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &item_path(ItemKind::Service, service_id), &[])
            .await?;
        Ok(())
    }
}
