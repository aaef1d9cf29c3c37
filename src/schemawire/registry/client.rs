//! HTTP client for a Confluent-style schema registry.
//!
//! Every operation goes through one retrying fetch helper: a fixed number
//! of sequential attempts with a constant delay in between, retrying all
//! failures alike (transport errors and any non-success status, 4xx
//! included). Registration bodies embed the schema as a JSON string field
//! (`{"schema": "..."}`), while compatibility checks send the schema
//! document as-is; both follow the registry's own conventions.
//!
//! The client holds no mutable state and no schema cache. Callers that
//! want memoization own a [`SchemaCache`](super::cache::SchemaCache) and
//! decide themselves when to consult and invalidate it.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::error::{RegistryError, RegistryResult};
use super::types::{
    BasicAuth, CompatibilityCheck, GlobalCompatibility, RegistryMode, RetryPolicy, SchemaDocument,
    ServerInfo,
};

/// Client for the registry REST API. Cheap to clone; configuration is
/// immutable after construction and all operations take `&self`.
#[derive(Debug, Clone)]
pub struct SchemaRegistryClient {
    base_url: String,
    auth: Option<BasicAuth>,
    client_id: Option<String>,
    retry: RetryPolicy,
    http_client: Client,
}

impl SchemaRegistryClient {
    /// Creates a client for the registry at `host`. A trailing slash on
    /// the host is trimmed.
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            base_url: host.trim_end_matches('/').to_string(),
            auth: None,
            client_id: None,
            retry: RetryPolicy::default(),
            http_client: Client::new(),
        }
    }

    /// Sends `Authorization: Basic ...` with every request.
    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sends `Client-Id` with every request.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Registers a schema under a subject and returns the assigned id.
    /// The schema travels inside the body as a stringified JSON field.
    pub async fn register_schema(
        &self,
        subject: &str,
        schema: &JsonValue,
    ) -> RegistryResult<u32> {
        let url = format!("{}/subjects/{}/versions", self.base_url, subject);
        let body = json!({ "schema": schema.to_string() }).to_string();
        let response = self
            .fetch_with_retry(Method::POST, &url, Some(body))
            .await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::RegisterFailed { body });
        }
        let registered: RegisterSchemaResponse = parse_json(response, &url).await?;
        log::debug!(
            "Registered schema under subject {} with id {}",
            subject,
            registered.id
        );
        Ok(registered.id)
    }

    /// Fetches a schema document by registry id.
    pub async fn get_schema_by_id(&self, id: u32) -> RegistryResult<SchemaDocument> {
        let url = format!("{}/schemas/ids/{}", self.base_url, id);
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::SchemaFetchFailed { id, body });
        }
        let raw: SchemaByIdResponse = parse_json(response, &url).await?;
        Ok(SchemaDocument {
            id,
            subject: raw.subject,
            version: raw.version,
            schema: raw.schema,
        })
    }

    /// Fetches a subject's schema at a version, where `version` is a
    /// number rendered as a string or the literal `"latest"`.
    pub async fn get_schema_by_version(
        &self,
        subject: &str,
        version: &str,
    ) -> RegistryResult<SchemaDocument> {
        let url = format!(
            "{}/subjects/{}/versions/{}",
            self.base_url, subject, version
        );
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        let raw: SubjectVersionResponse = parse_json(response, &url).await?;
        Ok(SchemaDocument {
            id: raw.id,
            subject: Some(raw.subject),
            version: Some(raw.version),
            schema: raw.schema,
        })
    }

    /// Fetches the latest schema registered under a subject.
    pub async fn get_latest_schema(&self, subject: &str) -> RegistryResult<SchemaDocument> {
        self.get_schema_by_version(subject, "latest").await
    }

    /// Lists the version numbers registered under a subject.
    pub async fn get_all_versions(&self, subject: &str) -> RegistryResult<Vec<u32>> {
        let url = format!("{}/subjects/{}/versions", self.base_url, subject);
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        parse_json(response, &url).await
    }

    /// Lists every subject known to the registry.
    pub async fn get_all_subjects(&self) -> RegistryResult<Vec<String>> {
        let url = format!("{}/subjects", self.base_url);
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        parse_json(response, &url).await
    }

    /// Deletes a subject and all of its versions.
    pub async fn delete_subject(&self, subject: &str) -> RegistryResult<()> {
        let url = format!("{}/subjects/{}", self.base_url, subject);
        let response = self.fetch_with_retry(Method::DELETE, &url, None).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::DeleteSubjectFailed {
                subject: subject.to_string(),
                body,
            });
        }
        Ok(())
    }

    /// Checks a candidate schema against a registered version. Unlike
    /// registration, the schema document is sent as-is.
    pub async fn check_compatibility(
        &self,
        subject: &str,
        version: &str,
        schema: &JsonValue,
    ) -> RegistryResult<CompatibilityCheck> {
        let url = format!(
            "{}/compatibility/subjects/{}/versions/{}",
            self.base_url, subject, version
        );
        let body = schema.to_string();
        let response = self
            .fetch_with_retry(Method::POST, &url, Some(body))
            .await?;
        parse_json(response, &url).await
    }

    /// Reads the registry's global compatibility level.
    pub async fn get_global_compatibility(&self) -> RegistryResult<GlobalCompatibility> {
        let url = format!("{}/config", self.base_url);
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        parse_json(response, &url).await
    }

    /// Sets the registry's global compatibility level. The level is an
    /// opaque string passed through verbatim.
    pub async fn set_global_compatibility(&self, level: &str) -> RegistryResult<()> {
        let url = format!("{}/config", self.base_url);
        let body = json!({ "compatibility": level }).to_string();
        let response = self.fetch_with_retry(Method::PUT, &url, Some(body)).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::SetCompatibilityFailed { body });
        }
        Ok(())
    }

    /// Reads the registry's operating mode.
    pub async fn get_mode(&self) -> RegistryResult<RegistryMode> {
        let url = format!("{}/mode", self.base_url);
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        parse_json(response, &url).await
    }

    /// Sets the registry's operating mode, passed through verbatim.
    pub async fn set_mode(&self, mode: &str) -> RegistryResult<()> {
        let url = format!("{}/mode", self.base_url);
        let body = json!({ "mode": mode }).to_string();
        let response = self.fetch_with_retry(Method::PUT, &url, Some(body)).await?;
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::SetModeFailed { body });
        }
        Ok(())
    }

    /// Reads server metadata from the registry root endpoint.
    pub async fn get_server_info(&self) -> RegistryResult<ServerInfo> {
        let url = format!("{}/", self.base_url);
        let response = self.fetch_with_retry(Method::GET, &url, None).await?;
        parse_json(response, &url).await
    }

    /// Issues one logical request with up to `retries` sequential
    /// attempts. Success returns the response with its body untouched;
    /// failed attempts read the body once for diagnostics before the next
    /// try.
    async fn fetch_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> RegistryResult<Response> {
        // retries counts total attempts; zero still means one attempt.
        let attempts = self.retry.retries.max(1);
        let mut last_message = String::new();
        for attempt in 1..=attempts {
            let mut request = self
                .http_client
                .request(method.clone(), url)
                .header("Content-Type", "application/json");
            if let Some(auth) = &self.auth {
                request = request.basic_auth(&auth.username, Some(&auth.password));
            }
            if let Some(client_id) = &self.client_id {
                request = request.header("Client-Id", client_id);
            }
            if let Some(body) = &body {
                request = request.body(body.clone());
            }

            match request.send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    last_message = format!("HTTP error: {}. Body: {}", status, body);
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        last_message
                    );
                }
                Err(e) => {
                    last_message = e.to_string();
                    log::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        url,
                        last_message
                    );
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.retry.retry_delay_ms)).await;
            }
        }

        Err(RegistryError::RequestFailed {
            url: url.to_string(),
            attempts,
            message: last_message,
        })
    }
}

async fn parse_json<T: for<'de> Deserialize<'de>>(
    response: Response,
    url: &str,
) -> RegistryResult<T> {
    response
        .json()
        .await
        .map_err(|e| RegistryError::ResponseParse {
            url: url.to_string(),
            message: e.to_string(),
        })
}

#[derive(Debug, Deserialize)]
struct RegisterSchemaResponse {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct SchemaByIdResponse {
    schema: String,
    subject: Option<String>,
    version: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SubjectVersionResponse {
    subject: String,
    version: u32,
    id: u32,
    schema: String,
}
