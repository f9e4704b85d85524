//! HTTP remote store speaking the PostgREST dialect.
//!
//! Tables live under `{base_url}/rest/v1/{table}`; filters are query
//! parameters of the form `column=eq.value`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;

use super::{Filter, RemoteError, RemoteStore, Table};
use crate::auth::AuthSession;
use crate::models::Row;

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Authenticates requests as a signed-in user instead of the anonymous key.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Store acting for `session`. An empty session token falls back to the
    /// API key.
    pub fn for_session(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        session: &AuthSession,
    ) -> Self {
        let store = Self::new(base_url, api_key);
        if session.access_token.is_empty() {
            store
        } else {
            store.with_access_token(session.access_token.clone())
        }
    }

    /// Token sent in the `Authorization` header.
    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    /// Builds the URL for a table, with the filter as query string.
    fn table_url(&self, table: Table, filter: Option<&Filter>) -> String {
        let base = format!("{}/rest/v1/{}", self.base_url, table.as_str());
        match filter {
            None => base,
            Some(Filter::All) => format!("{}?id=not.is.null", base),
            Some(Filter::Id(id)) => format!("{}?id=eq.{}", base, urlencoding::encode(id)),
            Some(Filter::Eq { column, value }) => format!(
                "{}?{}=eq.{}",
                base,
                urlencoding::encode(column),
                urlencoding::encode(value)
            ),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
    }

    /// Turns a non-success response into a structured error.
    async fn check(response: Response) -> Result<Response, RemoteError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Remote returned {}: {}", status, body);

        match serde_json::from_str::<Value>(&body) {
            Ok(payload) => Err(RemoteError::from_payload(payload)),
            Err(_) if body.trim().is_empty() => Err(RemoteError::Message(format!(
                "Server returned status {}",
                status
            ))),
            Err(_) => Err(RemoteError::Message(body)),
        }
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, RemoteError> {
        let url = match filter {
            Filter::All => format!("{}?select=*", self.table_url(table, None)),
            other => format!("{}&select=*", self.table_url(table, Some(other))),
        };

        let response = self.request(Method::GET, &url).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<(), RemoteError> {
        let url = self.table_url(table, None);
        let response = self
            .request(Method::POST, &url)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, table: Table, patch: Row, id: &str) -> Result<(), RemoteError> {
        let url = self.table_url(table, Some(&Filter::id(id)));
        let response = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), RemoteError> {
        let url = self.table_url(table, Some(filter));
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
