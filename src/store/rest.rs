//! Hosted record store speaking the PostgREST dialect.
//!
//! Rows live in a single table (default `api_keys`) reachable at
//! `<base_url>/rest/v1/<table>`. Filters use PostgREST operators
//! (`user_id=eq.<id>`), and writes ask for the stored row back with
//! `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;

use crate::errors::StoreError;
use crate::keys::{ApiKeyPatch, ApiKeyRecord, NewApiKeyRecord};

use super::RecordStore;

/// Connection settings for a [`RestStore`].
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub base_url: String,
    /// Public (anon) API key sent in the `apikey` header.
    pub anon_key: String,
    /// Session access token; falls back to the anon key when absent.
    pub access_token: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    config: RestStoreConfig,
}

/// Error body returned by PostgREST.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl RestStore {
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(format!("keydash/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let token = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        self.client
            .request(method, self.endpoint())
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
            .header("Accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        if status.is_client_error() {
            Err(StoreError::Rejected(format!("{status}: {message}")))
        } else {
            Err(StoreError::Backend(format!("{status}: {message}")))
        }
    }

    async fn rows(resp: Response) -> Result<Vec<ApiKeyRecord>, StoreError> {
        resp.json::<Vec<ApiKeyRecord>>()
            .await
            .map_err(|e| StoreError::Backend(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl RecordStore for RestStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let owner_filter = format!("eq.{owner_id}");
        let builder = self
            .request(Method::GET)
            .query(&[("select", "*"), ("user_id", owner_filter.as_str())]);
        let resp = self.send(builder).await?;
        Self::rows(resp).await
    }

    async fn insert(&self, record: NewApiKeyRecord) -> Result<ApiKeyRecord, StoreError> {
        let builder = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&[record]);
        let resp = self.send(builder).await?;
        Self::rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("insert returned no row".into()))
    }

    async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<ApiKeyRecord, StoreError> {
        let id_filter = format!("eq.{id}");
        let builder = self
            .request(Method::PATCH)
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&patch);
        let resp = self.send(builder).await?;
        Self::rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id_filter = format!("eq.{id}");
        let builder = self
            .request(Method::DELETE)
            .query(&[("id", id_filter.as_str())]);
        self.send(builder).await?;
        Ok(())
    }
}
