//! HTTP client for the scheduler API.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::CliError;

/// Query for endpoints that take no parameters.
pub const NO_QUERY: &[(&str, &str)] = &[];

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, CliError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        handle_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        handle_response(response).await
    }

    /// POST and return the status with the JSON body, whatever the status.
    pub async fn post_raw<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, serde_json::Value), CliError> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(serde_json::Value::Null);
        Ok((status, body))
    }

    /// PUT a body to an endpoint that answers without content.
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<(), CliError> {
        let response = self.client.put(self.url(path)).json(body).send().await?;
        handle_empty(response).await
    }

    pub async fn delete<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<(), CliError> {
        let response = self
            .client
            .delete(self.url(path))
            .query(query)
            .send()
            .await?;
        handle_empty(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CliError> {
    if response.status().is_success() {
        response
            .json()
            .await
            .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to parse response: {}", e)))
    } else {
        handle_error(response).await
    }
}

async fn handle_empty(response: reqwest::Response) -> Result<(), CliError> {
    if response.status().is_success() {
        Ok(())
    } else {
        handle_error(response).await
    }
}

async fn handle_error<T>(response: reqwest::Response) -> Result<T, CliError> {
    let status = response.status().as_u16();

    let body: ApiErrorResponse = response.json().await.unwrap_or_else(|_| ApiErrorResponse {
        code: "unknown".to_string(),
        detail: format!("request failed with status {status}"),
        retry_after_seconds: 0,
    });

    Err(CliError::api(
        status,
        body.code,
        body.detail,
        body.retry_after_seconds,
    ))
}

/// Problem details body returned by the scheduler on errors.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: String,
    detail: String,
    #[serde(default)]
    retry_after_seconds: u32,
}
