use std::fmt::Display;

use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Failures reported by the PostgREST surface, kept typed so callers can
/// branch on conflicts without string matching.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage not configured")]
    NotConfigured,

    #[error("storage rejected credentials")]
    Unauthorized,

    #[error("resource not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("storage error ({status})")]
    Api { status: u16, body: String },
}

/// `true` when the error is a uniqueness conflict (HTTP 409).
pub fn is_conflict(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<StorageError>(), Some(StorageError::Conflict(_)))
}

/// PostgREST `eq.` filter with the value percent-encoded.
pub fn eq<V: Display>(value: V) -> String {
    format!("eq.{}", urlencoding::encode(&value.to_string()))
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Server-side calls run with the service role unless a caller token is given.
        let bearer = auth_token.unwrap_or(&self.service_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))?,
        );

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        if self.base_url.is_empty() {
            return Err(StorageError::NotConfigured.into());
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, path);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Storage API error ({}) on {}", status, path);
            debug!("Storage API error body: {}", error_text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Unauthorized,
                StatusCode::NOT_FOUND => StorageError::NotFound,
                StatusCode::CONFLICT => StorageError::Conflict(error_text),
                _ => StorageError::Api { status: status.as_u16(), body: error_text },
            }.into());
        }

        let data = response.json::<T>().await
            .map_err(|e| anyhow!("Failed to decode storage response: {}", e))?;
        Ok(data)
    }

    /// `GET /rest/v1/{table}?{query}`
    pub async fn select<T>(&self, table: &str, query: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}?{}", table, query);
        self.request(Method::GET, &path, None, None).await
    }

    /// First row of a select, if any.
    pub async fn select_one<T>(&self, table: &str, query: &str) -> Result<Option<T>>
    where T: DeserializeOwned {
        let query = format!("{}&limit=1", query);
        let mut rows: Vec<T> = self.select(table, &query).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    /// Insert and return the stored representation.
    pub async fn insert<T>(&self, table: &str, body: Value) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}", table);
        self.request_with_headers(
            Method::POST,
            &path,
            None,
            Some(body),
            Some(return_representation()),
        ).await
    }

    /// Filtered `PATCH`; the returned rows are exactly the rows that matched
    /// the filter at update time.
    pub async fn update<T>(&self, table: &str, query: &str, body: Value) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/{}?{}", table, query);
        self.request_with_headers(
            Method::PATCH,
            &path,
            None,
            Some(body),
            Some(return_representation()),
        ).await
    }
}

fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}
