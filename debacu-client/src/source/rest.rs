//! REST data source for the hosted backend (PostgREST dialect)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{Filter, Query};

use super::DataSource;
use crate::{ClientConfig, ClientError, ClientResult};

/// Error body returned by the backend
#[derive(serde::Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// Network data source
#[derive(Debug, Clone)]
pub struct RestDataSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    token: Option<String>,
}

impl RestDataSource {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            token: config.session_token.clone(),
        })
    }

    /// Base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_header(&self) -> Option<String> {
        self.token
            .as_ref()
            .or(self.api_key.as_ref())
            .map(|t| format!("Bearer {}", t))
    }

    /// Translate a query into PostgREST query-string pairs
    pub fn query_params(query: &Query) -> Vec<(String, String)> {
        let mut params = Vec::new();

        let select = if query.columns.is_empty() {
            "*".to_string()
        } else {
            query.columns.join(",")
        };
        params.push(("select".to_string(), select));

        for filter in &query.filters {
            match filter {
                Filter::Eq { column, value } => {
                    params.push((column.clone(), format!("eq.{}", value)));
                }
                Filter::In { column, values } => {
                    let list: Vec<String> = values.iter().map(|v| quote_list_value(v)).collect();
                    params.push((column.clone(), format!("in.({})", list.join(","))));
                }
            }
        }

        if let Some(order) = &query.order {
            params.push((
                "order".to_string(),
                format!("{}.{}", order.column, order.direction.as_str()),
            ));
        }

        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    async fn handle_response(response: reqwest::Response) -> ClientResult<Vec<Value>> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&text) {
                return Err(ClientError::Api {
                    code: api_err.code,
                    message: api_err.message,
                });
            }
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized(text)),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                _ => Err(ClientError::Internal(text)),
            };
        }

        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(ClientError::InvalidResponse(format!(
                "expected rows, got {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl DataSource for RestDataSource {
    async fn fetch(&self, query: &Query) -> ClientResult<Vec<Value>> {
        let url = self.table_url(&query.table);
        let mut req = self.client.get(&url).query(&Self::query_params(query));
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }
        if let Some(auth) = self.auth_header() {
            req = req.header(reqwest::header::AUTHORIZATION, auth);
        }

        tracing::debug!(table = %query.table, "fetching rows");
        let response = req.send().await?;
        Self::handle_response(response).await
    }
}

/// Values with reserved characters must be double-quoted inside `in.(...)`
fn quote_list_value(value: &str) -> String {
    let reserved = value
        .chars()
        .any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\') || c.is_whitespace());
    if reserved {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}
