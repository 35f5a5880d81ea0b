//! reqwest implementation of [`TableBackend`]

use std::time::Duration;

use async_trait::async_trait;
use basable_core::{
    BasableError, Column, ExportRequest, ExportResponse, Result, TableBackend, TableConfig,
    TableConfigPatch, TableQueryOpts, TableRow, UpdateTableData,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, SessionCredentials};

/// Talks to the Basable HTTP API
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    credentials: Option<SessionCredentials>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BasableError::Configuration(format!("invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BasableError::Configuration(format!(
                "base URL cannot carry paths: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BasableError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            credentials: config.credentials.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        endpoint_url(&self.base_url, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        session_headers(self.credentials.as_ref())
            .into_iter()
            .fold(self.client.request(method, url), |req, (name, value)| {
                req.header(name, value)
            })
    }

    /// Send and return the response body, mapping non-2xx statuses to errors
    async fn execute(&self, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| BasableError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BasableError::Transport(e.to_string()))?;

        check_status(status, body)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.execute(self.request(Method::GET, url)).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_json<B, T>(&self, method: Method, url: Url, payload: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .execute(self.request(method, url).json(payload))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// For endpoints whose response body carries only a status message
    async fn send_ack<B>(&self, method: Method, url: Url, payload: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.request(method, url);
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        let message = self.execute(request).await?;
        tracing::debug!(response = %message, "Backend acknowledged request");
        Ok(())
    }
}

#[async_trait]
impl TableBackend for HttpBackend {
    #[tracing::instrument(skip(self))]
    async fn columns(&self, table: &str) -> Result<Vec<Column>> {
        let mut url = self.endpoint(&["columns"]);
        url.query_pairs_mut().append_pair("table", table);
        self.get_json(url).await
    }

    #[tracing::instrument(skip(self))]
    async fn table_configs(&self) -> Result<Vec<TableConfig>> {
        self.get_json(self.endpoint(&["tables", "configurations"]))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn table_config(&self, table: &str) -> Result<TableConfig> {
        self.get_json(self.endpoint(&["tables", "configurations", table]))
            .await
    }

    #[tracing::instrument(skip(self, patch))]
    async fn save_table_config(&self, table: &str, patch: &TableConfigPatch) -> Result<()> {
        let url = self.endpoint(&["tables", "configurations", table]);
        self.send_ack(Method::PATCH, url, Some(patch)).await
    }

    #[tracing::instrument(skip(self, opts), fields(table = %opts.table, offset = opts.offset))]
    async fn query_count(&self, opts: &TableQueryOpts) -> Result<usize> {
        let url = self.endpoint(&["tables", "query-result-count", &opts.table]);
        self.send_json(Method::POST, url, opts).await
    }

    #[tracing::instrument(skip(self, opts), fields(table = %opts.table, offset = opts.offset))]
    async fn query_rows(&self, opts: &TableQueryOpts) -> Result<Vec<TableRow>> {
        let url = self.endpoint(&["tables", "query-data", &opts.table]);
        let rows: Vec<TableRow> = self.send_json(Method::POST, url, opts).await?;
        tracing::debug!(rows = rows.len(), "Fetched rows");
        Ok(rows)
    }

    #[tracing::instrument(skip(self, batch), fields(rows = batch.unique_values.len()))]
    async fn update_rows(&self, table: &str, batch: &UpdateTableData) -> Result<()> {
        let url = self.endpoint(&["tables", "data", table]);
        self.send_ack(Method::PATCH, url, Some(batch)).await
    }

    #[tracing::instrument(skip(self))]
    async fn clear_table(&self, table: &str) -> Result<()> {
        let url = self.endpoint(&["tables", "data", "clear", table]);
        self.send_ack::<()>(Method::DELETE, url, None).await
    }

    #[tracing::instrument(skip(self))]
    async fn drop_table(&self, table: &str) -> Result<()> {
        let url = self.endpoint(&["tables", "drop", table]);
        self.send_ack::<()>(Method::DELETE, url, None).await
    }

    #[tracing::instrument(skip(self, request), fields(table = %request.query_opts.table, format = %request.format))]
    async fn export(&self, request: &ExportRequest) -> Result<ExportResponse> {
        let url = self.endpoint(&["tables", "data", "export", &request.query_opts.table]);
        self.send_json(Method::POST, url, request).await
    }
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Headers sent with every request.
///
/// Logged-in users authenticate with `Authorization`; guest sessions send the
/// same bearer token as `session-id`.
fn session_headers(credentials: Option<&SessionCredentials>) -> Vec<(&'static str, String)> {
    let mut headers = vec![("Content-Type", "application/json".to_string())];

    if let Some(credentials) = credentials {
        let token = format!("Bearer {}", credentials.token);
        if credentials.is_auth {
            headers.push(("Authorization", token));
        } else {
            headers.push(("session-id", token));
        }
        headers.push(("connection-id", credentials.connection_id.clone()));
    }

    headers
}

fn check_status(status: StatusCode, body: String) -> Result<String> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BasableError::Unauthorized {
            status: status.as_u16(),
            message: body,
        });
    }

    if !status.is_success() {
        return Err(BasableError::Backend {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credentials(is_auth: bool) -> SessionCredentials {
        SessionCredentials {
            token: "abc".into(),
            connection_id: "conn-7".into(),
            is_auth,
        }
    }

    #[test]
    fn guest_session_uses_session_id_header() {
        let headers = session_headers(Some(&credentials(false)));
        assert_eq!(
            headers,
            vec![
                ("Content-Type", "application/json".to_string()),
                ("session-id", "Bearer abc".to_string()),
                ("connection-id", "conn-7".to_string()),
            ]
        );
    }

    #[test]
    fn logged_in_user_uses_authorization_header() {
        let headers = session_headers(Some(&credentials(true)));
        assert!(headers.contains(&("Authorization", "Bearer abc".to_string())));
        assert!(!headers.iter().any(|(name, _)| *name == "session-id"));
    }

    #[test]
    fn anonymous_requests_only_set_content_type() {
        assert_eq!(
            session_headers(None),
            vec![("Content-Type", "application/json".to_string())]
        );
    }

    #[test]
    fn endpoints_extend_base_path() {
        let base = Url::parse("http://localhost:5000/api/").unwrap();
        assert_eq!(
            endpoint_url(&base, &["tables", "query-data", "orders"]).as_str(),
            "http://localhost:5000/api/tables/query-data/orders"
        );

        let bare = Url::parse("http://localhost:5000").unwrap();
        assert_eq!(
            endpoint_url(&bare, &["tables", "drop", "order items"]).as_str(),
            "http://localhost:5000/tables/drop/order%20items"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(check_status(StatusCode::OK, "42".into()).unwrap(), "42");
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, "expired".into()),
            Err(BasableError::Unauthorized { status: 401, .. })
        ));
        match check_status(StatusCode::BAD_REQUEST, "no such column".into()) {
            Err(BasableError::Backend { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "no such column");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_unusable_base_url() {
        let config = ClientConfig {
            base_url: "mailto:ops@example.com".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpBackend::new(&config),
            Err(BasableError::Configuration(_))
        ));
    }
}
