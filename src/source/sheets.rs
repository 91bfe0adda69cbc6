// src/source/sheets.rs

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

use super::TabularSource;
use crate::error::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/";

/// How requests against the Sheets API are authorised.
#[derive(Clone)]
pub enum Credential {
    /// Sent as the `key` query parameter. Enough for reads of a shared sheet.
    ApiKey(String),
    /// Sent as a bearer token. Needed for appends on most sheets.
    AccessToken(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credential::AccessToken(_) => f.write_str("AccessToken(***)"),
        }
    }
}

/// `spreadsheets.values` resource as returned by `get`.
/// An empty range comes back without a `values` field at all.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl ValueRange {
    fn into_rows(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: [&'a [String]; 1],
}

fn cell_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Google Sheets v4 client for one spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    client: Client,
    base: Url,
    spreadsheet_id: String,
    credential: Credential,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, credential: Credential) -> Self {
        Self {
            client: Client::new(),
            base: Url::parse(DEFAULT_BASE_URL).expect("default base URL should parse"),
            spreadsheet_id: spreadsheet_id.into(),
            credential,
        }
    }

    /// Point the client at another host, e.g. a local stand-in for the API.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}` with the range
    /// percent-encoded as a single path segment.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::fetch(range, format!("base URL {} cannot hold a path", self.base)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values"])
            .push(&format!("{range}{suffix}"));

        if let Credential::ApiKey(key) = &self.credential {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Credential::AccessToken(token) => req.bearer_auth(token),
            Credential::ApiKey(_) => req,
        }
    }
}

#[async_trait]
impl TabularSource for SheetsClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(range, "")?;

        let body: ValueRange = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::fetch_with_source(range, "GET values", e))?
            .error_for_status()
            .map_err(|e| Error::fetch_with_source(range, "non-success status", e))?
            .json()
            .await
            .map_err(|e| Error::fetch_with_source(range, "decoding ValueRange", e))?;

        let rows = body.into_rows();
        debug!(range, rows = rows.len(), "fetched range");
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self, row))]
    async fn append(&self, range: &str, row: Vec<String>) -> Result<()> {
        let mut url = self.values_url(range, ":append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = AppendBody { values: [row.as_slice()] };
        self.authorize(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::fetch_with_source(range, "POST append", e))?
            .error_for_status()
            .map_err(|e| Error::fetch_with_source(range, "non-success status", e))?;

        debug!(range, cells = row.len(), "appended row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    #[test]
    fn values_url_encodes_range_and_key() {
        let client = SheetsClient::new("sheet-123", Credential::ApiKey("k e y".into()));
        let url = client.values_url("SetList!A:D", "").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/SetList!A:D?key=k+e+y"
        );
    }

    #[test]
    fn values_url_with_token_has_no_query() {
        let client = SheetsClient::new("abc", Credential::AccessToken("t".into()))
            .with_base_url(Url::parse("http://localhost:9000/").unwrap());
        let url = client.values_url("My Requests!A:D", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/v4/spreadsheets/abc/values/My%20Requests!A:D:append"
        );
    }

    #[test]
    fn value_range_without_values_is_empty() {
        let body: ValueRange =
            serde_json::from_str(r#"{"range":"SetList!A1:D1000","majorDimension":"ROWS"}"#)
                .unwrap();
        assert!(body.into_rows().is_empty());
    }

    #[test]
    fn value_range_cells_become_text() {
        let body: ValueRange = serde_json::from_str(
            r#"{"range":"SetList!A1:D3","values":[["Title","Artist","Genre","Year"],["Imagine","John Lennon","Rock",1971],["Short"]]}"#,
        )
        .unwrap();
        let rows = body.into_rows();
        assert_eq!(rows[1], vec!["Imagine", "John Lennon", "Rock", "1971"]);
        assert_eq!(rows[2], vec!["Short"]);
    }

    #[test]
    fn append_body_wraps_single_row() {
        let row = vec!["ts".to_string(), "Imagine".to_string()];
        let json = serde_json::to_string(&AppendBody { values: [row.as_slice()] }).unwrap();
        assert_eq!(json, r#"{"values":[["ts","Imagine"]]}"#);
    }

    #[test]
    fn credential_debug_is_redacted() {
        let dbg = format!("{:?}", Credential::ApiKey("secret".into()));
        assert!(!dbg.contains("secret"));
    }

    /// Local stand-in for the API: answers one request with `status` and a
    /// JSON `body`, and hands back the raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&chunk[..n]);
                if let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&raw[..end]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + len {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            String::from_utf8(raw).unwrap()
        });

        (Url::parse(&format!("http://{addr}/")).unwrap(), task)
    }

    #[tokio::test]
    async fn test_get_with_api_key_decodes_rows() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"range":"SetList!A1:D3","majorDimension":"ROWS","values":[["Title","Artist"],["Imagine","John Lennon",1971]]}"#,
        )
        .await;
        let client = SheetsClient::new("sheet-1", Credential::ApiKey("k".into())).with_base_url(base);

        let rows = client.get("SetList!A:D").await.unwrap();
        assert_eq!(rows, vec![vec!["Title", "Artist"], vec!["Imagine", "John Lennon", "1971"]]);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v4/spreadsheets/sheet-1/values/SetList!A:D?key=k HTTP/1.1"));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error_with_range() {
        let (base, server) = serve_once("403 Forbidden", r#"{"error":{"code":403}}"#).await;
        let client =
            SheetsClient::new("sheet-1", Credential::AccessToken("t0k".into())).with_base_url(base);

        let err = client.get("Requests!A:D").await.unwrap_err();
        assert!(err.is_fetch());
        assert!(err.to_string().contains("Requests!A:D"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v4/spreadsheets/sheet-1/values/Requests!A:D HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer t0k"));
    }

    #[tokio::test]
    async fn test_append_posts_single_row_with_insert_options() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let client =
            SheetsClient::new("sheet-1", Credential::AccessToken("t0k".into())).with_base_url(base);

        let row = vec![
            "2024-01-01T10:00:00.000Z".to_string(),
            "Imagine".into(),
            "Bob".into(),
            "Pending".into(),
        ];
        client.append("Requests!A:D", row).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with(
            "POST /v4/spreadsheets/sheet-1/values/Requests!A:D:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS HTTP/1.1"
        ));
        assert!(request.to_lowercase().contains("authorization: bearer t0k"));
        assert!(request.ends_with(
            r#"{"values":[["2024-01-01T10:00:00.000Z","Imagine","Bob","Pending"]]}"#
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SheetsClient::new("sheet-1", Credential::ApiKey("k".into()))
            .with_base_url(Url::parse(&format!("http://{addr}/")).unwrap());
        let err = client.append("Requests!A:D", vec!["x".into()]).await.unwrap_err();
        assert!(err.is_fetch());
        assert!(err.to_string().contains("Requests!A:D"));
    }
}
