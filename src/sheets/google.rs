//! Google Sheets v4 REST client.

use super::client::pad_block;
use super::{CellRange, SheetRef, SheetsError, SpreadsheetClient};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::sleep;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MAX_RETRIES: u32 = 3;
/// Grows linearly with each retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub enum GoogleCredentials {
    AccessToken(String),
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
}

impl GoogleCredentials {
    /// OAuth client secrets as downloaded from the Google console.
    pub fn from_client_secret_file(
        path: impl AsRef<Path>,
        refresh_token: String,
    ) -> Result<Self, SheetsError> {
        let raw = std::fs::read_to_string(path).map_err(|_| SheetsError::InvalidCredentialsFile)?;
        Self::from_client_secret_json(&raw, refresh_token)
    }

    pub fn from_client_secret_json(raw: &str, refresh_token: String) -> Result<Self, SheetsError> {
        let file: ClientSecretFile =
            serde_json::from_str(raw).map_err(|_| SheetsError::InvalidCredentialsFile)?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or(SheetsError::InvalidCredentialsFile)?;
        Ok(Self::RefreshToken {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
            refresh_token,
        })
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct BatchGetResponse {
    #[serde(rename = "valueRanges", default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

pub struct GoogleSheetsClient {
    http: reqwest::Client,
    credentials: GoogleCredentials,
    token: RwLock<Option<CachedToken>>,
    base_url: String,
    token_url: String,
    backoff: Duration,
}

impl GoogleSheetsClient {
    pub fn new(credentials: GoogleCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            token: RwLock::new(None),
            base_url: SHEETS_BASE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            backoff: RETRY_BACKOFF,
        }
    }

    async fn bearer(&self) -> Result<String, SheetsError> {
        let (client_id, client_secret, refresh_token) = match &self.credentials {
            GoogleCredentials::AccessToken(token) => return Ok(token.clone()),
            GoogleCredentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            } => (client_id, client_secret, refresh_token),
        };

        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        tracing::debug!("Refreshing Google access token");
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("{status}: {body}")));
        }
        let token: TokenResponse = resp.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *slot = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// Sends with bearer auth, retrying throttling, server errors and transport failures.
    async fn send_json(
        &self,
        build: impl Fn(&reqwest::Client) -> RequestBuilder + Send + Sync,
    ) -> Result<serde_json::Value, SheetsError> {
        let mut retries = 0;
        loop {
            let token = self.bearer().await?;
            let outcome = build(&self.http).bearer_auth(token).send().await;

            let retryable = match outcome {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.map_err(SheetsError::from);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    let err = SheetsError::Api {
                        status: status.as_u16(),
                        body,
                    };
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        err
                    } else {
                        return Err(err);
                    }
                }
                Err(e) => SheetsError::Http(e),
            };

            retries += 1;
            if retries > MAX_RETRIES {
                return Err(retryable);
            }
            tracing::warn!("Spreadsheet request failed (attempt {}): {}", retries, retryable);
            sleep(self.backoff * retries).await;
        }
    }

    fn values_url(&self, sheet: &SheetRef, action: &str) -> String {
        format!("{}/{}/values:{}", self.base_url, sheet.table, action)
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SpreadsheetClient for GoogleSheetsClient {
    async fn read_ranges(
        &self,
        sheet: &SheetRef,
        ranges: &[CellRange],
    ) -> Result<Vec<Vec<Vec<String>>>, SheetsError> {
        if ranges.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.values_url(sheet, "batchGet");
        let query: Vec<(&str, String)> = ranges
            .iter()
            .map(|range| ("ranges", range.a1(&sheet.sheet)))
            .collect();

        let json = self
            .send_json(|http| http.get(&url).query(&query))
            .await?;
        let resp: BatchGetResponse =
            serde_json::from_value(json).map_err(|e| SheetsError::Malformed(e.to_string()))?;
        if resp.value_ranges.len() != ranges.len() {
            return Err(SheetsError::Malformed(format!(
                "asked for {} ranges, got {}",
                ranges.len(),
                resp.value_ranges.len()
            )));
        }

        Ok(resp
            .value_ranges
            .into_iter()
            .zip(ranges)
            .map(|(block, range)| {
                let rows = block
                    .values
                    .iter()
                    .map(|row| row.iter().map(cell_text).collect())
                    .collect();
                pad_block(rows, range)
            })
            .collect())
    }

    async fn write_ranges(
        &self,
        sheet: &SheetRef,
        writes: &[(CellRange, Vec<Vec<String>>)],
    ) -> Result<(), SheetsError> {
        if writes.is_empty() {
            return Ok(());
        }
        let url = self.values_url(sheet, "batchUpdate");
        let data: Vec<serde_json::Value> = writes
            .iter()
            .map(|(range, rows)| {
                json!({
                    "range": range.a1(&sheet.sheet),
                    "majorDimension": "ROWS",
                    "values": rows,
                })
            })
            .collect();
        let body = json!({ "valueInputOption": "USER_ENTERED", "data": data });

        self.send_json(|http| http.post(&url).json(&body)).await?;
        tracing::debug!(table = %sheet.table, sheet = %sheet.sheet, ranges = writes.len(), "Cells updated");
        Ok(())
    }

    async fn clear_ranges(&self, sheet: &SheetRef, ranges: &[CellRange]) -> Result<(), SheetsError> {
        if ranges.is_empty() {
            return Ok(());
        }
        let url = self.values_url(sheet, "batchClear");
        let body = json!({
            "ranges": ranges.iter().map(|r| r.a1(&sheet.sheet)).collect::<Vec<_>>(),
        });
        self.send_json(|http| http.post(&url).json(&body)).await?;
        Ok(())
    }
}
