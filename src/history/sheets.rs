//! Google Sheets mirror of the conversation history.
//!
//! Rows are appended through the Sheets REST `values:append` endpoint. The
//! target tab name is not known up front, so a list of candidate names is
//! tried in order and the first one the spreadsheet accepts wins.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::core::config::RemoteHistoryConfig;
use crate::core::errors::HistoryError;

use super::{HistoryEntry, RemoteHistoryLog};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SheetsHistoryLog {
    spreadsheet_id: String,
    access_token: String,
    sheet_candidates: Vec<String>,
    base_url: String,
    client: Client,
}

impl SheetsHistoryLog {
    pub fn new(config: &RemoteHistoryConfig) -> Result<Self, HistoryError> {
        let access_token = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                HistoryError::Remote("history.remote.access_token is not set".to_string())
            })?
            .to_string();

        let spreadsheet_id = config.spreadsheet_id.trim();
        if spreadsheet_id.is_empty() {
            return Err(HistoryError::Remote(
                "history.remote.spreadsheet_id is not set".to_string(),
            ));
        }

        if config.sheet_candidates.is_empty() {
            return Err(HistoryError::Remote(
                "history.remote.sheet_candidates is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(HistoryError::remote)?;

        Ok(Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token,
            sheet_candidates: config.sheet_candidates.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn append_url(&self, sheet: &str) -> String {
        let range = format!("{}!A1", sheet);
        format!(
            "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(&range)
        )
    }
}

/// Column order: timestamp, user, question, answer.
pub(crate) fn entry_row(entry: &HistoryEntry) -> [String; 4] {
    [
        entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        entry.user_id.clone(),
        entry.question.clone(),
        entry.answer.clone(),
    ]
}

/// A rejection that means "wrong tab name", so the next candidate is worth a try.
fn is_missing_sheet(status: StatusCode, body: &str) -> bool {
    status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range"))
}

#[async_trait]
impl RemoteHistoryLog for SheetsHistoryLog {
    fn name(&self) -> &str {
        "google_sheets"
    }

    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let body = json!({ "values": [entry_row(entry)] });

        for sheet in &self.sheet_candidates {
            let res = self
                .client
                .post(self.append_url(sheet))
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await
                .map_err(HistoryError::remote)?;

            let status = res.status();
            if status.is_success() {
                tracing::debug!("History row appended to sheet '{}'", sheet);
                return Ok(());
            }

            let text = res.text().await.unwrap_or_default();
            if is_missing_sheet(status, &text) {
                tracing::debug!("Sheet '{}' rejected the append ({}), trying next", sheet, status);
                continue;
            }

            return Err(HistoryError::Remote(format!(
                "append to sheet '{}' failed with HTTP {}: {}",
                sheet, status, text
            )));
        }

        Err(HistoryError::Remote(format!(
            "none of the sheets {:?} exist in spreadsheet {}",
            self.sheet_candidates, self.spreadsheet_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        body::Bytes,
        extract::State,
        http::{StatusCode as AxumStatus, Uri},
        Router,
    };
    use chrono::{Local, TimeZone};

    #[derive(Clone, Default)]
    struct Recorded {
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    /// Fake Sheets API: only the tab named `accepting` exists.
    async fn spawn_fake_sheets(accepting: &'static str) -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .fallback(
                move |State(rec): State<Recorded>, uri: Uri, body: Bytes| async move {
                    let path = urlencoding::decode(uri.path())
                        .map(|p| p.into_owned())
                        .unwrap_or_default();
                    rec.calls
                        .lock()
                        .unwrap()
                        .push((path.clone(), String::from_utf8_lossy(&body).into_owned()));
                    if path.contains(&format!("/{}!A1:append", accepting)) {
                        (AxumStatus::OK, "{}".to_string())
                    } else {
                        (
                            AxumStatus::BAD_REQUEST,
                            r#"{"error":{"message":"Unable to parse range"}}"#.to_string(),
                        )
                    }
                },
            )
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), recorded)
    }

    fn config(base_url: String) -> RemoteHistoryConfig {
        RemoteHistoryConfig {
            spreadsheet_id: "sheet-id".to_string(),
            access_token: Some("token".to_string()),
            base_url,
            ..Default::default()
        }
    }

    fn entry() -> HistoryEntry {
        HistoryEntry {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 5).unwrap(),
            user_id: "user_123".to_string(),
            question: "¿Qué es una célula?".to_string(),
            answer: "La unidad básica de la vida.".to_string(),
        }
    }

    #[test]
    fn row_uses_fixed_column_order() {
        assert_eq!(
            entry_row(&entry()),
            [
                "2024-05-01 09:30:05".to_string(),
                "user_123".to_string(),
                "¿Qué es una célula?".to_string(),
                "La unidad básica de la vida.".to_string(),
            ]
        );
    }

    #[test]
    fn missing_token_is_rejected() {
        let mut cfg = config("http://localhost".to_string());
        cfg.access_token = None;
        assert!(matches!(
            SheetsHistoryLog::new(&cfg),
            Err(HistoryError::Remote(_))
        ));
    }

    #[test]
    fn missing_spreadsheet_id_is_rejected() {
        let mut cfg = config("http://localhost".to_string());
        cfg.spreadsheet_id = "  ".to_string();
        let err = SheetsHistoryLog::new(&cfg).err();
        assert!(matches!(err, Some(HistoryError::Remote(msg)) if msg.contains("spreadsheet_id")));
    }

    #[tokio::test]
    async fn first_accepting_candidate_wins() {
        let (base, recorded) = spawn_fake_sheets("Hoja1").await;
        let log = SheetsHistoryLog::new(&config(base)).unwrap();

        log.append(&entry()).await.unwrap();

        let calls = recorded.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].0.contains("Sheet1!A1:append"));
        assert!(calls[1].0.contains("sheets1!A1:append"));
        assert!(calls[2].0.contains("Hoja1!A1:append"));
        assert!(calls[2].1.contains("¿Qué es una célula?"));
    }

    #[tokio::test]
    async fn exhausting_candidates_is_an_error() {
        let (base, recorded) = spawn_fake_sheets("DoesNotExist").await;
        let log = SheetsHistoryLog::new(&config(base)).unwrap();

        assert!(matches!(
            log.append(&entry()).await,
            Err(HistoryError::Remote(_))
        ));
        assert_eq!(recorded.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn unreachable_service_is_remote_error() {
        let log = SheetsHistoryLog::new(&config("http://127.0.0.1:9".to_string())).unwrap();
        assert!(matches!(
            log.append(&entry()).await,
            Err(HistoryError::Remote(_))
        ));
    }
}
