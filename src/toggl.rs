use async_trait::async_trait;
use chrono::{Duration, NaiveDate, SecondsFormat};
use log::{debug, info, trace};
#[cfg(test)]
use mockall::automock;
use reqwest::{header::CONTENT_TYPE, Client};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{ConfigError, ReportError};
use crate::time_entry::TimeEntry;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// タイムエントリーを取得するためのtrait。
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TimeEntryRepository {
    /// 開始日の00:00:00から終了日の23:59:59(UTC)までのタイムエントリーを取得する。
    ///
    /// `cancel`がキャンセルされた場合は`ReportError::Cancelled`を返す。
    async fn read_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<TimeEntry>, ReportError>;
}

/// Toggl APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TogglClient::new(&Config::load()?)?;
/// let time_entries = client.read_time_entries(start, end, &cancel).await?;
/// ```
pub struct TogglClient {
    client: Client,
    api_url: String,
    api_token: String,
}

impl TogglClient {
    /// 新しい`TogglClient`を返す。
    ///
    /// APIトークンが設定されていない場合はエラーを返す。
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_token = config
            .api_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingApiToken)?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    async fn fetch(&self, start_at: String, end_at: String) -> Result<Vec<TimeEntry>, ReportError> {
        let url = format!("{}/me/time_entries", self.api_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_token, Some("api_token"))
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("start_date", start_at.as_str()),
                ("end_date", end_at.as_str()),
                ("meta", "true"),
                ("include_sharing", "true"),
            ])
            .send()
            .await
            .map_err(|e| {
                ReportError::UpstreamUnavailable(format!(
                    "Failed to send request to Toggl API at {}: {}",
                    self.api_url, e
                ))
            })?
            .error_for_status()
            .map_err(|e| {
                ReportError::UpstreamUnavailable(format!("Request returned an error status: {}", e))
            })?;
        let body = response.text().await.map_err(|e| {
            ReportError::UpstreamUnavailable(format!("Failed to read response body: {}", e))
        })?;
        debug!("Response size: {} bytes", body.len());

        let time_entries = serde_json::from_str::<Option<Vec<TimeEntry>>>(&body)
            .map_err(|e| ReportError::UpstreamMalformed(format!("Failed to deserialize response: {}", e)))?
            .unwrap_or_default();

        Ok(time_entries)
    }
}

#[async_trait]
impl TimeEntryRepository for TogglClient {
    async fn read_time_entries(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<TimeEntry>, ReportError> {
        let (start_at, end_at) = query_range(start_date, end_date)?;
        info!("Fetching time entries from {} to {}", start_at, end_at);

        let time_entries = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReportError::Cancelled),
            result = self.fetch(start_at, end_at) => result?,
        };
        info!("length of time entries: {}", time_entries.len());
        for entry in &time_entries {
            trace!(
                "time entry {}: workspace={:?} project={:?} deleted_at={:?}",
                entry.id,
                entry.workspace_id,
                entry.project_id,
                entry.server_deleted_at
            );
        }

        Ok(time_entries)
    }
}

/// 問い合わせ範囲をUTCのRFC 3339文字列で返す。
///
/// 終了日を丸一日含めるため、終了時刻は「終了日 + 1日 - 1秒」とする。
fn query_range(start_date: NaiveDate, end_date: NaiveDate) -> Result<(String, String), ReportError> {
    let start_at = start_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ReportError::InvalidRequest(format!("Invalid start date: {}", start_date)))?
        .and_utc();
    let end_at = end_date
        .succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|next| next - Duration::seconds(1))
        .ok_or_else(|| ReportError::InvalidRequest(format!("Invalid end date: {}", end_date)))?
        .and_utc();

    Ok((
        start_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        end_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    ))
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use chrono::NaiveDate;
    use mockito::{Matcher, Server};
    use tokio_util::sync::CancellationToken;

    use super::{query_range, TimeEntryRepository, TogglClient};
    use crate::config::Config;
    use crate::error::{ConfigError, ReportError};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(api_url: String) -> Config {
        Config {
            api_token: Some("test-token".to_string()),
            api_url,
        }
    }

    fn query_matcher() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("start_date".into(), "2024-01-01T00:00:00Z".into()),
            Matcher::UrlEncoded("end_date".into(), "2024-01-31T23:59:59Z".into()),
            Matcher::UrlEncoded("meta".into(), "true".into()),
            Matcher::UrlEncoded("include_sharing".into(), "true".into()),
        ])
    }

    #[test]
    fn test_query_range() {
        let (start, end) = query_range(date(2024, 1, 1), date(2024, 1, 31)).unwrap();

        assert_eq!(start, "2024-01-01T00:00:00Z");
        assert_eq!(end, "2024-01-31T23:59:59Z");
    }

    /// 年末の終了日が翌年にはみ出さないことを確認する。
    #[test]
    fn test_query_range_year_end() {
        let (_, end) = query_range(date(2024, 12, 1), date(2024, 12, 31)).unwrap();

        assert_eq!(end, "2024-12-31T23:59:59Z");
    }

    #[rstest::rstest]
    #[case::none(None)]
    #[case::empty(Some(""))]
    fn test_new_without_token(#[case] token: Option<&str>) {
        let config = Config {
            api_token: token.map(str::to_string),
            ..Config::default()
        };

        let result = TogglClient::new(&config);

        assert!(matches!(result, Err(ConfigError::MissingApiToken)));
    }

    #[tokio::test]
    async fn test_read_time_entries() {
        let mut server = Server::new_async().await;
        let body = r#"[
            {"id": 1, "description": "task", "start": "2024-01-02T09:00:00Z",
             "stop": "2024-01-02T10:00:00Z", "duration": 3600,
             "project_name": "TestProject", "tags": ["dev"]},
            {"id": 2, "start": "2024-01-03T09:00:00Z", "duration": -1}
        ]"#;
        let mock = server
            .mock("GET", "/me/time_entries")
            .match_query(query_matcher())
            .match_header(
                "authorization",
                format!("Basic {}", STANDARD.encode("test-token:api_token")).as_str(),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let client = TogglClient::new(&config(server.url())).unwrap();
        let result = client
            .read_time_entries(date(2024, 1, 1), date(2024, 1, 31), &CancellationToken::new())
            .await;

        mock.assert_async().await;
        let entries = result.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].project_name.as_deref(), Some("TestProject"));
        assert_eq!(entries[1].duration, -1);
    }

    #[tokio::test]
    async fn test_read_time_entries_null_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let client = TogglClient::new(&config(server.url())).unwrap();
        let entries = client
            .read_time_entries(date(2024, 1, 1), date(2024, 1, 31), &CancellationToken::new())
            .await
            .unwrap();

        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_read_time_entries_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = TogglClient::new(&config(server.url())).unwrap();
        let result = client
            .read_time_entries(date(2024, 1, 1), date(2024, 1, 31), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ReportError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_read_time_entries_malformed_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"unexpected": "object"}"#)
            .create_async()
            .await;

        let client = TogglClient::new(&config(server.url())).unwrap();
        let result = client
            .read_time_entries(date(2024, 1, 1), date(2024, 1, 31), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ReportError::UpstreamMalformed(_))));
    }

    #[tokio::test]
    async fn test_read_time_entries_unreachable() {
        // 何も待ち受けていないポート
        let client = TogglClient::new(&config("http://127.0.0.1:1".to_string())).unwrap();
        let result = client
            .read_time_entries(date(2024, 1, 1), date(2024, 1, 31), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ReportError::UpstreamUnavailable(_))));
    }

    /// キャンセル済みの場合はリクエストを送らずに`Cancelled`を返すことを確認する。
    #[tokio::test]
    async fn test_read_time_entries_cancelled() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .expect(0)
            .create_async()
            .await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = TogglClient::new(&config(server.url())).unwrap();
        let result = client
            .read_time_entries(date(2024, 1, 1), date(2024, 1, 31), &cancel)
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(ReportError::Cancelled)));
    }
}
