use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

use crate::error::ReportError;

/// フィルタ対象のプロジェクトが指定されていない場合の表示名。
pub const UNKNOWN_PROJECT: &str = "Unknown";

/// レポート生成のリクエスト。
///
/// JSONで受け取る場合はcamelCaseのフィールド名(`startDate`, `endDate`, `projectName`,
/// `hourlyRate`, `timeOffset`)を利用する。
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default, deserialize_with = "deserialize_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_name: Option<String>,
    /// 請求用に保持しているだけで、集計には利用しない。
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    /// UTCからの時差(時間単位)。
    #[serde(default)]
    pub time_offset: Option<i32>,
}

impl ReportRequest {
    /// JSON文字列からリクエストを生成する。
    ///
    /// 空文字列や不正なJSONは`ReportError::InvalidRequest`とする。
    pub fn from_json(body: &str) -> Result<Self, ReportError> {
        if body.trim().is_empty() {
            return Err(ReportError::InvalidRequest(
                "Request body is empty".to_string(),
            ));
        }

        serde_json::from_str(body).map_err(|e| {
            log::debug!("Failed to parse request body: {}", e);
            ReportError::InvalidRequest("Invalid JSON format in request body".to_string())
        })
    }

    /// リクエストが妥当かどうかを返す。
    ///
    /// 開始日・終了日が両方設定され、開始日が終了日以前で、プロジェクト名が空でない場合に妥当とする。
    /// `0001-01-01`は未設定の日付とみなす。
    pub fn is_valid(&self) -> bool {
        let dates_ordered = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => !is_unset(start) && !is_unset(end) && start <= end,
            _ => false,
        };
        let has_project = self
            .project_name
            .as_deref()
            .map_or(false, |name| !name.is_empty());

        dates_ordered && has_project && self.offset().is_some()
    }

    /// レポートに表示するプロジェクト名を返す。
    pub fn filter_display_name(&self) -> String {
        self.project_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_PROJECT.to_string())
    }

    /// 時刻の表示に利用するタイムゾーンを返す。範囲外の時差は`None`。
    pub fn offset(&self) -> Option<FixedOffset> {
        let hours = self.time_offset.unwrap_or(0);
        if !(-23..=23).contains(&hours) {
            return None;
        }
        FixedOffset::east_opt(hours * 3600)
    }
}

/// 他システムが未設定の日付として送ってくる`0001-01-01`かどうか。
fn is_unset(date: NaiveDate) -> bool {
    date.year() == 1 && date.ordinal() == 1
}

/// `YYYY-MM-DD`または日時文字列を日付として読み込む。
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    value
        .map(|s| parse_date(&s).map_err(serde::de::Error::custom))
        .transpose()
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|datetime| datetime.date())
        .map_err(|_| format!("Invalid date: {}", s))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;

    use super::ReportRequest;
    use crate::error::ReportError;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn valid_request() -> ReportRequest {
        ReportRequest {
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 31),
            project_name: Some("TestProject".to_string()),
            hourly_rate: Some(100.0),
            time_offset: None,
        }
    }

    #[test]
    fn test_is_valid() {
        assert!(valid_request().is_valid());
    }

    #[test]
    fn test_is_valid_same_day() {
        let request = ReportRequest {
            end_date: date(2024, 1, 1),
            ..valid_request()
        };

        assert!(request.is_valid());
    }

    #[rstest]
    #[case::start_after_end(ReportRequest { start_date: date(2024, 1, 31), end_date: date(2024, 1, 1), ..valid_request() })]
    #[case::no_start(ReportRequest { start_date: None, ..valid_request() })]
    #[case::no_end(ReportRequest { end_date: None, ..valid_request() })]
    #[case::no_project(ReportRequest { project_name: None, ..valid_request() })]
    #[case::empty_project(ReportRequest { project_name: Some(String::new()), ..valid_request() })]
    #[case::offset_out_of_range(ReportRequest { time_offset: Some(24), ..valid_request() })]
    #[case::offset_negative_out_of_range(ReportRequest { time_offset: Some(-24), ..valid_request() })]
    #[case::offset_min_value(ReportRequest { time_offset: Some(i32::MIN), ..valid_request() })]
    #[case::offset_max_value(ReportRequest { time_offset: Some(i32::MAX), ..valid_request() })]
    #[case::unset_start(ReportRequest { start_date: date(1, 1, 1), ..valid_request() })]
    #[case::unset_both(ReportRequest { start_date: date(1, 1, 1), end_date: date(1, 1, 1), ..valid_request() })]
    fn test_is_invalid(#[case] request: ReportRequest) {
        assert!(!request.is_valid());
    }

    #[rstest]
    #[case::with_project(Some("TestProject"), "TestProject")]
    #[case::without_project(None, "Unknown")]
    fn test_filter_display_name(#[case] project: Option<&str>, #[case] expected: &str) {
        let request = ReportRequest {
            project_name: project.map(str::to_string),
            ..valid_request()
        };

        assert_eq!(request.filter_display_name(), expected);
    }

    #[test]
    fn test_from_json() {
        let body = r#"{
            "startDate": "2024-01-01",
            "endDate": "2024-01-31T00:00:00",
            "projectName": "TestProject",
            "hourlyRate": 80,
            "timeOffset": 9,
            "unknown": true
        }"#;

        let request = ReportRequest::from_json(body).unwrap();

        assert_eq!(request.start_date, date(2024, 1, 1));
        assert_eq!(request.end_date, date(2024, 1, 31));
        assert_eq!(request.project_name.as_deref(), Some("TestProject"));
        assert_eq!(request.hourly_rate, Some(80.0));
        assert_eq!(request.time_offset, Some(9));
    }

    #[rstest]
    #[case::min_offset(r#"{"startDate": "2024-01-01", "endDate": "2024-01-31", "projectName": "TestProject", "timeOffset": -2147483648}"#)]
    #[case::unset_date(r#"{"startDate": "0001-01-01T00:00:00", "endDate": "2024-01-31", "projectName": "TestProject"}"#)]
    fn test_from_json_rejected_by_validation(#[case] body: &str) {
        let request = ReportRequest::from_json(body).unwrap();

        assert!(!request.is_valid());
    }

    #[rstest]
    #[case(-23)]
    #[case(0)]
    #[case(23)]
    fn test_offset_in_range(#[case] hours: i32) {
        let request = ReportRequest {
            time_offset: Some(hours),
            ..valid_request()
        };

        assert_eq!(request.offset().unwrap().local_minus_utc(), hours * 3600);
        assert!(request.is_valid());
    }

    #[test]
    fn test_from_json_missing_fields() {
        let request = ReportRequest::from_json("{}").unwrap();

        assert_eq!(request, ReportRequest::default());
        assert!(!request.is_valid());
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::malformed("{ invalid json }")]
    #[case::bad_date(r#"{"startDate": "not a date"}"#)]
    fn test_from_json_invalid(#[case] body: &str) {
        let result = ReportRequest::from_json(body);

        assert!(matches!(result, Err(ReportError::InvalidRequest(_))));
    }
}
