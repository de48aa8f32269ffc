use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Toggl APIから取得したタイムエントリー。
///
/// `duration`が0以下のものは計測中(未完了)として扱う。
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TimeEntry {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
    pub duration: i64,
    #[serde(default)]
    pub workspace_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub server_deleted_at: Option<String>,
}

impl TimeEntry {
    /// 作業時間を時間単位で返す。未完了のエントリーは0とする。
    pub fn duration_in_hours(&self) -> f64 {
        if self.duration > 0 {
            self.duration as f64 / 3600.0
        } else {
            0.0
        }
    }

    pub fn is_completed(&self) -> bool {
        self.duration > 0
    }
}
