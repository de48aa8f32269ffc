use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

use crate::request::ReportRequest;
use crate::time_entry::TimeEntry;

const NO_DESCRIPTION: &str = "No Description";
const NO_PROJECT: &str = "No Project";

/// レポートの1行。完了したタイムエントリー1件に対応する。
#[derive(Clone, Debug, PartialEq)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub project_name: String,
    pub description: String,
    /// 時間単位の作業時間。常に正の値。
    pub duration: f64,
    /// `, `区切りのタグ。
    pub tags: String,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
}

/// レポート全体の集計結果。
#[derive(Clone, Debug, PartialEq)]
pub struct ReportData {
    /// 開始時刻の昇順。
    pub rows: Vec<ReportRow>,
    /// 表示およびファイル名に利用するプロジェクト名。
    pub project_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_hours: f64,
}

/// タイムエントリーをレポートの行に変換し、合計時間を計算する。
///
/// 未完了(`duration`が0以下)のエントリーは集計対象外とする。
/// 日付と時刻はリクエストの時差を適用して表示する。
pub fn aggregate(time_entries: &[TimeEntry], request: &ReportRequest) -> ReportData {
    let offset = request.offset().unwrap_or_else(|| Utc.fix());

    let mut completed: Vec<&TimeEntry> = time_entries
        .iter()
        .filter(|entry| entry.is_completed())
        .collect();
    completed.sort_by_key(|entry| entry.start);

    let rows: Vec<ReportRow> = completed
        .into_iter()
        .map(|entry| to_row(entry, &offset))
        .collect();
    let total_hours = rows.iter().map(|row| row.duration).sum();

    ReportData {
        rows,
        project_name: request.filter_display_name(),
        start_date: request.start_date.unwrap_or_default(),
        end_date: request.end_date.unwrap_or_default(),
        total_hours,
    }
}

fn to_row(entry: &TimeEntry, offset: &FixedOffset) -> ReportRow {
    let start = entry.start.with_timezone(offset);
    let tags = entry
        .tags
        .as_ref()
        .map(|tags| tags.join(", "))
        .unwrap_or_default();

    ReportRow {
        date: start.date_naive(),
        project_name: entry
            .project_name
            .clone()
            .unwrap_or_else(|| NO_PROJECT.to_string()),
        description: entry
            .description
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        duration: entry.duration_in_hours(),
        tags,
        start_time: start.time(),
        end_time: entry.stop.map(|stop| stop.with_timezone(offset).time()),
    }
}
