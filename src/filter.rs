use crate::time_entry::TimeEntry;

/// プロジェクト名でタイムエントリーを絞り込む。
///
/// プロジェクト名は大文字小文字を区別せずに完全一致で比較する。
/// `project_name`が未指定または空の場合は入力をそのまま返す。
pub fn filter_by_project(time_entries: Vec<TimeEntry>, project_name: Option<&str>) -> Vec<TimeEntry> {
    let target = match project_name {
        Some(name) if !name.is_empty() => name.to_lowercase(),
        _ => return time_entries,
    };

    time_entries
        .into_iter()
        .filter(|entry| {
            entry
                .project_name
                .as_deref()
                .map_or(false, |name| name.to_lowercase() == target)
        })
        .collect()
}
