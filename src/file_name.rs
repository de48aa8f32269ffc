use crate::report::ReportData;

/// Windowsを含む主要なファイルシステムでファイル名に使えない文字。
fn is_invalid_file_name_char(c: char) -> bool {
    matches!(c, '"' | '<' | '>' | '|' | ':' | '*' | '?' | '\\' | '/') || c.is_ascii_control()
}

/// レポートのファイル名を返す。
///
/// `HourReport_<プロジェクト名>_<月名>_<年>.xlsx`の形式で、月と年は開始日から決める。
pub fn report_file_name(data: &ReportData) -> String {
    format!(
        "HourReport_{}_{}.xlsx",
        sanitize_file_name(&data.project_name),
        data.start_date.format("%B_%Y")
    )
}

/// ファイル名に使えない文字で分割し、空でない部分を`_`で連結する。
pub fn sanitize_file_name(name: &str) -> String {
    name.split(is_invalid_file_name_char)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
