use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::ReportError;
use crate::excel::ReportRenderer;
use crate::file_name::report_file_name;
use crate::filter::filter_by_project;
use crate::report::aggregate;
use crate::request::ReportRequest;
use crate::toggl::TimeEntryRepository;

/// 生成したレポート。
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReport {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// タイムエントリーの取得からレポートの出力までを行う。
pub struct ReportService<'a, T: TimeEntryRepository, R: ReportRenderer> {
    repository: &'a T,
    renderer: &'a R,
}

impl<'a, T: TimeEntryRepository, R: ReportRenderer> ReportService<'a, T, R> {
    /// 新しい`ReportService`を返す。
    ///
    /// # Arguments
    /// * `repository` - タイムエントリーの取得元
    /// * `renderer` - レポートの出力形式
    pub fn new(repository: &'a T, renderer: &'a R) -> Self {
        Self {
            repository,
            renderer,
        }
    }

    /// リクエストに従ってレポートを生成する。
    ///
    /// リクエストが不正な場合は、Toggl APIへ問い合わせる前に`ReportError::InvalidRequest`を返す。
    /// 該当するエントリーがない場合もエラーにはせず、空のレポートを返す。
    pub async fn generate(
        &self,
        request: &ReportRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedReport, ReportError> {
        let (start_date, end_date) = match (request.is_valid(), request.start_date, request.end_date) {
            (true, Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ReportError::InvalidRequest(
                    "Invalid request parameters. StartDate must be <= EndDate, and ProjectName must be provided"
                        .to_string(),
                ))
            }
        };
        info!(
            "Generating report for period {} to {}, Project: {}, Hourly rate: {:?}",
            start_date,
            end_date,
            request.filter_display_name(),
            request.hourly_rate
        );

        let time_entries = self
            .repository
            .read_time_entries(start_date, end_date, cancel)
            .await?;
        let time_entries = filter_by_project(time_entries, request.project_name.as_deref());
        info!("Found {} time entries matching criteria", time_entries.len());
        if time_entries.is_empty() {
            warn!("No time entries found for the given criteria");
        }

        let data = aggregate(&time_entries, request);
        let bytes = self.renderer.render(&data)?;
        let file_name = report_file_name(&data);

        info!(
            "Report generated successfully. File: {}, Rows: {}, Total Hours: {}",
            file_name,
            data.rows.len(),
            data.total_hours
        );

        Ok(GeneratedReport { bytes, file_name })
    }
}
