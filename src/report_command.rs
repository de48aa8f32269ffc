use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::error::ReportError;
use crate::excel::ReportRenderer;
use crate::report_service::ReportService;
use crate::request::ReportRequest;
use crate::toggl::TimeEntryRepository;

/// `report`サブコマンドの引数。
///
/// `--request`でJSONのリクエストを読み込んだ場合も、コマンドラインで指定した値を優先する。
#[derive(Debug, Default, clap::Args)]
pub struct ReportArgs {
    #[clap(
        short = 's',
        long = "start",
        help = "Start date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    start: Option<NaiveDate>,

    #[clap(
        short = 'e',
        long = "end",
        help = "End date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    end: Option<NaiveDate>,

    #[clap(short = 'p', long = "project", help = "Project name to report on")]
    project: Option<String>,

    #[clap(long = "rate", help = "Hourly rate")]
    rate: Option<f64>,

    #[clap(
        long = "offset",
        help = "Hours east of UTC used to display dates and times",
        allow_hyphen_values = true
    )]
    offset: Option<i32>,

    #[clap(
        short = 'r',
        long = "request",
        help = "Read the request from a JSON file",
        parse(from_os_str)
    )]
    request: Option<PathBuf>,

    #[clap(
        short = 'o',
        long = "output-dir",
        help = "Directory to write the report to",
        parse(from_os_str),
        default_value = "."
    )]
    output_dir: PathBuf,
}

/// `report`サブコマンド。
pub struct ReportCommand<'a, T: TimeEntryRepository, R: ReportRenderer> {
    service: ReportService<'a, T, R>,
}

impl<'a, T: TimeEntryRepository, R: ReportRenderer> ReportCommand<'a, T, R> {
    /// 新しい`ReportCommand`を返す。
    pub fn new(repository: &'a T, renderer: &'a R) -> Self {
        Self {
            service: ReportService::new(repository, renderer),
        }
    }

    /// レポートを生成し、出力先ディレクトリに書き込む。
    ///
    /// 書き込んだファイルのパスを返す。
    pub async fn run(&self, args: ReportArgs, cancel: &CancellationToken) -> Result<PathBuf, ReportError> {
        let request = build_request(&args)?;
        let report = self.service.generate(&request, cancel).await?;

        let path = args.output_dir.join(&report.file_name);
        fs::write(&path, &report.bytes)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());

        Ok(path)
    }
}

/// 引数からリクエストを組み立てる。
fn build_request(args: &ReportArgs) -> Result<ReportRequest, ReportError> {
    let base = match &args.request {
        Some(path) => {
            let body = fs::read_to_string(path).map_err(|e| {
                ReportError::InvalidRequest(format!(
                    "Failed to read request file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            ReportRequest::from_json(&body)?
        }
        None => ReportRequest::default(),
    };

    Ok(ReportRequest {
        start_date: args.start.or(base.start_date),
        end_date: args.end.or(base.end_date),
        project_name: args.project.clone().or(base.project_name),
        hourly_rate: args.rate.or(base.hourly_rate),
        time_offset: args.offset.or(base.time_offset),
    })
}

/// 日付をパースする。
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}
