use log::{error, info};
#[cfg(test)]
use mockall::automock;
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::error::ReportError;
use crate::report::{ReportData, ReportRow};

const SHEET_NAME: &str = "Report";
const HEADERS: [&str; 7] = [
    "Date",
    "Project",
    "Description",
    "Duration (Hours)",
    "Tags",
    "Start Time",
    "End Time",
];

const DATE_COL: u16 = 0;
const PROJECT_COL: u16 = 1;
const DESCRIPTION_COL: u16 = 2;
const DURATION_COL: u16 = 3;
const TAGS_COL: u16 = 4;
const START_COL: u16 = 5;
const END_COL: u16 = 6;

/// 各列の最小幅。
const MIN_WIDTHS: [usize; 7] = [12, 15, 30, 12, 15, 10, 10];
const MAX_WIDTH: usize = 80;

const HEADER_COLOR: u32 = 0xADD8E6;
const SHADED_COLOR: u32 = 0xFAFAFA;

/// レポートを出力形式に変換するためのtrait。
#[cfg_attr(test, automock)]
pub trait ReportRenderer {
    /// レポートをバイト列に変換する。
    fn render(&self, data: &ReportData) -> Result<Vec<u8>, ReportError>;
}

/// レポートをExcel(xlsx)形式で出力する。
#[derive(Clone, Debug, Default)]
pub struct XlsxReportRenderer;

#[derive(Clone, Debug, PartialEq)]
enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellStyle {
    Header,
    Text,
    TextShaded,
    Hours,
    HoursShaded,
    Title,
    Summary,
    SummaryTotal,
}

/// シート上の1セル。行・列は0始まり。
#[derive(Clone, Debug, PartialEq)]
struct Cell {
    row: u32,
    col: u16,
    value: CellValue,
    style: CellStyle,
}

impl Cell {
    fn text(row: u32, col: u16, value: impl Into<String>, style: CellStyle) -> Self {
        Self {
            row,
            col,
            value: CellValue::Text(value.into()),
            style,
        }
    }

    fn number(row: u32, col: u16, value: f64, style: CellStyle) -> Self {
        Self {
            row,
            col,
            value: CellValue::Number(value),
            style,
        }
    }

    /// 列幅の計算に使う表示文字数。
    fn display_width(&self) -> usize {
        match &self.value {
            CellValue::Text(text) => text.chars().count(),
            CellValue::Number(number) => format!("{:.2}", number).len(),
            CellValue::Blank => 0,
        }
    }
}

struct Formats {
    header: Format,
    text: Format,
    text_shaded: Format,
    hours: Format,
    hours_shaded: Format,
    title: Format,
    summary: Format,
    summary_total: Format,
}

impl Formats {
    fn new() -> Self {
        let text = Format::new().set_border(FormatBorder::Thin);
        let hours = text.clone().set_num_format("0.00");

        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(HEADER_COLOR)
                .set_border(FormatBorder::Thin),
            text_shaded: text.clone().set_background_color(SHADED_COLOR),
            hours_shaded: hours.clone().set_background_color(SHADED_COLOR),
            text,
            hours,
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_border(FormatBorder::Thin),
            summary: Format::new().set_border(FormatBorder::Thin),
            summary_total: Format::new()
                .set_bold()
                .set_num_format("0.00")
                .set_border(FormatBorder::Thin),
        }
    }

    fn get(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Header => &self.header,
            CellStyle::Text => &self.text,
            CellStyle::TextShaded => &self.text_shaded,
            CellStyle::Hours => &self.hours,
            CellStyle::HoursShaded => &self.hours_shaded,
            CellStyle::Title => &self.title,
            CellStyle::Summary => &self.summary,
            CellStyle::SummaryTotal => &self.summary_total,
        }
    }
}

impl XlsxReportRenderer {
    pub fn new() -> Self {
        Self
    }

    fn build(&self, data: &ReportData) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let formats = Formats::new();
        let cells = layout(data);

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for cell in &cells {
            write_cell(sheet, cell, &formats)?;
        }
        set_column_widths(sheet, &cells, summary_top(data.rows.len()))?;

        workbook.save_to_buffer()
    }
}

impl ReportRenderer for XlsxReportRenderer {
    fn render(&self, data: &ReportData) -> Result<Vec<u8>, ReportError> {
        info!("Generating Excel report with {} rows", data.rows.len());

        let bytes = self.build(data).map_err(|e| {
            error!("Error generating Excel report: {}", e);
            ReportError::Render(e.to_string())
        })?;

        info!("Excel report generated successfully");
        Ok(bytes)
    }
}

fn write_cell(sheet: &mut Worksheet, cell: &Cell, formats: &Formats) -> Result<(), XlsxError> {
    let format = formats.get(cell.style);
    match &cell.value {
        CellValue::Text(text) => sheet.write_string_with_format(cell.row, cell.col, text, format)?,
        CellValue::Number(number) => {
            sheet.write_number_with_format(cell.row, cell.col, *number, format)?
        }
        CellValue::Blank => sheet.write_blank(cell.row, cell.col, format)?,
    };
    Ok(())
}

/// サマリーの先頭行。データ行の後に1行空ける。
fn summary_top(row_count: usize) -> u32 {
    row_count as u32 + 2
}

/// シートに書き込むセルの一覧を返す。
///
/// 1行目がヘッダー、その直下からデータ行、空行を1行挟んでサマリーとなる。
fn layout(data: &ReportData) -> Vec<Cell> {
    let mut cells: Vec<Cell> = HEADERS
        .iter()
        .enumerate()
        .map(|(col, header)| Cell::text(0, col as u16, *header, CellStyle::Header))
        .collect();

    for (i, row) in data.rows.iter().enumerate() {
        cells.extend(row_cells(i as u32 + 1, row, i % 2 == 1));
    }

    cells.extend(summary_cells(data));
    cells
}

/// データ行1行分のセル。奇数行は背景色を変える。
fn row_cells(excel_row: u32, row: &ReportRow, shaded: bool) -> Vec<Cell> {
    let (text, hours) = if shaded {
        (CellStyle::TextShaded, CellStyle::HoursShaded)
    } else {
        (CellStyle::Text, CellStyle::Hours)
    };
    let end_time = row
        .end_time
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_default();

    vec![
        Cell::text(excel_row, DATE_COL, row.date.format("%Y-%m-%d").to_string(), text),
        Cell::text(excel_row, PROJECT_COL, row.project_name.as_str(), text),
        Cell::text(excel_row, DESCRIPTION_COL, row.description.as_str(), text),
        Cell::number(excel_row, DURATION_COL, round2(row.duration), hours),
        Cell::text(excel_row, TAGS_COL, row.tags.as_str(), text),
        Cell::text(excel_row, START_COL, row.start_time.format("%H:%M").to_string(), text),
        Cell::text(excel_row, END_COL, end_time, text),
    ]
}

fn summary_cells(data: &ReportData) -> Vec<Cell> {
    let top = summary_top(data.rows.len());
    let period = format!(
        "{} to {}",
        data.start_date.format("%Y-%m-%d"),
        data.end_date.format("%Y-%m-%d")
    );

    vec![
        Cell::text(top, 0, "Report Summary", CellStyle::Title),
        Cell {
            row: top,
            col: 1,
            value: CellValue::Blank,
            style: CellStyle::Summary,
        },
        Cell::text(top + 1, 0, "Period:", CellStyle::Summary),
        Cell::text(top + 1, 1, period, CellStyle::Summary),
        Cell::text(top + 2, 0, "Project:", CellStyle::Summary),
        Cell::text(top + 2, 1, data.project_name.as_str(), CellStyle::Summary),
        Cell::text(top + 3, 0, "Total Hours:", CellStyle::Summary),
        Cell::number(top + 3, 1, round2(data.total_hours), CellStyle::SummaryTotal),
        Cell::text(top + 4, 0, "Total Entries:", CellStyle::Summary),
        Cell::number(top + 4, 1, data.rows.len() as f64, CellStyle::Summary),
    ]
}

/// ヘッダーとデータ行の内容に合わせて列幅を設定する。最小幅より狭くはしない。
fn set_column_widths(sheet: &mut Worksheet, cells: &[Cell], summary_top: u32) -> Result<(), XlsxError> {
    let mut widths = MIN_WIDTHS;
    for cell in cells.iter().filter(|cell| cell.row < summary_top) {
        let width = &mut widths[cell.col as usize];
        *width = (*width).max(cell.display_width() + 2).min(MAX_WIDTH);
    }

    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, *width as f64)?;
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
