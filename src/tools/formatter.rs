//! 输出格式化模块
//!
//! 负责把结果表渲染为控制台表格、CSV、JSON 或带统计信息的文本报告。
//! 未定义的数值在文本/CSV 中显示为 `NaN`，在 JSON 中为 `null`。

use super::batch_state::BatchStatsSnapshot;
use super::cli::AppConfig;
use super::constants::defaults::DECIMALS;
use super::scanner::{create_batch_output_footer, create_batch_output_header};
use super::utils::format_optional;
use crate::error::{RangeError, RangeResult};
use crate::processing::{ResultRow, ResultTable};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use unicode_width::UnicodeWidthStr;

/// 输出格式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
    Report,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "report" | "txt" => Ok(OutputFormat::Report),
            _ => Err(format!("Unknown format: {s}")),
        }
    }
}

/// 一行中各列的文本值（与 `ResultTable::columns` 对应）
fn row_values(row: &ResultRow, with_errors: bool) -> Vec<String> {
    let mut values = vec![
        row.identifier.clone(),
        format_optional(row.r80, DECIMALS),
    ];
    if with_errors {
        values.push(format_optional(row.error, DECIMALS));
        values.push(format_optional(row.percentage_error, DECIMALS));
    }
    values
}

/// 控制台表格
pub fn format_table(table: &ResultTable) -> String {
    let mut output = Table::new();
    output.load_preset(UTF8_FULL);
    output.set_content_arrangement(ContentArrangement::Dynamic);
    output.set_header(table.columns().to_vec());

    for row in &table.rows {
        let values = row_values(row, table.with_errors);
        let mut cells = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            let cell = Cell::new(value);
            cells.push(if i == 0 {
                cell
            } else {
                cell.set_alignment(CellAlignment::Right)
            });
        }
        output.add_row(cells);
    }

    format!("{output}\n")
}

/// CSV 文本
pub fn format_csv(table: &ResultTable) -> String {
    let mut output = table.columns().join(",");
    output.push('\n');

    for row in &table.rows {
        let values: Vec<String> = row_values(row, table.with_errors)
            .into_iter()
            .map(|value| escape_csv_field(&value))
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }

    output
}

fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// JSON 文本
pub fn format_json(table: &ResultTable) -> RangeResult<String> {
    serde_json::to_string_pretty(table)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| RangeError::FormatError(format!("JSON 序列化失败: {e}")))
}

/// 文本报告的结果区（按显示宽度对齐，文件名可包含中文）
pub fn format_report_body(table: &ResultTable) -> String {
    let columns = table.columns();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row_values(row, table.with_errors))
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for values in &rows {
        for (width, value) in widths.iter_mut().zip(values) {
            *width = (*width).max(value.width());
        }
    }

    let mut output = String::new();
    push_report_line(&mut output, columns.iter().copied(), &widths);
    output.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    output.push('\n');
    for values in &rows {
        push_report_line(&mut output, values.iter().map(String::as_str), &widths);
    }

    output
}

fn push_report_line<'a>(output: &mut String, values: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let cells: Vec<String> = values
        .zip(widths)
        .enumerate()
        .map(|(i, (value, &width))| {
            let padding = " ".repeat(width.saturating_sub(value.width()));
            if i == 0 {
                format!("{value}{padding}")
            } else {
                format!("{padding}{value}")
            }
        })
        .collect();
    output.push_str(cells.join("  ").trim_end());
    output.push('\n');
}

/// 按配置的格式渲染结果
pub fn render(
    table: &ResultTable,
    config: &AppConfig,
    stats: &BatchStatsSnapshot,
) -> RangeResult<String> {
    match config.format {
        OutputFormat::Table => Ok(format_table(table)),
        OutputFormat::Csv => Ok(format_csv(table)),
        OutputFormat::Json => format_json(table),
        OutputFormat::Report => {
            let mut output = create_batch_output_header(config, table.len());
            output.push_str(&format_report_body(table));
            output.push_str(&create_batch_output_footer(stats));
            Ok(output)
        }
    }
}

/// 处理输出写入（文件或控制台）
pub fn write_output(output: &str, config: &AppConfig) -> RangeResult<()> {
    match &config.output_path {
        Some(output_path) => {
            std::fs::write(output_path, output).map_err(RangeError::IoError)?;
        }
        None => {
            print!("{output}");
        }
    }
    Ok(())
}
