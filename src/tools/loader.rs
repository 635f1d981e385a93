//! 测量文件读取模块
//!
//! 测量文件按行组织，每个数据段由一行标题开始，标题之后的第一个非空行是
//! 以 `;` 分隔的数值。读取失败不会中断批处理：文件会变成一条损坏记录。

use super::cli::AppConfig;
use super::constants::file_format::VALUE_SEPARATOR;
use super::utils;
use crate::error::{RangeError, RangeResult, format_error};
use crate::processing::MeasurementRecord;
use std::path::{Path, PathBuf};

/// 提取数据段
///
/// 找到第一个包含 `header` 的行，解析其后第一个非空行。空字段被忽略。
/// 找不到标题或标题后没有数据行时返回空向量。
///
/// # 错误
///
/// * `RangeError::FormatError` - 数据行中存在无法解析为浮点数的字段
pub fn extract_section(header: &str, lines: &[&str]) -> RangeResult<Vec<f64>> {
    let Some(start) = lines.iter().position(|line| line.contains(header)) else {
        return Ok(Vec::new());
    };

    let Some(data_line) = lines[start + 1..]
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
    else {
        return Ok(Vec::new());
    };

    data_line
        .split(VALUE_SEPARATOR)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|e| format_error(&format!("{header} 中的字段 '{token}'"), e))
        })
        .collect()
}

/// 读取一个测量文件
///
/// 文件不可读或数据段无法解析时返回带失败原因的损坏记录。
pub fn load_record(path: &Path, depth_header: &str, gain_header: &str) -> MeasurementRecord {
    let identifier = utils::extract_filename_lossy(path);

    match read_sections(path, depth_header, gain_header) {
        Ok((depths, gains)) => MeasurementRecord::new(identifier, depths, gains),
        Err(e) => {
            log::warn!("{identifier}: {e}");
            MeasurementRecord::corrupted(identifier, &e)
        }
    }
}

fn read_sections(
    path: &Path,
    depth_header: &str,
    gain_header: &str,
) -> RangeResult<(Vec<f64>, Vec<f64>)> {
    let content = std::fs::read_to_string(path).map_err(RangeError::IoError)?;
    let lines: Vec<&str> = content.lines().collect();

    let depths = extract_section(depth_header, &lines)?;
    let gains = extract_section(gain_header, &lines)?;
    Ok((depths, gains))
}

/// 按配置读取全部文件（保持输入顺序）
pub fn load_records(files: &[PathBuf], config: &AppConfig) -> Vec<MeasurementRecord> {
    files
        .iter()
        .map(|file| load_record(file, &config.depth_header, &config.gain_header))
        .collect()
}
