//! 文件扫描模块
//!
//! 负责扫描目录中的测量文件，并生成批量报告的头部和统计信息。

use super::batch_state::BatchStatsSnapshot;
use super::cli::AppConfig;
use super::utils;
use crate::error::{RangeError, RangeResult};
use crate::processing::numeric_sort_key;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 扫描目录中的测量文件
///
/// 扩展名匹配大小写不敏感；`recursive` 为 false 时只扫描第一层。
/// 结果按文件名中的数字排序（无数字的排在最后，其余按文件名）。
pub fn scan_measurement_files(
    dir_path: &Path,
    extension: &str,
    recursive: bool,
) -> RangeResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(RangeError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(RangeError::InvalidInput(format!(
            "路径不是目录: {}",
            dir_path.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(dir_path).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("跳过无法访问的路径 / skipping unreadable entry: {e}");
                continue;
            }
        };

        if entry.file_type().is_file() && utils::has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }

    files.sort_by(|a, b| {
        let name_a = utils::extract_filename(a);
        let name_b = utils::extract_filename(b);
        let key_a = numeric_sort_key(name_a).map_or((1u8, 0), |k| (0u8, k));
        let key_b = numeric_sort_key(name_b).map_or((1u8, 0), |k| (0u8, k));
        key_a.cmp(&key_b).then_with(|| a.cmp(b))
    });

    Ok(files)
}

/// 显示文件扫描结果
pub fn show_scan_results(config: &AppConfig, files: &[PathBuf]) {
    if files.is_empty() {
        println!(
            "⚠️  在目录 {} 中没有找到 .{} 测量文件",
            config.input_path.display(),
            config.extension
        );
        return;
    }

    println!("📁 扫描目录: {}", config.input_path.display());
    println!("📈 找到 {} 个测量文件", files.len());

    if config.verbose {
        for (i, file) in files.iter().enumerate() {
            println!("   {}. {}", i + 1, utils::extract_filename_lossy(file));
        }
    }
    println!();
}

/// 生成批量报告的头部信息
pub fn create_batch_output_header(config: &AppConfig, file_count: usize) -> String {
    let mut output = String::new();

    output.push_str("=====================================\n");
    output.push_str("   Bragg Range Analysis Report\n");
    output.push_str("   远端80%射程批量分析结果\n");
    output.push_str("=====================================\n\n");

    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    output.push_str(&format!("🔧 工具版本: v{VERSION}\n"));
    output.push_str(&format!("🕒 生成时间: {now}\n"));
    output.push_str(&format!("📁 扫描目录: {}\n", config.input_path.display()));
    output.push_str(&format!("📈 处理文件数: {file_count}\n"));

    if config.with_errors {
        output.push_str(&format!(
            "🎲 误差模式: {} 次 bootstrap, s = {}",
            config.n_bootstraps, config.smoothing
        ));
        if let Some(seed) = config.seed {
            output.push_str(&format!(", seed = {seed}"));
        }
        output.push('\n');
    } else {
        output.push_str("📏 射程模式: 仅计算 R80\n");
    }
    output.push('\n');

    output
}

/// 生成批量报告的统计信息
pub fn create_batch_output_footer(stats: &BatchStatsSnapshot) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("=====================================\n");
    output.push_str("批量处理统计:\n");
    output.push_str(&format!("   总文件数: {}\n", stats.total()));
    output.push_str(&format!("   成功处理: {}\n", stats.processed));
    output.push_str(&format!("   处理失败: {}\n", stats.failed));
    if stats.without_error > 0 {
        output.push_str(&format!("   无误差估计: {}\n", stats.without_error));
    }
    output.push_str(&format!("   处理成功率: {:.1}%\n", stats.success_rate()));

    if !stats.error_stats.is_empty() {
        output.push_str("\n失败原因:\n");
        let mut categories: Vec<_> = stats.error_stats.iter().collect();
        categories.sort_by_key(|(category, _)| **category);
        for (category, files) in categories {
            output.push_str(&format!(
                "   {}: {} 个文件\n",
                category.display_name(),
                files.len()
            ));
            for file in files {
                output.push_str(&format!("      - {file}\n"));
            }
        }
    }

    output.push('\n');
    output.push_str(&format!("生成工具: Bragg Range Tool v{VERSION}\n"));

    output
}

/// 显示批量处理完成信息
pub fn show_batch_completion_info(
    output_path: Option<&Path>,
    stats: &BatchStatsSnapshot,
    config: &AppConfig,
) {
    println!();
    println!("📊 批量处理完成!");
    println!("   成功处理: {} / {} 个文件", stats.processed, stats.total());
    if stats.failed > 0 {
        println!("   失败文件: {} 个", stats.failed);
        if config.verbose {
            for (category, files) in &stats.error_stats {
                println!("   {}: {}", category.display_name(), files.join(", "));
            }
        }
    }
    if stats.without_error > 0 {
        println!("   ⚠️  {} 个文件未能给出误差估计", stats.without_error);
    }

    if let Some(path) = output_path {
        println!();
        println!("📄 结果已保存到: {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bragg_scanner_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_scan_missing_directory() {
        let result = scan_measurement_files(Path::new("/definitely/not/here"), "csv", false);
        assert!(matches!(result, Err(RangeError::IoError(_))));
    }

    #[test]
    fn test_scan_numeric_order_and_extension() {
        let dir = scratch_dir("order");
        for name in ["curve_3.csv", "curve_10.CSV", "curve_1.csv", "notes.txt", "readme.csv"] {
            std::fs::write(dir.join(name), "").unwrap();
        }

        let files = scan_measurement_files(&dir, "csv", false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| utils::extract_filename(f)).collect();
        assert_eq!(names, ["curve_1.csv", "curve_3.csv", "curve_10.CSV", "readme.csv"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_scan_recursive_flag() {
        let dir = scratch_dir("recursive");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("curve_1.csv"), "").unwrap();
        std::fs::write(dir.join("nested").join("curve_2.csv"), "").unwrap();

        assert_eq!(scan_measurement_files(&dir, "csv", false).unwrap().len(), 1);
        assert_eq!(scan_measurement_files(&dir, "csv", true).unwrap().len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
