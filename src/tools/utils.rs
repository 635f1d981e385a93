//! 工具函数模块
//!
//! 提供文件路径处理、数值显示和并发度计算等通用工具函数。

use super::constants::parallel_limits::{MAX_PARALLEL_DEGREE, MIN_PARALLEL_DEGREE};

/// 文件路径处理工具函数
pub mod path {
    use std::path::Path;

    /// 提取文件名（统一处理路径提取逻辑）
    #[inline]
    pub fn extract_filename(path: &Path) -> &str {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
    }

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 获取父目录，如果不存在则返回当前目录
    #[inline]
    pub fn get_parent_dir(path: &Path) -> &Path {
        path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// 扩展名是否匹配（大小写不敏感）
    #[inline]
    pub fn has_extension(path: &Path, extension: &str) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// 数值显示工具函数
pub mod display {
    /// 可选数值的文本表示，未定义时为 `NaN`
    #[inline]
    pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
        match value {
            Some(v) if v.is_finite() => format!("{v:.decimals$}"),
            _ => "NaN".to_string(),
        }
    }
}

/// 把请求的并发度限制在允许范围内
#[inline]
pub fn effective_parallel_degree(requested: usize) -> usize {
    requested.clamp(MIN_PARALLEL_DEGREE, MAX_PARALLEL_DEGREE)
}

// 重新导出为平级函数
pub use display::format_optional;
pub use path::{extract_filename, extract_filename_lossy, get_parent_dir, has_extension};
