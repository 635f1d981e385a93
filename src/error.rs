//! 统一错误处理框架
//!
//! 射程分析流水线的错误类型定义。单条记录/单次重采样的失败在局部被吸收，
//! 只有配置错误会终止整个运行。

use std::fmt;
use std::io;

/// 射程分析相关的统一错误类型
#[derive(Debug)]
pub enum RangeError {
    /// 输入/配置验证错误（唯一会终止整批运行的类别）
    InvalidInput(String),

    /// 文件I/O错误
    IoError(io::Error),

    /// 测量文件格式错误（数据段无法解析）
    FormatError(String),

    /// 样条拟合失败（不同深度点过少、方程组奇异、非有限数据）
    FitFailure(String),

    /// 平滑曲线在峰值之后没有穿过80%阈值
    NoDistalRoot {
        /// 峰值深度
        peak_depth: f64,
        /// 80%阈值
        threshold: f64,
    },

    /// 数据不足（数组为空/长度不匹配、重采样后去重点数不足）
    InsufficientData(String),

    /// ROI 内点数不足，bootstrap 结果不可靠
    DegenerateRoi {
        /// ROI 内实际点数
        points: usize,
        /// 要求的最少点数
        required: usize,
    },

    /// 资源访问错误（线程池创建失败等）
    ResourceError(String),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::InvalidInput(msg) => write!(f, "输入验证失败 / Invalid input: {msg}"),
            RangeError::IoError(err) => write!(f, "文件I/O错误 / I/O error: {err}"),
            RangeError::FormatError(msg) => write!(f, "测量文件格式错误 / Format error: {msg}"),
            RangeError::FitFailure(msg) => write!(f, "样条拟合失败 / Spline fit failed: {msg}"),
            RangeError::NoDistalRoot {
                peak_depth,
                threshold,
            } => write!(
                f,
                "峰值({peak_depth:.3})之后未找到80%交点 / No distal crossing of {threshold:.4} past peak at {peak_depth:.3}"
            ),
            RangeError::InsufficientData(msg) => {
                write!(f, "数据不足 / Insufficient data: {msg}")
            }
            RangeError::DegenerateRoi { points, required } => write!(
                f,
                "ROI 内仅有 {points} 个点（至少需要 {required}） / Region of interest holds {points} points, {required} required"
            ),
            RangeError::ResourceError(msg) => write!(f, "资源访问错误 / Resource error: {msg}"),
        }
    }
}

impl std::error::Error for RangeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RangeError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for RangeError {
    fn from(err: io::Error) -> Self {
        RangeError::IoError(err)
    }
}

/// 射程分析操作的标准Result类型
pub type RangeResult<T> = Result<T, RangeError>;

// ==================== 错误转换Helper函数 ====================

/// 创建格式错误的helper函数
#[inline]
pub fn format_error<E: fmt::Display>(context: &str, err: E) -> RangeError {
    RangeError::FormatError(format!("{context}: {err}"))
}

// ==================== 错误分类系统 ====================
// 用于批量处理中的错误统计

/// 错误类别枚举（用于批量处理统计）
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum ErrorCategory {
    /// 读取/格式相关（文件不可读、数据段损坏）
    Input,
    /// 数据不足（数组缺失或长度不匹配）
    Data,
    /// 拟合/求根相关（样条失败、无远端交点）
    Fit,
    /// 其他未分类错误
    Other,
}

impl ErrorCategory {
    /// 从RangeError提取错误类别
    pub fn from_range_error(e: &RangeError) -> Self {
        match e {
            RangeError::IoError(_) | RangeError::FormatError(_) => Self::Input,
            RangeError::InsufficientData(_) | RangeError::DegenerateRoi { .. } => Self::Data,
            RangeError::FitFailure(_) | RangeError::NoDistalRoot { .. } => Self::Fit,
            RangeError::InvalidInput(_) | RangeError::ResourceError(_) => Self::Other,
        }
    }

    /// 获取错误类别的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Input => "读取错误 / Input",
            Self::Data => "数据不足 / Data",
            Self::Fit => "拟合失败 / Fit",
            Self::Other => "其他错误 / Other",
        }
    }
}
