//! Bragg Range Tool - 布拉格峰远端射程（R80）分析工具
//!
//! 从深度-剂量测量曲线中提取远端80%射程，并用 bootstrap 重采样估计其误差。
//!
//! ## 核心特性
//! - 平滑样条拟合：s = 0 为 not-a-knot 三次插值，s > 0 为惩罚平滑样条
//! - 两次拟合求 R80：先找峰值，再对平移后的数据重新拟合求远端交点
//! - ROI 内有放回重采样，独立随机流，可选固定种子
//! - 批量分析：按文件名数字排序，损坏文件不会中断整批运行
//! - rayon 文件级与重采样级并行

pub mod core;
pub mod error;
pub mod processing;
pub mod tools;
pub mod utils;

// 重新导出核心类型
pub use crate::core::{
    BootstrapConfig, BootstrapEstimator, BootstrapResult, Curve, R80Extractor, Roi,
    SmoothingSpline, calculate_r80,
};
pub use error::{ErrorCategory, RangeError, RangeResult};
pub use processing::{BatchDriver, BatchMode, MeasurementRecord, ResultRow, ResultTable};
pub use utils::DiagnosticsGuard;
