//! 核心算法模块
//!
//! 包含曲线数据结构、平滑样条、R80 提取和 bootstrap 误差估计。

pub mod bootstrap;
pub mod curve;
pub mod r80;
pub mod spline;

// 重新导出公共接口
pub use bootstrap::{
    BootstrapConfig, BootstrapEstimator, BootstrapResult, BootstrapSummary, MIN_ROI_POINTS, Roi,
};
pub use curve::{Curve, DepthSignalSample, bortfeld, linspace};
pub use r80::{R80Analysis, R80Extractor, calculate_r80};
pub use spline::SmoothingSpline;
