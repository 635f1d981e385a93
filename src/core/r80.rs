//! 远端80%射程（R80）提取
//!
//! 算法：
//! 1. 以平滑因子 `s` 拟合主样条
//! 2. 在 [最小深度, 最大深度] 上均匀取 2000 个点求值，找到最大值 `y_max` 及其深度 `x_peak`
//!    （并列最大值取第一个）
//! 3. 阈值 `y_80 = 0.8 · y_max`
//! 4. 对 (深度, 信号 − y_80) 以相同的 `s` 重新拟合，求全部实根
//! 5. 只保留深度大于 `x_peak` 的根（排除上升沿的近端交点），取最小者
//!
//! 第4步对平移后的数据重新平滑，而不是直接平移第一次拟合的结果，
//! 两次拟合使用完全一致的平滑语义。

use crate::core::curve::{Curve, linspace};
use crate::core::spline::SmoothingSpline;
use crate::error::{RangeError, RangeResult};
use serde::Serialize;

/// 默认求值网格点数
pub const DEFAULT_EVALUATION_POINTS: usize = 2000;

/// 远端射程对应的剂量比例
pub const DISTAL_LEVEL: f64 = 0.80;

/// R80 的完整分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct R80Analysis {
    /// 远端80%射程
    pub r80: f64,
    /// 峰值深度
    pub peak_depth: f64,
    /// 峰值（平滑曲线最大值）
    pub peak_signal: f64,
    /// 阈值 = level × 峰值
    pub threshold: f64,
    /// 峰值之后的全部交点（升序）
    pub distal_roots: Vec<f64>,
}

/// R80 提取器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct R80Extractor {
    smoothing: f64,
    evaluation_points: usize,
    level: f64,
}

impl Default for R80Extractor {
    fn default() -> Self {
        Self {
            smoothing: 0.0,
            evaluation_points: DEFAULT_EVALUATION_POINTS,
            level: DISTAL_LEVEL,
        }
    }
}

impl R80Extractor {
    /// 以给定平滑因子创建提取器
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing,
            ..Self::default()
        }
    }

    /// 设置求值网格点数
    pub fn with_evaluation_points(mut self, points: usize) -> Self {
        self.evaluation_points = points;
        self
    }

    /// 设置剂量比例（默认 0.8）
    pub fn with_level(mut self, level: f64) -> Self {
        self.level = level;
        self
    }

    #[inline]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// 计算 R80；任何失败都返回 None（"未定义"）
    pub fn extract(&self, curve: &Curve) -> Option<f64> {
        self.analyze(curve).ok().map(|analysis| analysis.r80)
    }

    /// 计算 R80 并返回峰值、阈值等中间量
    ///
    /// # 错误
    ///
    /// * `RangeError::FitFailure` - 任一次样条拟合失败，或求值网格落在定义域外
    /// * `RangeError::InsufficientData` - 求值网格为空
    /// * `RangeError::NoDistalRoot` - 峰值之后没有交点
    pub fn analyze(&self, curve: &Curve) -> RangeResult<R80Analysis> {
        let primary = SmoothingSpline::fit_quiet(curve, self.smoothing)?;

        let (min_depth, max_depth) = primary.domain();
        let grid = linspace(min_depth, max_depth, self.evaluation_points);
        let values = primary.evaluate_many(&grid).ok_or_else(|| {
            RangeError::FitFailure("求值网格超出样条定义域 / grid outside spline domain".to_string())
        })?;

        let (peak_index, peak_signal) = first_maximum(&values).ok_or_else(|| {
            RangeError::InsufficientData("求值网格为空 / empty evaluation grid".to_string())
        })?;
        let peak_depth = grid[peak_index];
        let threshold = self.level * peak_signal;

        let shifted = SmoothingSpline::fit_quiet(&curve.shifted(threshold), self.smoothing)?;
        let distal_roots: Vec<f64> = shifted
            .roots()
            .into_iter()
            .filter(|&root| root > peak_depth)
            .collect();

        let r80 = distal_roots
            .iter()
            .copied()
            .min_by(f64::total_cmp)
            .ok_or(RangeError::NoDistalRoot {
                peak_depth,
                threshold,
            })?;

        log::trace!(
            "R80={r80:.4} (峰值 {peak_signal:.4} @ {peak_depth:.4}, 阈值 {threshold:.4})"
        );

        Ok(R80Analysis {
            r80,
            peak_depth,
            peak_signal,
            threshold,
            distal_roots,
        })
    }
}

/// 最大值及其索引（并列时取第一个；NaN 不参与比较）
fn first_maximum(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, best_value)) if v <= best_value || v.is_nan() => best,
            _ if v.is_nan() => best,
            _ => Some((i, v)),
        })
}

/// 便捷函数：以平滑因子 `s` 计算 R80
pub fn calculate_r80(curve: &Curve, smoothing: f64) -> Option<f64> {
    R80Extractor::new(smoothing).extract(curve)
}
