//! 深度-信号曲线数据结构
//!
//! 提供测量曲线的存储、排序、ROI 截取和重复深度合并。
//! 样条拟合要求自变量严格递增，所以同一深度的多个采样在拟合前按均值合并。

use crate::error::{RangeError, RangeResult};
use serde::{Deserialize, Serialize};

/// 单个 (深度, 信号) 采样点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthSignalSample {
    /// 深度 [mm]
    pub depth: f64,
    /// 信号/增益 [counts]
    pub signal: f64,
}

/// 深度-剂量曲线
///
/// 深度和信号以两个等长向量保存。深度必须是有限值；信号允许任意值，
/// 非有限信号会在拟合阶段被拒绝。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curve {
    depths: Vec<f64>,
    signals: Vec<f64>,
}

impl Curve {
    /// 从深度和信号向量创建曲线
    ///
    /// # 错误
    ///
    /// * `RangeError::InsufficientData` - 两个向量长度不一致
    /// * `RangeError::InvalidInput` - 深度中包含 NaN 或无穷大
    pub fn new(depths: Vec<f64>, signals: Vec<f64>) -> RangeResult<Self> {
        if depths.len() != signals.len() {
            return Err(RangeError::InsufficientData(format!(
                "深度({})与信号({})长度不一致 / depth and signal lengths differ",
                depths.len(),
                signals.len()
            )));
        }

        if let Some(index) = depths.iter().position(|d| !d.is_finite()) {
            return Err(RangeError::InvalidInput(format!(
                "第 {index} 个深度值不是有限数 / depth at index {index} is not finite"
            )));
        }

        Ok(Self { depths, signals })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.depths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    #[inline]
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    #[inline]
    pub fn signals(&self) -> &[f64] {
        &self.signals
    }

    /// 按索引顺序遍历采样点
    pub fn samples(&self) -> impl Iterator<Item = DepthSignalSample> + '_ {
        self.depths
            .iter()
            .zip(&self.signals)
            .map(|(&depth, &signal)| DepthSignalSample { depth, signal })
    }

    /// 按深度稳定排序后的副本
    pub fn sorted_by_depth(&self) -> Curve {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.depths[a].total_cmp(&self.depths[b]));
        self.select(&order)
    }

    /// 截取 `min <= depth <= max` 的采样点（保持原有顺序）
    pub fn restrict(&self, min: f64, max: f64) -> Curve {
        let (depths, signals) = self
            .samples()
            .filter(|s| s.depth >= min && s.depth <= max)
            .map(|s| (s.depth, s.signal))
            .unzip();
        Curve { depths, signals }
    }

    /// 按索引抽取采样点（索引可重复，用于有放回重采样）
    pub fn select(&self, indices: &[usize]) -> Curve {
        Curve {
            depths: indices.iter().map(|&i| self.depths[i]).collect(),
            signals: indices.iter().map(|&i| self.signals[i]).collect(),
        }
    }

    /// 所有信号减去同一偏移量后的副本
    pub fn shifted(&self, offset: f64) -> Curve {
        Curve {
            depths: self.depths.clone(),
            signals: self.signals.iter().map(|s| s - offset).collect(),
        }
    }

    /// 合并重复深度：按深度排序，同一深度的信号取均值
    ///
    /// 返回的曲线深度严格递增。
    pub fn collapse_duplicates(&self) -> Curve {
        let sorted = self.sorted_by_depth();
        let mut depths: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut signals: Vec<f64> = Vec::with_capacity(sorted.len());

        let mut i = 0;
        while i < sorted.len() {
            let depth = sorted.depths[i];
            let mut sum = 0.0;
            let mut count = 0usize;
            while i < sorted.len() && sorted.depths[i] == depth {
                sum += sorted.signals[i];
                count += 1;
                i += 1;
            }
            depths.push(depth);
            signals.push(sum / count as f64);
        }

        Curve { depths, signals }
    }

}

/// 生成 `count` 个在 [start, end] 上均匀分布的点（包含两端）
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Bortfeld 形状的深度-剂量函数
///
/// `D(z) = d0 · exp(−a (z − r)) / ((z − r)² + b²)`，`a·b < 1` 时在 `z = r + (√(1 − a²b²) − 1) / a`
/// 处取得局部最大值。
pub fn bortfeld(z: f64, d0: f64, a: f64, b: f64, r: f64) -> f64 {
    let u = z - r;
    d0 * (-a * u).exp() / (u * u + b * b)
}
