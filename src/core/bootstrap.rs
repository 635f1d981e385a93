//! Bootstrap 重采样误差估计
//!
//! 在 ROI 内对曲线做有放回重采样，每个重采样样本重新计算 R80，
//! 用有效 R80 的样本标准差（Bessel 校正）作为 R80 的误差。
//!
//! ## 随机数
//!
//! 每次运行生成一个基础种子（或使用配置中的固定种子），第 i 个重采样使用
//! `replicate_seed(base, i)` 派生的独立生成器。因此固定种子时，串行与并行结果完全一致；
//! 未固定种子时不同运行的结果不可复现，测试应使用统计容差或注入种子。

use crate::core::curve::Curve;
use crate::core::r80::R80Extractor;
use crate::core::spline::MIN_DISTINCT_POINTS;
use crate::error::{RangeError, RangeResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

/// ROI 内的最少点数，低于此值视为退化运行
pub const MIN_ROI_POINTS: usize = 10;

/// ROI 近端边距 [mm]：roi_min = R80 − 30（R80 < 30 时为 0）
pub const ROI_PROXIMAL_MARGIN: f64 = 30.0;

/// ROI 远端边距 [mm]：roi_max = R80 + 20
pub const ROI_DISTAL_MARGIN: f64 = 20.0;

/// 深度感兴趣区间 [min, max]（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Roi {
    pub min: f64,
    pub max: f64,
}

impl Roi {
    /// 创建 ROI
    ///
    /// # 错误
    ///
    /// * `RangeError::InvalidInput` - 边界非有限或 `max < min`
    pub fn new(min: f64, max: f64) -> RangeResult<Self> {
        let roi = Self { min, max };
        roi.validate()?;
        Ok(roi)
    }

    /// 以 R80 为中心推导 ROI
    ///
    /// R80 < −20 时 `max < min`，区间为空；调用方按退化运行处理。
    pub fn around_r80(r80: f64) -> Self {
        let min = if r80 < ROI_PROXIMAL_MARGIN {
            0.0
        } else {
            r80 - ROI_PROXIMAL_MARGIN
        };
        Self {
            min,
            max: r80 + ROI_DISTAL_MARGIN,
        }
    }

    #[inline]
    pub fn contains(&self, depth: f64) -> bool {
        depth >= self.min && depth <= self.max
    }

    fn validate(&self) -> RangeResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(RangeError::InvalidInput(format!(
                "ROI 边界必须是有限数 / ROI bounds must be finite: [{}, {}]",
                self.min, self.max
            )));
        }
        if self.max < self.min {
            return Err(RangeError::InvalidInput(format!(
                "ROI 上界小于下界 / ROI max below min: [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Bootstrap 配置
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapConfig {
    /// 重采样次数（≥ 1）
    pub n_bootstraps: usize,
    /// 每次重采样 R80 计算使用的平滑因子
    pub smoothing: f64,
    /// 重采样所在的深度区间
    pub roi: Roi,
    /// 固定种子（None 表示每次运行随机）
    pub seed: Option<u64>,
    /// 是否在 rayon 线程池上并行执行重采样
    pub parallel: bool,
}

impl BootstrapConfig {
    pub fn new(n_bootstraps: usize, smoothing: f64, roi: Roi) -> Self {
        Self {
            n_bootstraps,
            smoothing,
            roi,
            seed: None,
            parallel: false,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// 验证配置；配置错误是唯一会终止整批运行的错误
    pub fn validate(&self) -> RangeResult<()> {
        if self.n_bootstraps < 1 {
            return Err(RangeError::InvalidInput(
                "重采样次数至少为1 / n_bootstraps must be at least 1".to_string(),
            ));
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(RangeError::InvalidInput(format!(
                "平滑因子必须是非负有限数 / smoothing factor must be finite and >= 0, got {}",
                self.smoothing
            )));
        }
        self.roi.validate()
    }
}

/// 有效 R80 的统计摘要
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BootstrapSummary {
    /// 有效 R80 的均值（bootstrap 最佳估计）
    pub mean: f64,
    /// 样本标准差（除数 n−1），即报告的误差
    pub std_dev: f64,
    /// 均值的标准误 = std_dev / √n
    pub standard_error: f64,
    /// 参与统计的有效样本数
    pub valid_draws: usize,
}

/// Bootstrap 运行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapResult {
    /// 有效的 R80 样本（按重采样序号排列）
    pub draws: Vec<f64>,
    /// 实际尝试的重采样次数（退化运行为 0）
    pub attempted: usize,
    /// 去重后不同深度不足而失败的次数
    pub collapsed_failures: usize,
    /// R80 未定义而失败的次数
    pub undefined_failures: usize,
    /// ROI 内的点数
    pub roi_points: usize,
    /// 原始曲线点数
    pub total_points: usize,
    /// ROI 点数不足，未执行重采样
    pub degraded: bool,
    /// 有效样本 ≥ 2 时的统计摘要
    pub summary: Option<BootstrapSummary>,
}

impl BootstrapResult {
    /// 未执行任何重采样的退化结果
    pub(crate) fn degraded(roi_points: usize, total_points: usize) -> Self {
        Self {
            draws: Vec::new(),
            attempted: 0,
            collapsed_failures: 0,
            undefined_failures: 0,
            roi_points,
            total_points,
            degraded: true,
            summary: None,
        }
    }

    /// 失败的重采样总数
    #[inline]
    pub fn failures(&self) -> usize {
        self.collapsed_failures + self.undefined_failures
    }

    /// 报告的 R80 误差（样本标准差）
    #[inline]
    pub fn error(&self) -> Option<f64> {
        self.summary.map(|s| s.std_dev)
    }
}

/// 单次重采样的结果
#[derive(Debug, Clone, Copy, PartialEq)]
enum ReplicateOutcome {
    Valid(f64),
    Collapsed,
    Undefined,
}

/// Bootstrap 估计器
#[derive(Debug, Clone)]
pub struct BootstrapEstimator {
    config: BootstrapConfig,
    extractor: R80Extractor,
}

impl BootstrapEstimator {
    /// 创建估计器（验证配置）
    pub fn new(config: BootstrapConfig) -> RangeResult<Self> {
        config.validate()?;
        let extractor = R80Extractor::new(config.smoothing);
        Ok(Self { config, extractor })
    }

    /// 在 ROI 内执行 bootstrap
    ///
    /// ROI 内点数少于 `MIN_ROI_POINTS` 时记录警告并返回退化结果（不尝试任何重采样）。
    pub fn run(&self, curve: &Curve) -> BootstrapResult {
        let roi = self.config.roi;
        let restricted = curve.sorted_by_depth().restrict(roi.min, roi.max);

        if restricted.len() < MIN_ROI_POINTS {
            log::warn!(
                "{}",
                RangeError::DegenerateRoi {
                    points: restricted.len(),
                    required: MIN_ROI_POINTS,
                }
            );
            return BootstrapResult::degraded(restricted.len(), curve.len());
        }

        log::info!(
            "ROI 深度 {:.2} – {:.2}，使用 {} / {} 个点 / focusing on ROI, {} of {} points",
            roi.min,
            roi.max,
            restricted.len(),
            curve.len(),
            restricted.len(),
            curve.len()
        );

        let mut result = self.resample_replicates(&restricted);
        result.total_points = curve.len();
        result
    }

    /// 直接对给定样本执行重采样循环（不做 ROI 截取和点数门限检查）
    pub fn resample_replicates(&self, restricted: &Curve) -> BootstrapResult {
        let n = self.config.n_bootstraps;
        let base_seed = self.config.seed.unwrap_or_else(rand::random);

        log::debug!("执行 {n} 次 bootstrap 重采样 / performing {n} bootstrap replicates");

        let outcomes: Vec<ReplicateOutcome> = if self.config.parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.replicate(restricted, base_seed, i))
                .collect()
        } else {
            (0..n)
                .map(|i| self.replicate(restricted, base_seed, i))
                .collect()
        };

        let mut draws = Vec::with_capacity(n);
        let mut collapsed_failures = 0;
        let mut undefined_failures = 0;
        for outcome in outcomes {
            match outcome {
                ReplicateOutcome::Valid(r80) => draws.push(r80),
                ReplicateOutcome::Collapsed => collapsed_failures += 1,
                ReplicateOutcome::Undefined => undefined_failures += 1,
            }
        }

        log::info!(
            "Bootstrap 完成，{} / {n} 次失败 / bootstrap complete, {} of {n} replicates failed",
            collapsed_failures + undefined_failures,
            collapsed_failures + undefined_failures
        );

        let summary = summarize(&draws);
        if summary.is_none() {
            log::warn!(
                "有效 R80 样本不足，无法给出误差 / not enough valid R80 values for an error estimate"
            );
        }

        BootstrapResult {
            draws,
            attempted: n,
            collapsed_failures,
            undefined_failures,
            roi_points: restricted.len(),
            total_points: restricted.len(),
            degraded: false,
            summary,
        }
    }

    fn replicate(&self, restricted: &Curve, base_seed: u64, index: usize) -> ReplicateOutcome {
        let len = restricted.len();
        if len == 0 {
            return ReplicateOutcome::Collapsed;
        }

        let mut rng = StdRng::seed_from_u64(replicate_seed(base_seed, index as u64));
        let indices: Vec<usize> = (0..len).map(|_| rng.gen_range(0..len)).collect();

        let sample = restricted.select(&indices).collapse_duplicates();
        if sample.len() < MIN_DISTINCT_POINTS {
            return ReplicateOutcome::Collapsed;
        }

        match self.extractor.extract(&sample) {
            Some(r80) => ReplicateOutcome::Valid(r80),
            None => ReplicateOutcome::Undefined,
        }
    }
}

/// 由基础种子和重采样序号派生独立种子（splitmix64 混合）
pub fn replicate_seed(base: u64, index: u64) -> u64 {
    let mut z = base ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// 计算均值、样本标准差和标准误；少于 2 个样本时返回 None
pub fn summarize(draws: &[f64]) -> Option<BootstrapSummary> {
    let n = draws.len();
    if n < 2 {
        return None;
    }

    let mean = draws.iter().sum::<f64>() / n as f64;
    let variance = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();

    Some(BootstrapSummary {
        mean,
        std_dev,
        standard_error: std_dev / (n as f64).sqrt(),
        valid_draws: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_peak(step: f64, count: usize) -> Curve {
        let depths: Vec<f64> = (0..count).map(|i| i as f64 * step).collect();
        let signals = depths
            .iter()
            .map(|&z| (-(z - 5.0).powi(2) / 8.0).exp())
            .collect();
        Curve::new(depths, signals).unwrap()
    }

    #[test]
    fn test_roi_around_r80() {
        assert_eq!(Roi::around_r80(25.0), Roi { min: 0.0, max: 45.0 });
        assert_eq!(Roi::around_r80(100.0), Roi { min: 70.0, max: 120.0 });
    }

    #[test]
    fn test_invalid_config_rejected() {
        let roi = Roi::around_r80(10.0);
        assert!(matches!(
            BootstrapEstimator::new(BootstrapConfig::new(0, 0.0, roi)),
            Err(RangeError::InvalidInput(_))
        ));
        assert!(matches!(
            BootstrapEstimator::new(BootstrapConfig::new(10, -1.0, roi)),
            Err(RangeError::InvalidInput(_))
        ));
        assert!(Roi::new(5.0, 1.0).is_err());
        assert!(Roi::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_degraded_run_when_roi_too_narrow() {
        let config = BootstrapConfig::new(50, 0.0, Roi::new(4.0, 5.0).unwrap()).with_seed(1);
        let estimator = BootstrapEstimator::new(config).unwrap();
        let result = estimator.run(&gaussian_peak(0.5, 25));

        assert!(result.degraded);
        assert_eq!(result.attempted, 0);
        assert_eq!(result.failures(), 0);
        assert!(result.draws.is_empty());
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_direct_loop_runs_with_few_points() {
        let config = BootstrapConfig::new(20, 0.0, Roi::around_r80(6.0)).with_seed(3);
        let estimator = BootstrapEstimator::new(config).unwrap();
        let result = estimator.resample_replicates(&gaussian_peak(2.0, 6));

        assert_eq!(result.attempted, 20);
        assert_eq!(result.draws.len() + result.failures(), 20);
        assert!(!result.degraded);
    }

    #[test]
    fn test_empty_sample_counts_as_collapsed() {
        let config = BootstrapConfig::new(5, 0.0, Roi::around_r80(6.0)).with_seed(3);
        let estimator = BootstrapEstimator::new(config).unwrap();
        let result = estimator.resample_replicates(&Curve::default());
        assert_eq!(result.collapsed_failures, 5);
    }

    #[test]
    fn test_seeded_runs_reproducible_and_parallel_consistent() {
        let roi = Roi::new(0.0, 12.0).unwrap();
        let serial = BootstrapEstimator::new(BootstrapConfig::new(40, 0.0, roi).with_seed(42))
            .unwrap()
            .run(&gaussian_peak(0.25, 49));
        let again = BootstrapEstimator::new(BootstrapConfig::new(40, 0.0, roi).with_seed(42))
            .unwrap()
            .run(&gaussian_peak(0.25, 49));
        let parallel = BootstrapEstimator::new(
            BootstrapConfig::new(40, 0.0, roi)
                .with_seed(42)
                .with_parallel(true),
        )
        .unwrap()
        .run(&gaussian_peak(0.25, 49));

        assert_eq!(serial, again);
        assert_eq!(serial.draws, parallel.draws);
        assert!(serial.summary.is_some());
    }

    #[test]
    fn test_summarize_uses_bessel_correction() {
        let summary = summarize(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((summary.mean - 2.5).abs() < 1e-12);
        assert!((summary.std_dev - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((summary.standard_error - summary.std_dev / 2.0).abs() < 1e-12);
        assert_eq!(summary.valid_draws, 4);

        assert!(summarize(&[1.0]).is_none());
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_replicate_seeds_differ() {
        assert_ne!(replicate_seed(7, 0), replicate_seed(7, 1));
        assert_ne!(replicate_seed(7, 0), replicate_seed(8, 0));
        assert_eq!(replicate_seed(7, 5), replicate_seed(7, 5));
    }
}
