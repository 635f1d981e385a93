//! R80 分析流水线集成测试
//!
//! 通过公共 API 验证平滑样条 → R80 提取 → bootstrap 误差估计的完整链路。
//! bootstrap 测试全部使用固定种子，断言使用统计容差。

use bragg_range_tool::core::{BootstrapConfig, BootstrapEstimator, Curve, Roi, bortfeld};
use bragg_range_tool::{R80Extractor, SmoothingSpline, calculate_r80};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIGMA: f64 = 2.0;

/// 高斯峰的解析 R80：5 + σ·√(2 ln 1.25)
fn gaussian_r80() -> f64 {
    5.0 + SIGMA * (2.0 * 1.25_f64.ln()).sqrt()
}

/// 峰值在 5 的高斯曲线，深度 0..=12 步长 0.1，带相对均匀噪声
fn noisy_gaussian(noise: f64, seed: u64) -> Curve {
    let mut rng = StdRng::seed_from_u64(seed);
    let depths: Vec<f64> = (0..=120).map(|i| i as f64 * 0.1).collect();
    let signals = depths
        .iter()
        .map(|&z| {
            let clean = (-(z - 5.0).powi(2) / (2.0 * SIGMA * SIGMA)).exp();
            clean * (1.0 + rng.gen_range(-noise..=noise))
        })
        .collect();
    Curve::new(depths, signals).unwrap()
}

/// 在 [lo, hi] 上二分求 f(z) = target 的解（f 在区间内单调递减）
fn solve_decreasing(f: impl Fn(f64) -> f64, target: f64, mut lo: f64, mut hi: f64) -> f64 {
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if f(mid) > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

// ============================================================================
// R80 提取
// ============================================================================

/// 整数深度 0..=10，峰值在 5，7.2 处降到 80%
#[test]
fn test_integer_depth_peak_r80() {
    let beta = 0.2 / (2.2_f64 * 2.2);
    let depths: Vec<f64> = (0..=10).map(|i| i as f64).collect();
    let signals = depths.iter().map(|&z| 1.0 - beta * (z - 5.0).powi(2)).collect();
    let curve = Curve::new(depths, signals).unwrap();

    let r80 = calculate_r80(&curve, 0.0).unwrap();
    assert!((r80 - 7.2).abs() < 0.1, "r80 = {r80}");
    println!("  ✓ 整数深度曲线 R80 = {r80:.4}");
}

/// Bortfeld 曲线的 R80 与解析交点一致
#[test]
fn test_bortfeld_curve_matches_analytic_crossing() {
    let (a, b) = (0.3, 2.0);
    let r = 5.0 + 2.0 / 3.0; // 峰值位于 z = 5
    let f = |z: f64| bortfeld(z, 1.0, a, b, r);

    let depths: Vec<f64> = (0..=40).map(|i| i as f64 * 0.25).collect();
    let signals = depths.iter().map(|&z| f(z)).collect();
    let curve = Curve::new(depths, signals).unwrap();

    let expected = solve_decreasing(f, 0.8 * f(5.0), 5.0, 10.0);
    let analysis = R80Extractor::default().analyze(&curve).unwrap();

    assert!((analysis.peak_depth - 5.0).abs() < 0.1);
    assert!(
        (analysis.r80 - expected).abs() < 0.1,
        "r80 = {}, expected {expected}",
        analysis.r80
    );
    assert!(analysis.r80 > analysis.peak_depth);
    println!("  ✓ Bortfeld R80 = {:.4} (解析值 {expected:.4})", analysis.r80);
}

/// 原始顺序与排序后顺序的曲线给出相同 R80
#[test]
fn test_unsorted_input_gives_same_r80() {
    let curve = noisy_gaussian(0.0, 1);
    let mut order: Vec<usize> = (0..curve.len()).collect();
    order.reverse();
    let reversed = curve.select(&order);

    assert_eq!(calculate_r80(&curve, 0.0), calculate_r80(&reversed, 0.0));
    println!("  ✓ 输入顺序不影响 R80");
}

/// 平滑因子 s > 0 仍给出接近解析值的 R80
#[test]
fn test_smoothed_fit_r80() {
    let s = 0.005;
    let curve = noisy_gaussian(0.02, 5);
    let spline = SmoothingSpline::fit(&curve, s).unwrap();
    assert!((spline.residual() - s).abs() <= 1e-3 * s + 1e-12);

    let r80 = calculate_r80(&curve, s).unwrap();
    assert!((r80 - gaussian_r80()).abs() < 0.1, "r80 = {r80}");
    println!("  ✓ 平滑拟合 R80 = {r80:.4}");
}

// ============================================================================
// Bootstrap
// ============================================================================

/// bootstrap 均值收敛到解析 R80 的 ±5% 以内
#[test]
fn test_bootstrap_mean_converges() {
    let expected = gaussian_r80();
    let curve = noisy_gaussian(0.005, 7);
    let config = BootstrapConfig::new(500, 0.0, Roi::around_r80(expected))
        .with_seed(2024)
        .with_parallel(true);

    let result = BootstrapEstimator::new(config).unwrap().run(&curve);
    let summary = result.summary.expect("至少需要2个有效样本");

    assert_eq!(result.attempted, 500);
    assert!(!result.degraded);
    assert!(
        (summary.mean - expected).abs() < 0.05 * expected,
        "mean = {}, expected {expected}",
        summary.mean
    );
    assert!(summary.std_dev >= 0.0);
    println!(
        "  ✓ bootstrap 均值 {:.4} ± {:.4}（{} 个有效样本）",
        summary.mean, summary.std_dev, summary.valid_draws
    );
}

/// 标准误随重采样次数增加而减小
///
/// 断言的是均值的标准误 sd/√n：报告的误差（样本标准差）是对曲线噪声的估计，
/// 随重采样次数增加趋于稳定而不是单调减小。
#[test]
fn test_standard_error_shrinks_with_replicates() {
    let curve = noisy_gaussian(0.02, 11);
    let roi = Roi::around_r80(gaussian_r80());

    let run = |n: usize| {
        let config = BootstrapConfig::new(n, 0.0, roi)
            .with_seed(99)
            .with_parallel(true);
        BootstrapEstimator::new(config)
            .unwrap()
            .run(&curve)
            .summary
            .unwrap()
    };

    let small = run(50);
    let large = run(400);
    assert!(
        large.standard_error < small.standard_error,
        "SE(400) = {}, SE(50) = {}",
        large.standard_error,
        small.standard_error
    );
    println!(
        "  ✓ 标准误 {:.5} → {:.5}",
        small.standard_error, large.standard_error
    );
}

/// ROI 点数不足时降级运行，不报错
#[test]
fn test_narrow_roi_is_degraded_not_fatal() {
    let curve = noisy_gaussian(0.0, 3);
    let config = BootstrapConfig::new(100, 0.0, Roi::new(5.95, 6.55).unwrap()).with_seed(1);
    let result = BootstrapEstimator::new(config).unwrap().run(&curve);

    assert!(result.degraded);
    assert_eq!(result.roi_points, 6);
    assert_eq!(result.attempted, 0);
    assert!(result.error().is_none());
    println!("  ✓ ROI 过窄时降级运行");
}

/// 固定种子的结果与是否并行无关
#[test]
fn test_seeded_bootstrap_independent_of_parallelism() {
    let curve = noisy_gaussian(0.01, 13);
    let roi = Roi::around_r80(gaussian_r80());
    let run = |parallel: bool| {
        let config = BootstrapConfig::new(64, 0.0, roi)
            .with_seed(5)
            .with_parallel(parallel);
        BootstrapEstimator::new(config).unwrap().run(&curve)
    };

    assert_eq!(run(false), run(true));
    println!("  ✓ 串行与并行结果一致");
}
