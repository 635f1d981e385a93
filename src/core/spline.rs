//! 三次平滑样条
//!
//! 对不规则采样、含噪声的 (深度, 信号) 数据拟合三次样条，结果以分段多项式保存，
//! 支持任意深度求值和全部实根求解。
//!
//! ## 平滑因子 `s`
//!
//! - `s = 0`：精确插值，每个（合并后的）数据点都落在曲线上，端点采用 not-a-knot 条件。
//!   4 个点时退化为唯一的插值三次多项式。
//! - `s > 0`：在残差平方和 Σ(yᵢ − g(xᵢ))² 不超过 `s` 的前提下最小化曲率
//!   （Reinsch 罚函数形式，自然端点条件）。罚权重在对数空间二分搜索，
//!   使残差与 `s` 的相对偏差不超过 1e-3。若最小二乘直线的残差已 ≤ s，直接返回该直线。
//!
//! 拟合前重复深度按信号均值合并，合并后不同深度少于 4 个时拟合失败。

use crate::core::curve::Curve;
use crate::error::{RangeError, RangeResult};
use crate::utils::diagnostics;

/// 拟合所需的最少不同深度数（三次样条阶数 + 1）
pub const MIN_DISTINCT_POINTS: usize = 4;

/// 平滑目标的相对容差
const SMOOTHING_TOLERANCE: f64 = 1e-3;

/// 罚权重括区间扩张的最大次数（每次 ×10）
const MAX_BRACKET_STEPS: usize = 80;

/// 罚权重二分搜索的最大次数
const MAX_SEARCH_STEPS: usize = 200;

/// 单区间求根二分的最大次数
const MAX_BISECTION_STEPS: usize = 200;

/// 分段三次多项式表示的平滑曲线
///
/// 第 i 段定义在 `[breaks[i], breaks[i+1]]` 上，
/// 以局部变量 `t = x - breaks[i]` 表示为 `a + b·t + c·t² + d·t³`。
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingSpline {
    breaks: Vec<f64>,
    coefficients: Vec<[f64; 4]>,
    residual: f64,
    smoothing: f64,
}

impl SmoothingSpline {
    /// 拟合平滑样条
    ///
    /// # 参数
    ///
    /// * `curve` - 原始曲线（可无序、可含重复深度）
    /// * `smoothing` - 平滑因子 `s`，必须是非负有限数
    ///
    /// # 错误
    ///
    /// * `RangeError::InvalidInput` - 平滑因子为负或非有限
    /// * `RangeError::FitFailure` - 不同深度不足 4 个、信号非有限、方程组奇异
    pub fn fit(curve: &Curve, smoothing: f64) -> RangeResult<Self> {
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(RangeError::InvalidInput(format!(
                "平滑因子必须是非负有限数 / smoothing factor must be finite and >= 0, got {smoothing}"
            )));
        }

        let data = curve.collapse_duplicates();
        if data.len() < MIN_DISTINCT_POINTS {
            return Err(RangeError::FitFailure(format!(
                "合并重复深度后仅剩 {} 个点，至少需要 {MIN_DISTINCT_POINTS} 个 / {} distinct depths, {MIN_DISTINCT_POINTS} required",
                data.len(),
                data.len()
            )));
        }

        if let Some(index) = data.signals().iter().position(|y| !y.is_finite()) {
            return Err(RangeError::FitFailure(format!(
                "深度 {} 处的信号不是有限数 / non-finite signal",
                data.depths()[index]
            )));
        }

        let x = data.depths();
        let y = data.signals();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

        let spline = if smoothing == 0.0 {
            Self::interpolate(x, y, &h)?
        } else {
            Self::smooth(x, y, &h, smoothing)?
        };

        if spline
            .coefficients
            .iter()
            .flatten()
            .any(|c| !c.is_finite())
        {
            return Err(RangeError::FitFailure(
                "样条系数出现非有限值（数据病态） / non-finite spline coefficients".to_string(),
            ));
        }

        Ok(spline)
    }

    /// 在屏蔽诊断输出的作用域内拟合
    ///
    /// 拟合期间产生的数值诊断不会写入标准错误流；无论成功、失败还是 panic，
    /// 离开本函数时屏蔽状态都会恢复。
    pub fn fit_quiet(curve: &Curve, smoothing: f64) -> RangeResult<Self> {
        diagnostics::with_suppressed(|| Self::fit(curve, smoothing))
    }

    /// not-a-knot 插值样条
    fn interpolate(x: &[f64], y: &[f64], h: &[f64]) -> RangeResult<Self> {
        let n = x.len();
        let m = n - 2;
        let slopes: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

        // 内部节点二阶导数 M₁..M_{n-2} 的三对角方程组
        let mut sub = vec![0.0; m];
        let mut diag = vec![0.0; m];
        let mut sup = vec![0.0; m];
        let mut rhs = vec![0.0; m];
        for k in 0..m {
            let i = k + 1;
            sub[k] = h[i - 1];
            diag[k] = 2.0 * (h[i - 1] + h[i]);
            sup[k] = h[i];
            rhs[k] = 6.0 * (slopes[i] - slopes[i - 1]);
        }

        // 左端 not-a-knot：三阶导数在 x₁ 连续，消去 M₀
        let (h0, h1) = (h[0], h[1]);
        diag[0] += h0 * (h0 + h1) / h1;
        sup[0] -= h0 * h0 / h1;
        sub[0] = 0.0;

        // 右端 not-a-knot：三阶导数在 x_{n-2} 连续，消去 M_{n-1}
        let (hl, hr) = (h[n - 3], h[n - 2]);
        diag[m - 1] += hr * (hl + hr) / hl;
        sub[m - 1] -= hr * hr / hl;
        sup[m - 1] = 0.0;

        let interior = solve_tridiagonal(&sub, &diag, &sup, &rhs).ok_or_else(|| {
            RangeError::FitFailure("插值方程组奇异 / singular interpolation system".to_string())
        })?;

        let mut second = vec![0.0; n];
        second[1..=m].copy_from_slice(&interior);
        second[0] = ((h0 + h1) * second[1] - h0 * second[2]) / h1;
        second[n - 1] = ((hl + hr) * second[n - 2] - hr * second[n - 3]) / hl;

        Ok(Self::from_second_derivatives(x, y, &second, h, 0.0, 0.0))
    }

    /// Reinsch 平滑样条：搜索罚权重使残差平方和等于 `s`
    fn smooth(x: &[f64], y: &[f64], h: &[f64], smoothing: f64) -> RangeResult<Self> {
        let n = x.len();

        // 罚权重趋于无穷时的极限：最小二乘直线
        let (intercept, slope) = least_squares_line(x, y);
        let line: Vec<f64> = x.iter().map(|&xi| intercept + slope * xi).collect();
        let line_residual: f64 = y.iter().zip(&line).map(|(a, b)| (a - b).powi(2)).sum();
        if line_residual <= smoothing {
            log::debug!(
                "最小二乘直线已满足平滑目标 / straight line satisfies s={smoothing} (residual {line_residual:.4e})"
            );
            return Ok(Self::from_second_derivatives(
                x,
                &line,
                &vec![0.0; n],
                h,
                line_residual,
                smoothing,
            ));
        }

        let system = PenaltySystem::new(h, y);
        let solve = |log_alpha: f64| {
            system.solve(log_alpha.exp()).ok_or_else(|| {
                RangeError::FitFailure(
                    "平滑方程组奇异或病态 / singular smoothing system".to_string(),
                )
            })
        };

        // 初始权重按 h³ 缩放，使曲率项与残差项量级相当
        let mean_h = (x[n - 1] - x[0]) / (n - 1) as f64;
        let start = 3.0 * mean_h.ln();
        let step = std::f64::consts::LN_10;

        let mut best = solve(start)?;
        let (mut lo, mut hi) = (start, start);
        let mut bracketed = false;

        if best.residual < smoothing {
            for _ in 0..MAX_BRACKET_STEPS {
                lo = hi;
                hi += step;
                let trial = solve(hi)?;
                let reached = trial.residual >= smoothing;
                best = trial;
                if reached {
                    bracketed = true;
                    break;
                }
            }
        } else {
            for _ in 0..MAX_BRACKET_STEPS {
                hi = lo;
                lo -= step;
                let trial = solve(lo)?;
                let reached = trial.residual <= smoothing;
                best = trial;
                if reached {
                    bracketed = true;
                    break;
                }
            }
        }

        if !bracketed {
            diagnostics::emit_warning(format_args!(
                "无法为 s={smoothing} 找到罚权重区间，使用最接近的拟合 / could not bracket penalty weight, residual {:.4e}",
                best.residual
            ));
            return Ok(best.into_spline(x, h, smoothing));
        }

        let mut converged = (best.residual - smoothing).abs() <= SMOOTHING_TOLERANCE * smoothing;
        let mut steps = 0;
        while !converged && steps < MAX_SEARCH_STEPS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            let trial = solve(mid)?;
            if trial.residual < smoothing {
                lo = mid;
            } else {
                hi = mid;
            }
            converged = (trial.residual - smoothing).abs() <= SMOOTHING_TOLERANCE * smoothing;
            best = trial;
            steps += 1;
        }

        if !converged {
            diagnostics::emit_warning(format_args!(
                "平滑目标在迭代上限内未达成 / smoothing target s={smoothing} not reached, residual {:.4e}",
                best.residual
            ));
        }

        Ok(best.into_spline(x, h, smoothing))
    }

    /// 由节点值和节点二阶导数构造分段多项式
    fn from_second_derivatives(
        x: &[f64],
        values: &[f64],
        second: &[f64],
        h: &[f64],
        residual: f64,
        smoothing: f64,
    ) -> Self {
        let coefficients = (0..x.len() - 1)
            .map(|i| {
                let slope = (values[i + 1] - values[i]) / h[i] - h[i] * (2.0 * second[i] + second[i + 1]) / 6.0;
                [
                    values[i],
                    slope,
                    second[i] / 2.0,
                    (second[i + 1] - second[i]) / (6.0 * h[i]),
                ]
            })
            .collect();

        Self {
            breaks: x.to_vec(),
            coefficients,
            residual,
            smoothing,
        }
    }

    /// 定义域 [最小深度, 最大深度]
    #[inline]
    pub fn domain(&self) -> (f64, f64) {
        (self.breaks[0], self.breaks[self.breaks.len() - 1])
    }

    /// 拟合残差平方和
    #[inline]
    pub fn residual(&self) -> f64 {
        self.residual
    }

    #[inline]
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// 在深度 `x` 处求值；定义域外（或 NaN）返回 None
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        let (lo, hi) = self.domain();
        if !(x >= lo && x <= hi) {
            return None;
        }

        let i = self.interval_index(x);
        let t = x - self.breaks[i];
        let [a, b, c, d] = self.coefficients[i];
        Some(a + t * (b + t * (c + t * d)))
    }

    /// 批量求值；任一点落在定义域外时返回 None
    pub fn evaluate_many(&self, xs: &[f64]) -> Option<Vec<f64>> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// 样条的全部实根（升序）
    pub fn roots(&self) -> Vec<f64> {
        let mut roots: Vec<f64> = Vec::new();
        for (i, coeffs) in self.coefficients.iter().enumerate() {
            let origin = self.breaks[i];
            let width = self.breaks[i + 1] - origin;
            for t in cubic_roots_in(coeffs, width) {
                push_root(&mut roots, origin + t);
            }
        }
        roots
    }

    fn interval_index(&self, x: f64) -> usize {
        let upper = self.breaks.partition_point(|&b| b <= x);
        upper.saturating_sub(1).min(self.coefficients.len() - 1)
    }
}

/// 固定罚权重下的平滑解
struct PenalizedFit {
    /// 全部节点的二阶导数（两端为 0）
    second: Vec<f64>,
    /// 节点处的拟合值
    fitted: Vec<f64>,
    /// 残差平方和
    residual: f64,
}

impl PenalizedFit {
    fn into_spline(self, x: &[f64], h: &[f64], smoothing: f64) -> SmoothingSpline {
        SmoothingSpline::from_second_derivatives(
            x,
            &self.fitted,
            &self.second,
            h,
            self.residual,
            smoothing,
        )
    }
}

/// Reinsch 形式的五对角方程组 `(R + α·QᵀQ)·γ = Qᵀy`
///
/// Q 为 n×(n−2) 二阶差分矩阵，R 为 (n−2)×(n−2) 三对角矩阵；
/// 解出内部节点二阶导数 γ 后，拟合值为 `g = y − α·Q·γ`。
struct PenaltySystem<'a> {
    y: &'a [f64],
    /// Q 第 k 列的三个非零元（行 k, k+1, k+2）
    q_columns: Vec<[f64; 3]>,
    qty: Vec<f64>,
    r_diag: Vec<f64>,
    r_off: Vec<f64>,
    qtq: [Vec<f64>; 3],
}

impl<'a> PenaltySystem<'a> {
    fn new(h: &[f64], y: &'a [f64]) -> Self {
        let m = h.len() - 1;
        let q_columns: Vec<[f64; 3]> = (0..m)
            .map(|k| {
                let left = 1.0 / h[k];
                let right = 1.0 / h[k + 1];
                [left, -left - right, right]
            })
            .collect();

        let qty = (0..m)
            .map(|k| {
                let [a, c, e] = q_columns[k];
                a * y[k] + c * y[k + 1] + e * y[k + 2]
            })
            .collect();

        let r_diag = (0..m).map(|k| (h[k] + h[k + 1]) / 3.0).collect();
        let r_off = (0..m)
            .map(|k| if k + 1 < m { h[k + 1] / 6.0 } else { 0.0 })
            .collect();

        let mut qtq = [vec![0.0; m], vec![0.0; m], vec![0.0; m]];
        for k in 0..m {
            let [a, c, e] = q_columns[k];
            qtq[0][k] = a * a + c * c + e * e;
            if k + 1 < m {
                let [a1, c1, _] = q_columns[k + 1];
                qtq[1][k] = c * a1 + e * c1;
            }
            if k + 2 < m {
                qtq[2][k] = e * q_columns[k + 2][0];
            }
        }

        Self {
            y,
            q_columns,
            qty,
            r_diag,
            r_off,
            qtq,
        }
    }

    fn solve(&self, alpha: f64) -> Option<PenalizedFit> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return None;
        }

        let m = self.q_columns.len();
        let e0: Vec<f64> = (0..m).map(|k| self.r_diag[k] + alpha * self.qtq[0][k]).collect();
        let e1: Vec<f64> = (0..m).map(|k| self.r_off[k] + alpha * self.qtq[1][k]).collect();
        let e2: Vec<f64> = (0..m).map(|k| alpha * self.qtq[2][k]).collect();

        let gamma = solve_pentadiagonal(&e0, &e1, &e2, &self.qty)?;

        let n = self.y.len();
        let mut q_gamma = vec![0.0; n];
        for (k, (&g, [a, c, e])) in gamma.iter().zip(&self.q_columns).enumerate() {
            q_gamma[k] += a * g;
            q_gamma[k + 1] += c * g;
            q_gamma[k + 2] += e * g;
        }

        let fitted: Vec<f64> = self
            .y
            .iter()
            .zip(&q_gamma)
            .map(|(yi, qg)| yi - alpha * qg)
            .collect();
        let residual = q_gamma.iter().map(|qg| (alpha * qg).powi(2)).sum();

        let mut second = vec![0.0; n];
        second[1..=m].copy_from_slice(&gamma);

        Some(PenalizedFit {
            second,
            fitted,
            residual,
        })
    }
}

/// 最小二乘直线 (截距, 斜率)
fn least_squares_line(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (mean_y - slope * mean_x, slope)
}

/// Thomas 算法求解三对角方程组；主元为零或非有限时返回 None
fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let m = diag.len();
    let scale = diag.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
    let usable = |pivot: f64| pivot.is_finite() && pivot.abs() > f64::EPSILON * scale;

    let mut c = vec![0.0; m];
    let mut d = vec![0.0; m];

    let mut pivot = diag[0];
    if !usable(pivot) {
        return None;
    }
    c[0] = sup[0] / pivot;
    d[0] = rhs[0] / pivot;

    for k in 1..m {
        pivot = diag[k] - sub[k] * c[k - 1];
        if !usable(pivot) {
            return None;
        }
        c[k] = sup[k] / pivot;
        d[k] = (rhs[k] - sub[k] * d[k - 1]) / pivot;
    }

    let mut solution = vec![0.0; m];
    solution[m - 1] = d[m - 1];
    for k in (0..m - 1).rev() {
        solution[k] = d[k] - c[k] * solution[k + 1];
    }
    Some(solution)
}

/// 对称正定五对角方程组的带状 LDLᵀ 分解求解
///
/// `e0`/`e1`/`e2` 分别为主对角线、第一、第二上对角线。非正主元时返回 None。
fn solve_pentadiagonal(e0: &[f64], e1: &[f64], e2: &[f64], rhs: &[f64]) -> Option<Vec<f64>> {
    let m = e0.len();
    let mut d = vec![0.0; m];
    let mut l1 = vec![0.0; m];
    let mut l2 = vec![0.0; m];

    for k in 0..m {
        let mut dk = e0[k];
        if k >= 1 {
            dk -= l1[k - 1] * l1[k - 1] * d[k - 1];
        }
        if k >= 2 {
            dk -= l2[k - 2] * l2[k - 2] * d[k - 2];
        }
        if !(dk.is_finite() && dk > 0.0) {
            return None;
        }
        d[k] = dk;

        if k + 1 < m {
            let mut off = e1[k];
            if k >= 1 {
                off -= l2[k - 1] * l1[k - 1] * d[k - 1];
            }
            l1[k] = off / dk;
        }
        if k + 2 < m {
            l2[k] = e2[k] / dk;
        }
    }

    // 前代
    let mut z = vec![0.0; m];
    for k in 0..m {
        let mut v = rhs[k];
        if k >= 1 {
            v -= l1[k - 1] * z[k - 1];
        }
        if k >= 2 {
            v -= l2[k - 2] * z[k - 2];
        }
        z[k] = v;
    }

    // 回代
    let mut x = vec![0.0; m];
    for k in (0..m).rev() {
        let mut v = z[k] / d[k];
        if k + 1 < m {
            v -= l1[k] * x[k + 1];
        }
        if k + 2 < m {
            v -= l2[k] * x[k + 2];
        }
        x[k] = v;
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// 三次多项式在 [0, width] 上的实根
///
/// 先用导数零点把区间切成单调小段，再在变号的小段上二分。
fn cubic_roots_in(coeffs: &[f64; 4], width: f64) -> Vec<f64> {
    let [a, b, c, d] = *coeffs;
    let p = |t: f64| a + t * (b + t * (c + t * d));

    let mut cuts = vec![0.0];
    cuts.extend(
        quadratic_roots(3.0 * d, 2.0 * c, b)
            .into_iter()
            .filter(|&t| t > 0.0 && t < width),
    );
    cuts.push(width);
    cuts.sort_by(f64::total_cmp);

    let mut found = Vec::new();
    for window in cuts.windows(2) {
        let (u, v) = (window[0], window[1]);
        let (pu, pv) = (p(u), p(v));
        if pu == 0.0 {
            found.push(u);
        } else if pv != 0.0 && (pu < 0.0) != (pv < 0.0) {
            found.push(bisect(&p, u, v, pu));
        }
    }
    if p(width) == 0.0 {
        found.push(width);
    }
    found
}

/// `a·t² + b·t + c = 0` 的实根（数值稳定形式）
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a == 0.0 {
        return if b != 0.0 { vec![-c / b] } else { Vec::new() };
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }

    let q = -0.5 * (b + b.signum() * disc.sqrt());
    if q == 0.0 {
        return vec![0.0];
    }
    vec![q / a, c / q]
}

fn bisect(p: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, mut p_lo: f64) -> f64 {
    for _ in 0..MAX_BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        let pm = p(mid);
        if pm == 0.0 {
            return mid;
        }
        if (pm < 0.0) == (p_lo < 0.0) {
            lo = mid;
            p_lo = pm;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// 追加根并去除与上一个根重合的值（区间端点会被相邻两段各报告一次）
fn push_root(roots: &mut Vec<f64>, root: f64) {
    if let Some(&last) = roots.last()
        && (root - last).abs() <= 1e-12 * (1.0 + root.abs())
    {
        return;
    }
    roots.push(root);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_from(f: impl Fn(f64) -> f64, xs: &[f64]) -> Curve {
        Curve::new(xs.to_vec(), xs.iter().map(|&x| f(x)).collect()).unwrap()
    }

    #[test]
    fn test_interpolation_passes_through_points() {
        let xs = [0.0, 1.0, 2.5, 3.0, 4.5, 6.0];
        let ys = [1.0, 3.0, 2.0, -1.0, 0.5, 4.0];
        let curve = Curve::new(xs.to_vec(), ys.to_vec()).unwrap();
        let spline = SmoothingSpline::fit(&curve, 0.0).unwrap();

        for (x, y) in xs.iter().zip(ys) {
            let value = spline.evaluate(*x).unwrap();
            assert!((value - y).abs() < 1e-10, "x={x}: {value} != {y}");
        }
        assert_eq!(spline.residual(), 0.0);
    }

    #[test]
    fn test_not_a_knot_reproduces_cubic() {
        let cubic = |x: f64| 0.5 * x * x * x - 2.0 * x * x + x - 3.0;
        let xs = [0.0, 0.7, 1.5, 2.0, 3.2, 4.0, 5.5];
        let spline = SmoothingSpline::fit(&curve_from(cubic, &xs), 0.0).unwrap();

        for i in 0..=55 {
            let x = i as f64 * 0.1;
            let value = spline.evaluate(x).unwrap();
            assert!((value - cubic(x)).abs() < 1e-9, "x={x}");
        }
    }

    #[test]
    fn test_four_points_give_single_cubic() {
        let cubic = |x: f64| x * x * x - x;
        let xs = [-2.0, -0.5, 1.0, 2.0];
        let spline = SmoothingSpline::fit(&curve_from(cubic, &xs), 0.0).unwrap();
        assert!((spline.evaluate(0.25).unwrap() - cubic(0.25)).abs() < 1e-10);
    }

    #[test]
    fn test_too_few_distinct_points() {
        let curve = Curve::new(vec![1.0, 1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let err = SmoothingSpline::fit(&curve, 0.0).unwrap_err();
        assert!(matches!(err, RangeError::FitFailure(_)));
    }

    #[test]
    fn test_non_finite_signal_fails() {
        let curve = Curve::new(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, f64::NAN, 3.0, 4.0]).unwrap();
        assert!(matches!(
            SmoothingSpline::fit(&curve, 0.0),
            Err(RangeError::FitFailure(_))
        ));
    }

    #[test]
    fn test_negative_smoothing_rejected() {
        let curve = curve_from(|x| x, &[0.0, 1.0, 2.0, 3.0]);
        assert!(matches!(
            SmoothingSpline::fit(&curve, -1.0),
            Err(RangeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicates_collapsed_before_fit() {
        let with_duplicates =
            Curve::new(vec![0.0, 1.0, 1.0, 2.0, 3.0], vec![0.0, 10.0, 20.0, 5.0, 1.0]).unwrap();
        let collapsed = Curve::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 15.0, 5.0, 1.0]).unwrap();

        let a = SmoothingSpline::fit(&with_duplicates, 0.0).unwrap();
        let b = SmoothingSpline::fit(&collapsed, 0.0).unwrap();
        assert_eq!(a, b);
        assert!((a.evaluate(1.0).unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_smoothing_reaches_target_residual() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.25).collect();
        // 确定性的锯齿扰动
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| x.sin() + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let curve = Curve::new(xs, ys).unwrap();

        let target = 0.05;
        let spline = SmoothingSpline::fit(&curve, target).unwrap();
        assert!(
            (spline.residual() - target).abs() <= 2.0 * SMOOTHING_TOLERANCE * target,
            "residual {} vs target {target}",
            spline.residual()
        );
    }

    #[test]
    fn test_larger_smoothing_is_smoother() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64 * 0.3).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| (-(x - 4.0).powi(2) / 4.0).exp() + if i % 3 == 0 { 0.02 } else { -0.01 })
            .collect();
        let curve = Curve::new(xs, ys).unwrap();

        let tight = SmoothingSpline::fit(&curve, 1e-4).unwrap();
        let loose = SmoothingSpline::fit(&curve, 5e-3).unwrap();
        assert!(loose.residual() > tight.residual());
    }

    #[test]
    fn test_huge_smoothing_returns_straight_line() {
        let curve = curve_from(|x| x * x, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        let spline = SmoothingSpline::fit(&curve, 1e6).unwrap();
        // 直线：二阶项和三阶项为 0
        let mid = spline.evaluate(2.0).unwrap();
        let ends = 0.5 * (spline.evaluate(0.0).unwrap() + spline.evaluate(4.0).unwrap());
        assert!((mid - ends).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_outside_domain() {
        let spline = SmoothingSpline::fit(&curve_from(|x| x, &[0.0, 1.0, 2.0, 3.0]), 0.0).unwrap();
        assert!(spline.evaluate(-0.1).is_none());
        assert!(spline.evaluate(3.1).is_none());
        assert!(spline.evaluate(f64::NAN).is_none());
        assert!(spline.evaluate(3.0).is_some());
    }

    #[test]
    fn test_roots_of_shifted_parabola() {
        let xs: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let spline =
            SmoothingSpline::fit(&curve_from(|x| 4.0 - (x - 5.0).powi(2), &xs), 0.0).unwrap();
        let roots = spline.roots();

        assert_eq!(roots.len(), 2, "roots: {roots:?}");
        assert!((roots[0] - 3.0).abs() < 1e-9);
        assert!((roots[1] - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_root_at_knot_reported_once() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let spline = SmoothingSpline::fit(&curve_from(|x| x - 2.0, &xs), 0.0).unwrap();
        let roots = spline.roots();
        assert_eq!(roots.len(), 1, "roots: {roots:?}");
        assert!((roots[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_quiet_fit_restores_diagnostics() {
        let curve = curve_from(|x| x * x, &[0.0, 1.0, 2.0, 3.0]);
        assert!(SmoothingSpline::fit_quiet(&curve, 0.0).is_ok());
        assert!(!diagnostics::is_suppressed());

        let bad = curve_from(|x| x, &[0.0, 1.0]);
        assert!(SmoothingSpline::fit_quiet(&bad, 0.0).is_err());
        assert!(!diagnostics::is_suppressed());
    }

    #[test]
    fn test_quadratic_roots_stable() {
        let mut roots = quadratic_roots(1.0, -3.0, 2.0);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots, vec![1.0, 2.0]);
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_empty());
        assert_eq!(quadratic_roots(0.0, 2.0, -4.0), vec![2.0]);
    }
}
