//! generate-curves - 合成测量数据生成工具
//!
//! 生成 Bortfeld 形状的深度-剂量曲线，写成与测量文件相同的分段格式，
//! 便于端到端演示 R80 分析。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use bragg_range_tool::core::{bortfeld, linspace};
use bragg_range_tool::tools::constants::file_format::{DEPTH_HEADER, GAIN_HEADER};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

#[derive(Parser)]
#[command(name = "generate-curves")]
#[command(about = "生成合成布拉格峰测量文件 / Generate synthetic Bragg peak measurement files")]
#[command(version)]
struct Cli {
    /// 输出目录
    /// Output directory
    #[arg(default_value = "synthetic-curves")]
    output: PathBuf,

    /// 生成的文件数
    /// Number of files
    #[arg(long, short = 'n', default_value_t = 10)]
    count: usize,

    /// 第一条曲线的射程参数 R [mm]
    /// Range parameter R of the first curve [mm]
    #[arg(long, default_value_t = 150.0)]
    range: f64,

    /// 相邻曲线的射程增量 [mm]
    /// Range increment between curves [mm]
    #[arg(long, default_value_t = 5.0)]
    range_step: f64,

    /// Bortfeld 参数 a [1/mm]
    #[arg(long, default_value_t = 0.01)]
    a: f64,

    /// Bortfeld 参数 b [mm]
    #[arg(long, default_value_t = 3.0)]
    b: f64,

    /// 峰值信号 [counts]
    /// Peak signal [counts]
    #[arg(long, default_value_t = 1000.0)]
    peak: f64,

    /// 深度采样间隔 [mm]
    /// Depth sampling step [mm]
    #[arg(long, default_value_t = 0.5)]
    step: f64,

    /// 相对噪声水平（高斯噪声标准差 / 信号）
    /// Relative noise level (Gaussian sigma / signal)
    #[arg(long, default_value_t = 0.01)]
    noise: f64,

    /// 随机种子
    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// 一条曲线的测量文件内容
fn render_curve(cli: &Cli, range: f64, normal: &Normal<f64>, rng: &mut StdRng) -> String {
    let max_depth = range + 30.0;
    let count = (max_depth / cli.step).round() as usize + 1;
    let depths = linspace(0.0, max_depth, count);

    // 把峰值归一化到 cli.peak
    let peak_offset = ((1.0 - (cli.a * cli.b).powi(2)).sqrt() - 1.0) / cli.a;
    let d0 = cli.peak / bortfeld(range + peak_offset, 1.0, cli.a, cli.b, range);

    let gains: Vec<String> = depths
        .iter()
        .map(|&z| {
            let clean = bortfeld(z, d0, cli.a, cli.b, range);
            let noisy = clean * (1.0 + cli.noise * normal.sample(rng));
            format!("{:.3}", noisy.max(0.0))
        })
        .collect();
    let depths: Vec<String> = depths.iter().map(|z| format!("{z:.3}")).collect();

    format!(
        "Synthetic Bragg curve (R = {range:.2} mm)\n\n{DEPTH_HEADER}\n{}\n\n{GAIN_HEADER}\n{}\n",
        depths.join(";"),
        gains.join(";")
    )
}

fn write_curves(cli: &Cli, output: &Path) -> Result<usize> {
    fs::create_dir_all(output)
        .with_context(|| format!("无法创建输出目录 / cannot create {}", output.display()))?;

    let normal = Normal::new(0.0, 1.0).context("无法构造正态分布 / cannot build normal distribution")?;
    let mut rng = StdRng::seed_from_u64(cli.seed);
    for i in 1..=cli.count {
        let range = cli.range + (i - 1) as f64 * cli.range_step;
        let path = output.join(format!("curve_{i}.csv"));
        fs::write(&path, render_curve(cli, range, &normal, &mut rng))
            .with_context(|| format!("写入失败 / failed to write {}", path.display()))?;
    }

    Ok(cli.count)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    ensure!(cli.step > 0.0, "采样间隔必须为正 / step must be positive");
    ensure!(
        cli.a > 0.0 && cli.a * cli.b < 1.0,
        "Bortfeld 参数需满足 a > 0 且 a·b < 1 / parameters must satisfy a > 0 and a*b < 1"
    );
    ensure!(cli.noise >= 0.0, "噪声水平不能为负 / noise must be non-negative");

    let written = write_curves(&cli, &cli.output)?;
    println!(
        "✅ 已生成 {written} 个测量文件 / generated {written} files in {}",
        cli.output.display()
    );

    Ok(())
}
