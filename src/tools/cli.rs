//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use super::constants::{defaults, file_format};
use super::formatter::OutputFormat;
use crate::processing::BatchMode;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 应用程序配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 测量文件所在目录
    pub input_path: PathBuf,

    /// 是否显示详细信息
    pub verbose: bool,

    /// 输出文件路径（None 表示输出到控制台）
    pub output_path: Option<PathBuf>,

    /// 输出格式
    pub format: OutputFormat,

    /// 是否计算 bootstrap 误差
    pub with_errors: bool,

    /// bootstrap 重采样次数
    pub n_bootstraps: usize,

    /// bootstrap 拟合的平滑因子
    pub smoothing: f64,

    /// 主 R80 拟合的平滑因子
    pub primary_smoothing: f64,

    /// 固定随机种子（可复现运行）
    pub seed: Option<u64>,

    /// 测量文件扩展名（不含点，大小写不敏感）
    pub extension: String,

    /// 是否递归扫描子目录
    pub recursive: bool,

    /// 文件级并发度（None 表示串行）
    pub parallel_files: Option<usize>,

    /// 深度数据段标题
    pub depth_header: String,

    /// 增益数据段标题
    pub gain_header: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("."),
            verbose: false,
            output_path: None,
            format: OutputFormat::Table,
            with_errors: false,
            n_bootstraps: defaults::BOOTSTRAPS,
            smoothing: defaults::BOOTSTRAP_SMOOTHING,
            primary_smoothing: defaults::PRIMARY_SMOOTHING,
            seed: None,
            extension: file_format::DEFAULT_EXTENSION.to_string(),
            recursive: false,
            parallel_files: Some(defaults::PARALLEL_FILES_DEGREE),
            depth_header: file_format::DEPTH_HEADER.to_string(),
            gain_header: file_format::GAIN_HEADER.to_string(),
        }
    }
}

impl AppConfig {
    /// 对应的批量分析模式
    pub fn batch_mode(&self) -> BatchMode {
        if self.with_errors {
            BatchMode::WithErrors {
                n_bootstraps: self.n_bootstraps,
                smoothing: self.smoothing,
                seed: self.seed,
                // --serial 同时关闭重采样级并行
                parallel_replicates: self.parallel_files.is_some(),
            }
        } else {
            BatchMode::RangeOnly
        }
    }

    /// CSV/JSON 输出到控制台时，不打印进度和提示信息
    #[inline]
    pub fn is_machine_output(&self) -> bool {
        self.output_path.is_none() && matches!(self.format, OutputFormat::Csv | OutputFormat::Json)
    }

    /// 是否启用文件级并行
    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.parallel_files.is_some_and(|degree| degree > 1)
    }
}

/// 构建命令行定义
pub fn build_command() -> Command {
    Command::new("bragg-range")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("Bragg Range Tool Team")
        .arg(
            Arg::new("INPUT")
                .help("测量文件所在目录。如果不指定，将扫描可执行文件所在目录")
                .required(false)
                .index(1),
        )
        .arg(
            Arg::new("errors")
                .long("errors")
                .short('e')
                .help("使用 bootstrap 计算 R80 误差 / compute bootstrap R80 errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("bootstraps")
                .long("bootstraps")
                .short('n')
                .help("bootstrap 重采样次数 / number of bootstrap replicates")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("1000"),
        )
        .arg(
            Arg::new("smoothing")
                .long("smoothing")
                .short('s')
                .help("bootstrap 拟合的平滑因子 / smoothing factor for bootstrap fits")
                .value_name("S")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64))
                .default_value("0"),
        )
        .arg(
            Arg::new("primary-smoothing")
                .long("primary-smoothing")
                .help("主 R80 拟合的平滑因子 / smoothing factor for the primary R80 fit")
                .value_name("S")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64))
                .default_value("0"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("固定随机种子，使结果可复现 / fixed random seed for reproducible runs")
                .value_name("SEED")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("extension")
                .long("extension")
                .help("测量文件扩展名 / measurement file extension")
                .value_name("EXT")
                .default_value(file_format::DEFAULT_EXTENSION),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .help("递归扫描子目录 / scan subdirectories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("输出结果到文件")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("输出格式 / output format")
                .value_name("FORMAT")
                .value_parser(["table", "csv", "json", "report"])
                .default_value("table"),
        )
        .arg(
            Arg::new("parallel-files")
                .long("parallel-files")
                .help("文件级并发度 / number of files analyzed in parallel")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("禁用所有并行处理 / disable all parallel processing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("depth-header")
                .long("depth-header")
                .help("深度数据段标题 / depth section header")
                .value_name("TEXT")
                .default_value(file_format::DEPTH_HEADER),
        )
        .arg(
            Arg::new("gain-header")
                .long("gain-header")
                .help("增益数据段标题 / gain section header")
                .value_name("TEXT")
                .default_value(file_format::GAIN_HEADER),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("显示详细处理信息")
                .action(ArgAction::SetTrue),
        )
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

/// 从解析结果创建配置
pub fn config_from_matches(matches: &ArgMatches) -> AppConfig {
    let fallback = AppConfig::default();

    // 确定输入路径（未指定时使用可执行文件所在目录）
    let input_path = match matches.get_one::<String>("INPUT") {
        Some(input) => PathBuf::from(input),
        None => {
            let exe_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
            super::utils::get_parent_dir(&exe_path).to_path_buf()
        }
    };

    let format = matches
        .get_one::<String>("format")
        .and_then(|f| f.parse().ok())
        .unwrap_or(fallback.format);

    let parallel_files = if matches.get_flag("serial") {
        None
    } else {
        let requested = matches
            .get_one::<usize>("parallel-files")
            .copied()
            .unwrap_or(defaults::PARALLEL_FILES_DEGREE);
        Some(super::utils::effective_parallel_degree(requested))
    };

    AppConfig {
        input_path,
        verbose: matches.get_flag("verbose"),
        output_path: matches.get_one::<String>("output").map(PathBuf::from),
        format,
        with_errors: matches.get_flag("errors"),
        n_bootstraps: matches
            .get_one::<usize>("bootstraps")
            .copied()
            .unwrap_or(fallback.n_bootstraps),
        smoothing: matches
            .get_one::<f64>("smoothing")
            .copied()
            .unwrap_or(fallback.smoothing),
        primary_smoothing: matches
            .get_one::<f64>("primary-smoothing")
            .copied()
            .unwrap_or(fallback.primary_smoothing),
        seed: matches.get_one::<u64>("seed").copied(),
        extension: matches
            .get_one::<String>("extension")
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or(fallback.extension),
        recursive: matches.get_flag("recursive"),
        parallel_files,
        depth_header: matches
            .get_one::<String>("depth-header")
            .cloned()
            .unwrap_or(fallback.depth_header),
        gain_header: matches
            .get_one::<String>("gain-header")
            .cloned()
            .unwrap_or(fallback.gain_header),
    }
}

/// 显示程序启动信息
pub fn show_startup_info(config: &AppConfig) {
    println!("🚀 Bragg Range Tool v{VERSION} 启动");
    println!("📝 {DESCRIPTION}");
    if config.verbose {
        if config.with_errors {
            println!(
                "🎲 误差模式: {} 次 bootstrap, s = {}{}",
                config.n_bootstraps,
                config.smoothing,
                config
                    .seed
                    .map(|seed| format!(", seed = {seed}"))
                    .unwrap_or_default()
            );
        } else {
            println!("📏 射程模式: 仅计算 R80");
        }
        match config.parallel_files {
            Some(degree) => println!("⚡ 文件级并发度: {degree}"),
            None => println!("🐢 串行处理"),
        }
    }
    println!();
}

/// 显示程序完成信息
pub fn show_completion_info(config: &AppConfig) {
    if config.verbose {
        println!("✅ 所有任务处理完成！");
    }
}
