//! Bragg Range Tool - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成 R80 批量分析任务。

use bragg_range_tool::{
    error::{ErrorCategory, RangeError},
    processing::BatchDriver,
    tools::{self, AppConfig, BatchStatsSnapshot, ParallelBatchStats},
};
use std::io::Write;
use std::process;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 参数/配置错误
    pub const INPUT_ERROR: i32 = 2;
    /// 读取/格式错误
    pub const IO_ERROR: i32 = 3;
    /// 数据/拟合错误
    pub const ANALYSIS_ERROR: i32 = 4;
    /// 资源/并发错误
    pub const RESOURCE_ERROR: i32 = 5;
}

/// 获取错误建议文本
fn get_error_suggestion(error: &RangeError) -> &'static str {
    match error {
        RangeError::InvalidInput(_) => {
            "检查命令行参数是否正确（重采样次数 ≥ 1，平滑因子 ≥ 0），使用 --help 查看完整用法 / Check command-line arguments (bootstraps >= 1, smoothing >= 0), use --help to see full usage"
        }
        RangeError::ResourceError(_) => {
            "资源不可用，尝试 --serial 串行模式或降低并发度（--parallel-files 1） / Resource unavailable, try --serial mode or reduce parallelism (--parallel-files 1)"
        }
        _ => match ErrorCategory::from_range_error(error) {
            ErrorCategory::Input => {
                "检查目录路径是否正确，文件是否存在且可读 / Check if the directory path is correct and files are readable"
            }
            ErrorCategory::Data => {
                "确认测量文件包含深度和增益数据段 / Make sure measurement files contain depth and gain sections"
            }
            ErrorCategory::Fit => {
                "曲线可能没有完整的远端下降沿 / The curve may not contain a complete distal fall-off"
            }
            ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input files and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: RangeError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match &error {
        RangeError::InvalidInput(_) => exit_codes::INPUT_ERROR,
        RangeError::ResourceError(_) => exit_codes::RESOURCE_ERROR,
        _ => match ErrorCategory::from_range_error(&error) {
            ErrorCategory::Input => exit_codes::IO_ERROR,
            ErrorCategory::Data | ErrorCategory::Fit => exit_codes::ANALYSIS_ERROR,
            ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 批量分析目录中的测量文件
fn process_batch_mode(config: &AppConfig) -> Result<(), RangeError> {
    let files =
        tools::scan_measurement_files(&config.input_path, &config.extension, config.recursive)?;

    let decorated = !config.is_machine_output();
    if decorated {
        tools::show_scan_results(config, &files);
    }

    if files.is_empty() {
        return Ok(());
    }

    let records = tools::load_records(&files, config);

    let driver = BatchDriver::new(config.batch_mode(), config.primary_smoothing)
        .with_parallel_degree(config.parallel_files.unwrap_or(1));

    if decorated && config.is_parallel() {
        println!(
            "⚡ 启用多文件并行处理：{} 并发度",
            config.parallel_files.unwrap_or(1)
        );
    }

    // 进度提示：verbose 模式显示每个文件，静默模式仅打点
    let progress = ParallelBatchStats::new();
    let total = records.len();
    let table = driver.run_with_progress(records, |_, row| {
        let done = progress.record(row);
        if !decorated {
            return;
        }
        if config.verbose {
            println!(
                "[{done}/{total}] {} - {}（累计失败 {} / failed so far）",
                row.identifier,
                row.status.display_name(),
                progress.failed()
            );
        } else {
            print!(".");
            std::io::stdout().flush().ok();
        }
    })?;

    if decorated && !config.verbose {
        println!(); // 进度点换行
    }

    let stats = BatchStatsSnapshot::from_table(&table);
    let output = tools::render(&table, config, &stats)?;
    tools::write_output(&output, config)?;

    if decorated {
        tools::show_batch_completion_info(config.output_path.as_deref(), &stats, config);
    }

    Ok(())
}

/// 应用程序主逻辑（便于测试和复用）
fn run() -> Result<(), RangeError> {
    // 1. 解析命令行参数
    let config = tools::parse_args();

    // 2. 显示启动信息
    if !config.is_machine_output() {
        tools::show_startup_info(&config);
    }

    // 3. 批量分析
    process_batch_mode(&config)?;

    if !config.is_machine_output() {
        tools::show_completion_info(&config);
    }
    Ok(())
}

fn main() {
    // 库内部诊断日志：默认只显示警告，可通过 RUST_LOG 调整
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(error) = run() {
        handle_error(error);
    }
}
