//! 工具模块集合
//!
//! 包含CLI、文件扫描与读取、格式化等工具模块，支持main.rs的流程控制。

pub mod batch_state;
pub mod cli;
pub mod constants;
pub mod formatter;
pub mod loader;
pub mod scanner;
pub mod utils;

// 重新导出主要的公共接口
pub use batch_state::{BatchStatsSnapshot, ParallelBatchStats};
pub use cli::{AppConfig, parse_args, show_completion_info, show_startup_info};
pub use formatter::{OutputFormat, render, write_output};
pub use loader::{extract_section, load_record, load_records};
pub use scanner::{scan_measurement_files, show_batch_completion_info, show_scan_results};
pub use utils::path;
