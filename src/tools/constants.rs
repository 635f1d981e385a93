//! 常量和默认配置集中管理
//!
//! 将所有重要常量集中定义，避免"默认值漂移"和重复定义

/// 测量文件格式常量
pub mod file_format {
    /// 深度数据段标题
    pub const DEPTH_HEADER: &str = "Curve depth: [mm]";

    /// 增益数据段标题
    pub const GAIN_HEADER: &str = "Curve gains: [counts]";

    /// 数据行中数值之间的分隔符
    pub const VALUE_SEPARATOR: char = ';';

    /// 默认测量文件扩展名（大小写不敏感）
    pub const DEFAULT_EXTENSION: &str = "csv";
}

/// 默认配置值
pub mod defaults {
    /// 默认 bootstrap 重采样次数
    pub const BOOTSTRAPS: usize = 1000;

    /// 主 R80 拟合的默认平滑因子（0 = 插值）
    pub const PRIMARY_SMOOTHING: f64 = 0.0;

    /// bootstrap 拟合的默认平滑因子
    pub const BOOTSTRAP_SMOOTHING: f64 = 0.0;

    /// 默认多文件并行并发度
    ///
    /// 4并发度在多数场景下提供良好的性能/资源平衡
    pub const PARALLEL_FILES_DEGREE: usize = 4;

    /// 输出数值的小数位数
    pub const DECIMALS: usize = 2;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    ///
    /// 每条记录的 bootstrap 本身也会占用线程池，文件级并发不宜过高
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}
