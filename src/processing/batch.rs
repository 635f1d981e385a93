//! 批量 R80 分析驱动
//!
//! 把一组测量记录按标识符中的数字排序，逐条计算 R80（可选 bootstrap 误差），
//! 产出与输入顺序无关、按数字顺序排列的结果表。
//! 单条记录的任何失败都只体现在该行的状态上，不会中断整批分析；
//! 只有配置错误会让 `run` 返回 `Err`。

use crate::core::bootstrap::{
    BootstrapConfig, BootstrapEstimator, BootstrapResult, MIN_ROI_POINTS, Roi, replicate_seed,
};
use crate::core::curve::Curve;
use crate::core::r80::R80Extractor;
use crate::error::{ErrorCategory, RangeError, RangeResult};
use rayon::prelude::*;
use serde::Serialize;

/// 读取阶段记录的问题（文件不可读、数据段无法解析）
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssue {
    pub category: ErrorCategory,
    pub message: String,
}

impl RecordIssue {
    pub fn from_error(err: &RangeError) -> Self {
        Self {
            category: ErrorCategory::from_range_error(err),
            message: err.to_string(),
        }
    }
}

/// 一条测量记录：标识符 + 深度/增益数组（任一可为空，表示缺失）
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub identifier: String,
    pub depths: Vec<f64>,
    pub gains: Vec<f64>,
    pub issue: Option<RecordIssue>,
}

impl MeasurementRecord {
    pub fn new(identifier: impl Into<String>, depths: Vec<f64>, gains: Vec<f64>) -> Self {
        Self {
            identifier: identifier.into(),
            depths,
            gains,
            issue: None,
        }
    }

    /// 读取失败的记录：数组为空，并保留失败原因
    pub fn corrupted(identifier: impl Into<String>, err: &RangeError) -> Self {
        Self {
            identifier: identifier.into(),
            depths: Vec::new(),
            gains: Vec::new(),
            issue: Some(RecordIssue::from_error(err)),
        }
    }

    /// 转换为曲线；缺失、为空或长度不一致都视为损坏
    pub fn to_curve(&self) -> RangeResult<Curve> {
        if self.depths.is_empty() || self.gains.is_empty() {
            return Err(RangeError::InsufficientData(format!(
                "{}: 缺少深度或增益数据 / missing depth or gain data",
                self.identifier
            )));
        }
        Curve::new(self.depths.clone(), self.gains.clone())
    }
}

/// 标识符中第一段连续数字的数值；没有数字时返回 None（排在最后）
pub fn numeric_sort_key(identifier: &str) -> Option<u64> {
    let start = identifier.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = identifier[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or_default();
    // 超出 u64 的数字串排在所有可解析数字之后
    Some(digits.parse().unwrap_or(u64::MAX))
}

/// 按数字键稳定排序（数字相同保持输入顺序）
pub fn sort_records(records: &mut [MeasurementRecord]) {
    records.sort_by_key(|record| match numeric_sort_key(&record.identifier) {
        Some(key) => (0u8, key),
        None => (1u8, 0),
    });
}

/// 结果行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// 所有请求的量都已算出
    Ok,
    /// 记录缺失/损坏，未做计算
    Corrupted,
    /// R80 未定义（拟合失败或无远端交点）
    Undefined,
    /// R80 已算出，但 bootstrap 未能给出误差（ROI 点数不足或有效样本少于2个）
    NoErrorEstimate,
}

impl RowStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Corrupted => "损坏 / corrupted",
            Self::Undefined => "未定义 / undefined",
            Self::NoErrorEstimate => "无误差 / no error estimate",
        }
    }
}

/// 一行结果中 bootstrap 的运行概况
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReplicateDigest {
    pub attempted: usize,
    pub valid: usize,
    pub roi_points: usize,
    pub degraded: bool,
}

/// 结果表中的一行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub identifier: String,
    pub r80: Option<f64>,
    pub error: Option<f64>,
    pub percentage_error: Option<f64>,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicates: Option<ReplicateDigest>,
    #[serde(skip)]
    pub failure: Option<RecordIssue>,
}

impl ResultRow {
    fn corrupted(identifier: &str, issue: RecordIssue) -> Self {
        Self {
            identifier: identifier.to_string(),
            r80: None,
            error: None,
            percentage_error: None,
            status: RowStatus::Corrupted,
            replicates: None,
            failure: Some(issue),
        }
    }

    fn undefined(identifier: &str, err: &RangeError) -> Self {
        Self {
            status: RowStatus::Undefined,
            ..Self::corrupted(identifier, RecordIssue::from_error(err))
        }
    }
}

/// 百分比误差 = 100 × error / R80；R80 为 0 或非有限时未定义
pub fn percentage_error(r80: f64, error: f64) -> Option<f64> {
    if r80 == 0.0 || !r80.is_finite() || !error.is_finite() {
        return None;
    }
    Some(100.0 * error / r80)
}

/// 分析模式
#[derive(Debug, Clone, PartialEq)]
pub enum BatchMode {
    /// 只计算 R80
    RangeOnly,
    /// R80 + bootstrap 误差
    WithErrors {
        n_bootstraps: usize,
        smoothing: f64,
        seed: Option<u64>,
        parallel_replicates: bool,
    },
}

impl BatchMode {
    #[inline]
    pub fn with_errors(&self) -> bool {
        matches!(self, Self::WithErrors { .. })
    }
}

/// 结果表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub with_errors: bool,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub const RANGE_COLUMNS: &'static [&'static str] = &["File", "Distal 80% Range [mm]"];
    pub const ERROR_COLUMNS: &'static [&'static str] = &[
        "File",
        "Distal 80% Range [mm]",
        "Error [mm]",
        "Error [%]",
    ];

    /// 当前模式对应的列名
    pub fn columns(&self) -> &'static [&'static str] {
        if self.with_errors {
            Self::ERROR_COLUMNS
        } else {
            Self::RANGE_COLUMNS
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 状态为指定值的行数
    pub fn count_status(&self, status: RowStatus) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }
}

/// 有序结果容器（并行处理后按索引恢复顺序）
struct OrderedRow {
    index: usize,
    row: ResultRow,
}

/// 批量分析驱动
#[derive(Debug, Clone)]
pub struct BatchDriver {
    mode: BatchMode,
    extractor: R80Extractor,
    parallel_degree: usize,
}

impl BatchDriver {
    /// 创建驱动；`primary_smoothing` 用于主 R80 拟合（默认 0，插值）
    pub fn new(mode: BatchMode, primary_smoothing: f64) -> Self {
        Self {
            mode,
            extractor: R80Extractor::new(primary_smoothing),
            parallel_degree: 1,
        }
    }

    /// 设置记录级并发度（≤1 表示串行）
    pub fn with_parallel_degree(mut self, degree: usize) -> Self {
        self.parallel_degree = degree.max(1);
        self
    }

    #[inline]
    pub fn mode(&self) -> &BatchMode {
        &self.mode
    }

    /// 验证配置（唯一会终止整批运行的检查）
    pub fn validate(&self) -> RangeResult<()> {
        let primary = self.extractor.smoothing();
        if !primary.is_finite() || primary < 0.0 {
            return Err(RangeError::InvalidInput(format!(
                "平滑因子必须是非负有限数 / smoothing factor must be finite and >= 0, got {primary}"
            )));
        }
        if let BatchMode::WithErrors {
            n_bootstraps,
            smoothing,
            ..
        } = self.mode
        {
            BootstrapConfig::new(n_bootstraps, smoothing, Roi::around_r80(0.0)).validate()?;
        }
        Ok(())
    }

    /// 分析全部记录
    pub fn run(&self, records: Vec<MeasurementRecord>) -> RangeResult<ResultTable> {
        self.run_with_progress(records, |_, _| {})
    }

    /// 分析全部记录，每完成一行回调一次（并行时回调顺序不确定）
    pub fn run_with_progress<F>(
        &self,
        mut records: Vec<MeasurementRecord>,
        on_row: F,
    ) -> RangeResult<ResultTable>
    where
        F: Fn(usize, &ResultRow) + Sync,
    {
        self.validate()?;
        sort_records(&mut records);

        log::info!(
            "分析 {} 条记录（{}）/ analyzing {} records",
            records.len(),
            if self.mode.with_errors() {
                "R80 + 误差"
            } else {
                "仅 R80"
            },
            records.len()
        );

        let rows = if self.parallel_degree > 1 && records.len() > 1 {
            match self.run_parallel(&records, &on_row) {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("{e}，改为串行处理 / falling back to serial processing");
                    self.run_serial(&records, &on_row)
                }
            }
        } else {
            self.run_serial(&records, &on_row)
        };

        Ok(ResultTable {
            with_errors: self.mode.with_errors(),
            rows,
        })
    }

    fn run_serial<F>(&self, records: &[MeasurementRecord], on_row: &F) -> Vec<ResultRow>
    where
        F: Fn(usize, &ResultRow) + Sync,
    {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let row = self.process_record(index, record);
                on_row(index, &row);
                row
            })
            .collect()
    }

    fn run_parallel<F>(
        &self,
        records: &[MeasurementRecord],
        on_row: &F,
    ) -> RangeResult<Vec<ResultRow>>
    where
        F: Fn(usize, &ResultRow) + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_degree)
            .thread_name(|i| format!("r80-worker-{i}"))
            .build()
            .map_err(|e| RangeError::ResourceError(format!("线程池创建失败: {e}")))?;

        let mut ordered: Vec<OrderedRow> = pool.install(|| {
            records
                .par_iter()
                .enumerate()
                .map(|(index, record)| {
                    let row = self.process_record(index, record);
                    on_row(index, &row);
                    OrderedRow { index, row }
                })
                .collect()
        });

        ordered.sort_by_key(|r| r.index);
        Ok(ordered.into_iter().map(|r| r.row).collect())
    }

    /// 处理单条记录；`position` 是排序后的序号，用于派生 bootstrap 种子
    fn process_record(&self, position: usize, record: &MeasurementRecord) -> ResultRow {
        let id = record.identifier.as_str();

        if let Some(issue) = &record.issue {
            log::debug!("{id}: 记录已损坏 / corrupted record: {}", issue.message);
            return ResultRow::corrupted(id, issue.clone());
        }

        let curve = match record.to_curve() {
            Ok(curve) => curve,
            Err(e) => {
                log::debug!("{id}: {e}");
                return ResultRow::corrupted(id, RecordIssue::from_error(&e));
            }
        };

        let r80 = match self.extractor.analyze(&curve) {
            Ok(analysis) => analysis.r80,
            Err(e) => {
                log::debug!("{id}: R80 未定义 / R80 undefined: {e}");
                return ResultRow::undefined(id, &e);
            }
        };

        let BatchMode::WithErrors {
            n_bootstraps,
            smoothing,
            seed,
            parallel_replicates,
        } = self.mode
        else {
            return ResultRow {
                identifier: id.to_string(),
                r80: Some(r80),
                error: None,
                percentage_error: None,
                status: RowStatus::Ok,
                replicates: None,
                failure: None,
            };
        };

        let mut config = BootstrapConfig::new(n_bootstraps, smoothing, Roi::around_r80(r80))
            .with_parallel(parallel_replicates);
        if let Some(seed) = seed {
            config = config.with_seed(replicate_seed(seed, position as u64));
        }

        // 用户配置已在 validate 中检查过，这里只可能是由 R80 推导出的空 ROI
        let result = match BootstrapEstimator::new(config) {
            Ok(estimator) => estimator.run(&curve),
            Err(e) => {
                log::warn!("{id}: ROI 无效，跳过误差估计 / invalid ROI, no error estimate: {e}");
                BootstrapResult::degraded(0, curve.len())
            }
        };

        let error = result.error();
        let percentage = error.and_then(|err| percentage_error(r80, err));
        let status = if error.is_some() {
            RowStatus::Ok
        } else {
            RowStatus::NoErrorEstimate
        };
        let failure = result.degraded.then(|| {
            RecordIssue::from_error(&RangeError::DegenerateRoi {
                points: result.roi_points,
                required: MIN_ROI_POINTS,
            })
        });

        ResultRow {
            identifier: id.to_string(),
            r80: Some(r80),
            error,
            percentage_error: percentage,
            status,
            replicates: Some(ReplicateDigest {
                attempted: result.attempted,
                valid: result.draws.len(),
                roi_points: result.roi_points,
                degraded: result.degraded,
            }),
            failure,
        }
    }
}
