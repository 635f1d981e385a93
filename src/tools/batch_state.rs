//! 批处理状态管理模块
//!
//! 从结果行汇总成功/失败计数和失败原因分类，支持串行和并行两种模式。

use crate::error::ErrorCategory;
use crate::processing::{ResultRow, ResultTable, RowStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 批处理统计快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStatsSnapshot {
    /// 得到 R80 的文件数
    pub processed: usize,
    /// 损坏或 R80 未定义的文件数
    pub failed: usize,
    /// 得到 R80 但没有误差估计的文件数（包含在 processed 中）
    pub without_error: usize,
    /// 失败原因统计（错误类型 -> 文件列表）
    pub error_stats: HashMap<ErrorCategory, Vec<String>>,
}

impl BatchStatsSnapshot {
    /// 从完整结果表汇总（保持表中的行顺序）
    pub fn from_table(table: &ResultTable) -> Self {
        let mut snapshot = Self::default();
        for row in &table.rows {
            snapshot.record(row);
        }
        snapshot
    }

    fn record(&mut self, row: &ResultRow) {
        match row.status {
            RowStatus::Ok => self.processed += 1,
            RowStatus::NoErrorEstimate => {
                self.processed += 1;
                self.without_error += 1;
            }
            RowStatus::Corrupted | RowStatus::Undefined => {
                self.failed += 1;
                self.error_stats
                    .entry(failure_category(row))
                    .or_default()
                    .push(row.identifier.clone());
            }
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }

    /// 成功率（百分比）；没有文件时为 0
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.processed as f64 / self.total() as f64 * 100.0
        }
    }
}

fn failure_category(row: &ResultRow) -> ErrorCategory {
    row.failure
        .as_ref()
        .map_or(ErrorCategory::Other, |issue| issue.category)
}

/// 并行批处理统计（多线程安全）
///
/// 在记录完成回调中使用，用于实时进度显示；失败原因分类在结束后由快照汇总
#[derive(Debug, Clone)]
pub struct ParallelBatchStats {
    completed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl ParallelBatchStats {
    pub fn new() -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 记录一行结果，返回已完成的行数（线程安全）
    pub fn record(&self, row: &ResultRow) -> usize {
        if matches!(row.status, RowStatus::Corrupted | RowStatus::Undefined) {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}

impl Default for ParallelBatchStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use crate::processing::RecordIssue;

    fn row(identifier: &str, status: RowStatus, failure: Option<RangeError>) -> ResultRow {
        ResultRow {
            identifier: identifier.to_string(),
            r80: matches!(status, RowStatus::Ok | RowStatus::NoErrorEstimate).then_some(7.2),
            error: None,
            percentage_error: None,
            status,
            replicates: None,
            failure: failure.as_ref().map(RecordIssue::from_error),
        }
    }

    #[test]
    fn test_snapshot_from_table() {
        let table = ResultTable {
            with_errors: true,
            rows: vec![
                row("curve_1.csv", RowStatus::Ok, None),
                row("curve_2.csv", RowStatus::NoErrorEstimate, None),
                row(
                    "curve_3.csv",
                    RowStatus::Corrupted,
                    Some(RangeError::FormatError("bad".into())),
                ),
                row(
                    "curve_4.csv",
                    RowStatus::Undefined,
                    Some(RangeError::NoDistalRoot {
                        peak_depth: 9.0,
                        threshold: 7.2,
                    }),
                ),
            ],
        };

        let snapshot = BatchStatsSnapshot::from_table(&table);
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.without_error, 1);
        assert_eq!(snapshot.total(), 4);
        assert!((snapshot.success_rate() - 50.0).abs() < 1e-12);
        assert_eq!(snapshot.error_stats[&ErrorCategory::Input], ["curve_3.csv"]);
        assert_eq!(snapshot.error_stats[&ErrorCategory::Fit], ["curve_4.csv"]);
    }

    #[test]
    fn test_empty_table_success_rate() {
        let snapshot = BatchStatsSnapshot::from_table(&ResultTable {
            with_errors: false,
            rows: Vec::new(),
        });
        assert_eq!(snapshot.success_rate(), 0.0);
    }

    #[test]
    fn test_parallel_stats_concurrent_updates() {
        use rayon::prelude::*;

        let stats = ParallelBatchStats::new();
        (0..100).into_par_iter().for_each(|i| {
            let status = if i % 4 == 0 {
                RowStatus::Corrupted
            } else {
                RowStatus::Ok
            };
            stats.record(&row(&format!("curve_{i}.csv"), status, None));
        });

        assert_eq!(stats.completed(), 100);
        assert_eq!(stats.failed(), 25);
    }

    #[test]
    fn test_parallel_stats_clone_shares_state() {
        let stats1 = ParallelBatchStats::new();
        let stats2 = stats1.clone();
        stats1.record(&row("a", RowStatus::Ok, None));
        stats2.record(&row("b", RowStatus::Ok, None));
        assert_eq!(stats1.completed(), 2);
    }
}
