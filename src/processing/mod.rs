//! 批量处理模块
//!
//! 把测量记录批量转换为 R80 结果表，支持记录级并行。

pub mod batch;

pub use batch::{
    BatchDriver, BatchMode, MeasurementRecord, RecordIssue, ReplicateDigest, ResultRow,
    ResultTable, RowStatus, numeric_sort_key, percentage_error, sort_records,
};
