//! 通用工具模块
//!
//! 诊断输出屏蔽等与具体算法无关的基础设施。

pub mod diagnostics;

pub use diagnostics::{DiagnosticsGuard, emit_warning, with_suppressed};
