//! 数值诊断输出管理
//!
//! 样条拟合等数值例程会向标准错误流写出诊断信息（例如平滑目标在迭代上限内未达成）。
//! 批量分析和 bootstrap 会在一次拟合期间屏蔽这些输出，离开作用域时无条件恢复。
//!
//! 屏蔽状态是线程本地的：rayon 工作线程上的重采样互不干扰。

use std::cell::Cell;
use std::fmt;

thread_local! {
    /// 当前线程上处于活动状态的屏蔽守卫数量
    static SUPPRESS_DEPTH: Cell<usize> = const { Cell::new(0) };
    /// 被屏蔽的诊断消息计数（用于统计与测试）
    static SUPPRESSED_COUNT: Cell<u64> = const { Cell::new(0) };
}

/// 诊断输出屏蔽守卫
///
/// 创建时获取屏蔽，`Drop` 时释放。提前返回、`?` 传播和 panic 展开都会经过 `Drop`，
/// 因此屏蔽状态总能恢复。守卫可以嵌套。
#[must_use = "守卫被丢弃时屏蔽立即结束 / suppression ends as soon as the guard is dropped"]
pub struct DiagnosticsGuard {
    // 守卫绑定在创建它的线程上
    _not_send: std::marker::PhantomData<*const ()>,
}

impl DiagnosticsGuard {
    /// 开始屏蔽当前线程的诊断输出
    pub fn suppress() -> Self {
        SUPPRESS_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for DiagnosticsGuard {
    fn drop(&mut self) {
        SUPPRESS_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// 在屏蔽诊断输出的作用域内执行闭包
pub fn with_suppressed<T>(f: impl FnOnce() -> T) -> T {
    let _guard = DiagnosticsGuard::suppress();
    f()
}

/// 当前线程是否处于屏蔽状态
#[inline]
pub fn is_suppressed() -> bool {
    SUPPRESS_DEPTH.with(|depth| depth.get() > 0)
}

/// 当前线程累计被屏蔽的诊断消息数
pub fn suppressed_count() -> u64 {
    SUPPRESSED_COUNT.with(|count| count.get())
}

/// 写出一条数值诊断警告（屏蔽时只计数）
pub fn emit_warning(message: impl fmt::Display) {
    if is_suppressed() {
        SUPPRESSED_COUNT.with(|count| count.set(count.get() + 1));
    } else {
        eprintln!("[WARNING] {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_on_drop() {
        assert!(!is_suppressed());
        {
            let _guard = DiagnosticsGuard::suppress();
            assert!(is_suppressed());
        }
        assert!(!is_suppressed());
    }

    #[test]
    fn test_nested_guards() {
        let outer = DiagnosticsGuard::suppress();
        {
            let _inner = DiagnosticsGuard::suppress();
            assert!(is_suppressed());
        }
        // 内层释放后外层仍然有效
        assert!(is_suppressed());
        drop(outer);
        assert!(!is_suppressed());
    }

    #[test]
    fn test_suppressed_messages_are_counted() {
        let before = suppressed_count();
        with_suppressed(|| {
            emit_warning("hidden");
            emit_warning("hidden again");
        });
        assert_eq!(suppressed_count(), before + 2);
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        fn failing() -> Result<(), String> {
            let _guard = DiagnosticsGuard::suppress();
            Err::<(), _>("fit failed".to_string())?;
            Ok(())
        }

        assert!(failing().is_err());
        assert!(!is_suppressed());
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = DiagnosticsGuard::suppress();
            panic!("numerical blow-up");
        });
        assert!(result.is_err());
        assert!(!is_suppressed());
    }
}
