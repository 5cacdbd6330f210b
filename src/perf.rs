// ==========================================
// Relay 调期排程 - 阶段耗时统计
// ==========================================
// PerfGuard 离开作用域时输出 target = "perf" 的耗时事件
// 嵌套深度按线程统计，便于区分整体耗时与子阶段耗时
// ==========================================

use std::cell::Cell;
use std::time::Instant;

thread_local! {
    static PERF_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// 当前线程上活跃的 PerfGuard 数量
pub fn current_depth() -> u32 {
    PERF_DEPTH.with(|d| d.get())
}

/// 性能统计 Guard：记录 elapsed_ms + 嵌套深度
///
/// 使用方式：
/// ```ignore
/// let _perf = modular_balancing::perf::PerfGuard::new("build_model");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    depth: u32,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        let depth = PERF_DEPTH.with(|d| {
            let depth = d.get();
            d.set(depth.saturating_add(1));
            depth
        });
        Self {
            op,
            start: Instant::now(),
            depth,
        }
    }

    /// 已耗时（毫秒）
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.elapsed_ms();

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            depth = self.depth,
            "done"
        );

        PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_guard_tracks_depth() {
        assert_eq!(current_depth(), 0);
        {
            let _outer = PerfGuard::new("outer");
            assert_eq!(current_depth(), 1);
            {
                let inner = PerfGuard::new("inner");
                assert_eq!(current_depth(), 2);
                assert!(inner.elapsed_ms() < 60_000);
            }
            assert_eq!(current_depth(), 1);
        }
        assert_eq!(current_depth(), 0);
    }
}
