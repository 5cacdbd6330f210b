// ==========================================
// Relay 调期排程 - 引擎层错误类型
// ==========================================
// 只有数据完整性与配置错误以 Err 返回
// 求解失败/不可行一律降级为恒等方案，不在此列
// ==========================================

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum OptimizerError {
    // ===== 数据完整性错误 =====
    #[error("实例身份重复 ({count} 个键): {examples:?}")]
    DuplicateIdentity { count: usize, examples: Vec<String> },

    // ===== 配置错误 =====
    #[error("优化器配置无效: {0}")]
    Config(#[from] ConfigError),
}

/// Result 类型别名
pub type OptimizerResult<T> = Result<T, OptimizerError>;
