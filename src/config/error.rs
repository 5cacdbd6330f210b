// ==========================================
// Relay 调期排程 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 存储相关错误 =====
    #[error("配置库访问失败: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("配置快照序列化失败: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("锁获取失败: {0}")]
    LockPoisoned(String),

    // ===== 配置值错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ValueFormat {
        key: String,
        value: String,
        message: String,
    },

    #[error("配置校验失败 (key: {key}): {message}")]
    Invalid { key: String, message: String },
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
