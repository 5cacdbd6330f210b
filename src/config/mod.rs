// ==========================================
// Relay 调期排程 - 配置层
// ==========================================
// 职责: 优化器参数定义、默认值、校验、持久化覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod error;
pub mod optimizer_config;

// 重导出核心配置类型
pub use config_manager::ConfigManager;
pub use error::{ConfigError, ConfigResult};
pub use optimizer_config::{config_keys, OptimizerConfig};
