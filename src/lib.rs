// ==========================================
// Relay 调期排程 - 核心库
// ==========================================
// 技术栈: Rust + good_lp(HiGHS) + SQLite
// 系统定位: 决策支持系统（输出建议排程，人工最终决定）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 建模、求解、报表
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 优化器参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FallbackReason, ImmovableMode, OutcomeStatus};

// 领域实体
pub use domain::{
    AdjacencyGroup, InstanceKey, OptimizationOutcome, PendingRequest, RawRelayRecord,
    RelayStoreInstance, SuggestedAssignment, WeekCapacity, WeekLoad, WeekSlack,
};

// 配置
pub use config::{ConfigManager, OptimizerConfig};

// 引擎
pub use engine::{
    HighsSolver, MilpSolver, MoveReport, MoveReportEngine, OptimizationCache, OptimizerError,
    RelayOptimizer,
};

// 导入/导出
pub use importer::{import_relay_file, write_assignments_csv, RelayImportReport};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Relay 调期排程";
