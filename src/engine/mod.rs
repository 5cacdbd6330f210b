// ==========================================
// Relay 调期排程 - 引擎层
// ==========================================
// 职责: 实例归一化 → 候选周 → 周阈值 → 约束模型 → 求解 → 提取/降级 → 报表
// 红线: 求解失败不向调用方报错，一律降级为恒等方案
// ==========================================

pub mod cache;
pub mod error;
pub mod extractor;
pub mod model;
pub mod normalizer;
pub mod orchestrator;
pub mod report;
pub mod solver;
pub mod threshold;
pub mod week_universe;

// 重导出核心引擎
pub use cache::{fingerprint, Clock, OptimizationCache, SystemClock, DEFAULT_CACHE_TTL_MINUTES};
pub use error::{OptimizerError, OptimizerResult};
pub use extractor::{extract, identity_fallback, Extraction};
pub use model::{
    collect_adjacency_groups, AssignmentModel, LinearRow, ModelBuilder, RowSense, VarKind,
    VariableArena,
};
pub use normalizer::{InstanceNormalizer, NormalizationReport};
pub use orchestrator::RelayOptimizer;
pub use report::{DepartmentMoves, MoveReport, MoveReportEngine, PendingRequestSummary, WeekComparison};
pub use solver::{HighsSolver, MilpSolver, SolveStatus, SolverError, SolverOutput};
pub use threshold::ThresholdResolver;
pub use week_universe::WeekUniverseBuilder;
