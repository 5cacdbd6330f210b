// ==========================================
// Relay 调期排程 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、产能接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod relay;
pub mod schedule;
pub mod types;
pub mod week;

// 重导出核心类型
pub use relay::{
    InstanceKey, PendingRequest, RawRelayRecord, RelayStoreInstance, MISSING_WEEK_SENTINEL,
    NO_GROUP, UNKNOWN_STORE_TYPE,
};
pub use schedule::{AdjacencyGroup, OptimizationOutcome, SuggestedAssignment};
pub use types::{FallbackReason, ImmovableMode, OutcomeStatus};
pub use week::{CapacityConstraint, WeekCapacity, WeekLoad, WeekSlack};
