// ==========================================
// Relay 调期排程 - 建议排程领域模型
// ==========================================
// 红线: 每个输入实例在结果中恰好出现一次（求解或降级路径均成立）
// ==========================================

use crate::domain::relay::{PendingRequest, RelayStoreInstance};
use crate::domain::types::OutcomeStatus;
use crate::domain::week::WeekSlack;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// AdjacencyGroup - 调整组
// ==========================================
// 组内 relay 必须落在同一目标周；不足 2 个 relay 的组无效
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyGroup {
    pub group_id: String,
    pub relay_ids: Vec<String>, // 去重，按出现顺序
}

impl AdjacencyGroup {
    pub fn is_effective(&self) -> bool {
        self.relay_ids.len() >= 2
    }

    /// 参照 relay（组内第一个）
    pub fn reference(&self) -> Option<&str> {
        self.relay_ids.first().map(String::as_str)
    }
}

// ==========================================
// SuggestedAssignment - 建议排程记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAssignment {
    pub instance_id: String,                 // 实例键（展示形式）
    pub relay_id: String,
    pub store_id: String,
    pub original_week: Option<NaiveDate>,
    pub suggested_week: Option<NaiveDate>,
    pub hours: f64,
    pub store_type: String,
    pub dept_category: Option<String>,
    pub immovable: bool,
    pub adjacency_group: Option<String>,
    pub pending_request: Option<PendingRequest>,
}

impl SuggestedAssignment {
    /// 携带实例静态属性 + 建议周
    pub fn from_instance(instance: &RelayStoreInstance, suggested_week: Option<NaiveDate>) -> Self {
        Self {
            instance_id: instance.key.to_string(),
            relay_id: instance.relay_id().to_string(),
            store_id: instance.store_id().to_string(),
            original_week: instance.original_week(),
            suggested_week,
            hours: instance.hours,
            store_type: instance.store_type.clone(),
            dept_category: instance.dept_category.clone(),
            immovable: instance.immovable,
            adjacency_group: instance.adjacency_group.clone(),
            pending_request: instance.pending_request.clone(),
        }
    }

    /// 建议周是否偏离原始周
    pub fn is_moved(&self) -> bool {
        self.suggested_week != self.original_week
    }
}

// ==========================================
// OptimizationOutcome - 单次优化结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub run_id: String,                       // 运行ID（审计）
    pub status: OutcomeStatus,
    pub assignments: Vec<SuggestedAssignment>,
    pub week_slacks: Vec<WeekSlack>,          // 仅求解路径有值
    pub objective_value: Option<f64>,
    pub instances_count: usize,
    pub weeks_count: usize,
    pub elapsed_ms: u64,
}

impl OptimizationOutcome {
    /// 移动的实例数
    pub fn moved_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_moved()).count()
    }

    /// 全部周的总工时松弛之和
    pub fn total_slack_h(&self) -> f64 {
        self.week_slacks.iter().map(|s| s.total_slack_h).sum()
    }

    /// 全部周的子池工时松弛之和
    pub fn subpool_slack_h(&self) -> f64 {
        self.week_slacks.iter().map(|s| s.subpool_slack_h).sum()
    }
}
