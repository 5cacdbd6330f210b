// ==========================================
// Relay 调期排程 - 领域类型定义
// ==========================================
// 职责: 优化结果状态、降级原因、不可移动规则模式
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 不可移动规则模式 (Immovable Mode)
// ==========================================
// 季节性/DC 调整类 relay 原则上不移动
// Soft: 仅通过移动成本表达偏好（默认）
// Hard: 对原始周加等式约束（原始周缺失或不在候选周内时跳过）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImmovableMode {
    #[default]
    Soft,
    Hard,
}

impl fmt::Display for ImmovableMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImmovableMode::Soft => write!(f, "SOFT"),
            ImmovableMode::Hard => write!(f, "HARD"),
        }
    }
}

impl std::str::FromStr for ImmovableMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(ImmovableMode::Soft),
            "hard" => Ok(ImmovableMode::Hard),
            other => Err(format!("未知不可移动模式: {}", other)),
        }
    }
}

// ==========================================
// 降级原因 (Fallback Reason)
// ==========================================
// 任何一种原因都会输出"原周不变"的恒等方案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackReason {
    NoEligibleWeeks,          // 候选周为空
    Infeasible,               // 求解器判定不可行/未知/超时无解
    SolverError(String),      // 求解器调用本身失败
    InconsistentSolution(String), // 解中某实例不满足"恰好一周"
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoEligibleWeeks => write!(f, "NO_ELIGIBLE_WEEKS"),
            FallbackReason::Infeasible => write!(f, "INFEASIBLE"),
            FallbackReason::SolverError(msg) => write!(f, "SOLVER_ERROR: {}", msg),
            FallbackReason::InconsistentSolution(msg) => {
                write!(f, "INCONSISTENT_SOLUTION: {}", msg)
            }
        }
    }
}

// ==========================================
// 优化结果状态 (Outcome Status)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Optimal,                   // 求解器证明最优
    Feasible,                  // 时间上限内找到可行解（未证明最优）
    Fallback { reason: FallbackReason }, // 恒等降级方案
    EmptyScope,                // 无实例，空操作
}

impl OutcomeStatus {
    /// 是否为求解器产出的方案（最优或可行）
    pub fn is_solved(&self) -> bool {
        matches!(self, OutcomeStatus::Optimal | OutcomeStatus::Feasible)
    }

    /// 是否为恒等降级方案
    pub fn is_fallback(&self) -> bool {
        matches!(self, OutcomeStatus::Fallback { .. })
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Optimal => write!(f, "OPTIMAL"),
            OutcomeStatus::Feasible => write!(f, "FEASIBLE"),
            OutcomeStatus::Fallback { reason } => write!(f, "FALLBACK({})", reason),
            OutcomeStatus::EmptyScope => write!(f, "EMPTY_SCOPE"),
        }
    }
}
