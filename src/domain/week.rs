// ==========================================
// Relay 调期排程 - 周产能领域模型
// ==========================================
// 每个候选周带两条软上限：总工时上限、子池工时上限
// 红线: 上限为软约束，超出部分以松弛变量计量并惩罚
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// WeekCapacity - 单周产能阈值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekCapacity {
    pub week: NaiveDate,               // 周末日期
    pub is_holiday: bool,              // 节假日周
    pub total_hours_threshold: f64,    // 总工时上限
    pub subpool_hours_threshold: f64,  // 子池工时上限（门店平均目标 × 门店数）
}

// ==========================================
// WeekLoad - 单周负载（报表/校验使用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekLoad {
    pub capacity: WeekCapacity,
    pub total_hours: f64,
    pub subpool_hours: f64,
    pub instance_count: usize,
}

impl WeekLoad {
    pub fn empty(capacity: WeekCapacity) -> Self {
        Self {
            capacity,
            total_hours: 0.0,
            subpool_hours: 0.0,
            instance_count: 0,
        }
    }
}

// ==========================================
// Trait: CapacityConstraint
// ==========================================
// 用途: 周负载相对上限的超额计算
pub trait CapacityConstraint {
    /// 总工时超额（小时）
    fn total_overage_h(&self) -> f64;

    /// 子池工时超额（小时）
    fn subpool_overage_h(&self) -> f64;

    /// 是否任一上限被突破
    fn is_overflow(&self) -> bool {
        self.total_overage_h() > 0.0 || self.subpool_overage_h() > 0.0
    }

    /// 总工时超额比例，相对于总工时上限
    fn overflow_ratio(&self) -> f64;
}

impl CapacityConstraint for WeekLoad {
    fn total_overage_h(&self) -> f64 {
        (self.total_hours - self.capacity.total_hours_threshold).max(0.0)
    }

    fn subpool_overage_h(&self) -> f64 {
        (self.subpool_hours - self.capacity.subpool_hours_threshold).max(0.0)
    }

    fn overflow_ratio(&self) -> f64 {
        if self.capacity.total_hours_threshold <= 0.0 {
            return 0.0;
        }
        self.total_overage_h() / self.capacity.total_hours_threshold
    }
}

// ==========================================
// WeekSlack - 求解后各周松弛量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSlack {
    pub week: NaiveDate,
    pub total_slack_h: f64,
    pub subpool_slack_h: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_load(total: f64, subpool: f64) -> WeekLoad {
        WeekLoad {
            capacity: WeekCapacity {
                week: NaiveDate::from_ymd_opt(2026, 1, 4).unwrap(),
                is_holiday: false,
                total_hours_threshold: 500.0,
                subpool_hours_threshold: 800.0,
            },
            total_hours: total,
            subpool_hours: subpool,
            instance_count: 0,
        }
    }

    #[test]
    fn test_overage_calculation() {
        let load = create_test_load(600.0, 100.0);
        assert_eq!(load.total_overage_h(), 100.0);
        assert_eq!(load.subpool_overage_h(), 0.0);
        assert!(load.is_overflow());
        assert!((load.overflow_ratio() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_within_capacity() {
        let load = create_test_load(500.0, 800.0);
        assert!(!load.is_overflow());
        assert_eq!(load.overflow_ratio(), 0.0);
    }
}
