// ==========================================
// Relay 调期排程 - 移动影响报表引擎
// ==========================================
// 职责: 原始排程 vs 建议排程 的差异摘要
// 输入: 建议排程（每实例一行） + 周阈值
// 输出: 移动量、按部门移动量、逐周前后负载、待处理请求关联
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::relay::UNKNOWN_STORE_TYPE;
use crate::domain::schedule::SuggestedAssignment;
use crate::domain::week::{CapacityConstraint, WeekLoad};
use crate::engine::threshold::ThresholdResolver;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// 报表结构
// ==========================================

/// 单部门移动量
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepartmentMoves {
    pub moved_count: usize,
    pub moved_hours: f64,
}

/// 单周前后对比
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekComparison {
    pub week: NaiveDate,
    pub before: WeekLoad,
    pub after: WeekLoad,
}

impl WeekComparison {
    pub fn over_before(&self) -> bool {
        self.before.is_overflow()
    }

    pub fn over_after(&self) -> bool {
        self.after.is_overflow()
    }
}

/// 待处理请求关联
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PendingRequestSummary {
    pub with_request: usize,          // 携带请求的实例
    pub with_target_week: usize,      // 请求带目标周
    pub landed_on_requested: usize,   // 建议周 = 请求目标周
    pub moved_without_request: usize, // 无请求但被移动
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveReport {
    pub total_instances: usize,
    pub moved_count: usize,
    pub moved_hours: f64,
    pub moves_by_department: BTreeMap<String, DepartmentMoves>,
    pub weekly: Vec<WeekComparison>,
    pub pending: PendingRequestSummary,
}

impl MoveReport {
    pub fn weeks_over_before(&self) -> usize {
        self.weekly.iter().filter(|w| w.over_before()).count()
    }

    pub fn weeks_over_after(&self) -> usize {
        self.weekly.iter().filter(|w| w.over_after()).count()
    }
}

impl fmt::Display for MoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "实例 {} 个，移动 {} 个（{:.1} 小时）",
            self.total_instances, self.moved_count, self.moved_hours
        )?;
        writeln!(
            f,
            "超阈值周: 调整前 {} 周，调整后 {} 周",
            self.weeks_over_before(),
            self.weeks_over_after()
        )?;
        for (dept, moves) in &self.moves_by_department {
            writeln!(f, "  {}: {} 个 / {:.1} 小时", dept, moves.moved_count, moves.moved_hours)?;
        }
        write!(
            f,
            "待处理请求: {} 个（带目标周 {}，落在目标周 {}）",
            self.pending.with_request, self.pending.with_target_week, self.pending.landed_on_requested
        )
    }
}

// ==========================================
// MoveReportEngine - 报表引擎
// ==========================================
// 无状态引擎，所有方法都是纯函数
pub struct MoveReportEngine<'a> {
    config: &'a OptimizerConfig,
    resolver: &'a ThresholdResolver,
}

impl<'a> MoveReportEngine<'a> {
    pub fn new(config: &'a OptimizerConfig, resolver: &'a ThresholdResolver) -> Self {
        Self { config, resolver }
    }

    /// 生成报表
    pub fn generate(&self, assignments: &[SuggestedAssignment]) -> MoveReport {
        let moved: Vec<&SuggestedAssignment> = assignments.iter().filter(|a| a.is_moved()).collect();

        MoveReport {
            total_instances: assignments.len(),
            moved_count: moved.len(),
            moved_hours: moved.iter().map(|a| a.hours).sum(),
            moves_by_department: self.moves_by_department(&moved),
            weekly: self.weekly_comparison(assignments),
            pending: self.pending_summary(assignments),
        }
    }

    fn moves_by_department(&self, moved: &[&SuggestedAssignment]) -> BTreeMap<String, DepartmentMoves> {
        let mut by_dept: BTreeMap<String, DepartmentMoves> = BTreeMap::new();
        for a in moved {
            let dept = a
                .dept_category
                .clone()
                .unwrap_or_else(|| UNKNOWN_STORE_TYPE.to_string());
            let entry = by_dept.entry(dept).or_default();
            entry.moved_count += 1;
            entry.moved_hours += a.hours;
        }
        by_dept
    }

    fn weekly_comparison(&self, assignments: &[SuggestedAssignment]) -> Vec<WeekComparison> {
        let mut weeks: BTreeMap<NaiveDate, WeekComparison> = BTreeMap::new();

        let mut add = |week: NaiveDate, a: &SuggestedAssignment, after: bool| {
            let entry = weeks.entry(week).or_insert_with(|| {
                let capacity = self.resolver.capacity_for(week);
                WeekComparison {
                    week,
                    before: WeekLoad::empty(capacity.clone()),
                    after: WeekLoad::empty(capacity),
                }
            });
            let load = if after { &mut entry.after } else { &mut entry.before };
            load.total_hours += a.hours;
            load.instance_count += 1;
            if self.config.is_subpool_store_type(&a.store_type) {
                load.subpool_hours += a.hours;
            }
        };

        for a in assignments {
            if let Some(week) = a.original_week {
                add(week, a, false);
            }
            if let Some(week) = a.suggested_week {
                add(week, a, true);
            }
        }

        weeks.into_values().collect()
    }

    fn pending_summary(&self, assignments: &[SuggestedAssignment]) -> PendingRequestSummary {
        let mut summary = PendingRequestSummary::default();
        for a in assignments {
            match &a.pending_request {
                Some(request) => {
                    summary.with_request += 1;
                    if let Some(target) = request.requested_week {
                        summary.with_target_week += 1;
                        if a.suggested_week == Some(target) {
                            summary.landed_on_requested += 1;
                        }
                    }
                }
                None if a.is_moved() => summary.moved_without_request += 1,
                None => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relay::{InstanceKey, PendingRequest, RawRelayRecord, RelayStoreInstance};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn create_test_assignment(
        relay: &str,
        original: NaiveDate,
        suggested: NaiveDate,
        hours: f64,
        dept: &str,
    ) -> SuggestedAssignment {
        let mut record = RawRelayRecord::new(relay, "S1", Some(original), hours);
        record.dept_category = Some(dept.to_string());
        let instance =
            RelayStoreInstance::from_record(InstanceKey::from_parts(relay, "S1", Some(original)), record);
        SuggestedAssignment::from_instance(&instance, Some(suggested))
    }

    #[test]
    fn test_generate_report() {
        let config = OptimizerConfig {
            total_hours_threshold: 15.0,
            holiday_total_hours_threshold: 10.0,
            ..OptimizerConfig::default()
        };
        let resolver = ThresholdResolver::new(&config);
        let w1 = d(2026, 1, 4);
        let w2 = d(2026, 1, 11);

        let mut with_request = create_test_assignment("R3", w1, w2, 5.0, "Grocery");
        with_request.pending_request = Some(PendingRequest {
            request_type: Some("MRA".to_string()),
            requested_week: Some(w2),
            status: Some("Pending".to_string()),
        });
        let assignments = vec![
            create_test_assignment("R1", w1, w1, 10.0, "Grocery"),
            create_test_assignment("R2", w1, w2, 8.0, "Apparel"),
            with_request,
        ];

        let report = MoveReportEngine::new(&config, &resolver).generate(&assignments);

        assert_eq!(report.total_instances, 3);
        assert_eq!(report.moved_count, 2);
        assert_eq!(report.moved_hours, 13.0);
        assert_eq!(report.moves_by_department["Apparel"].moved_count, 1);
        assert_eq!(report.moves_by_department["Grocery"].moved_hours, 5.0);

        assert_eq!(report.weekly.len(), 2);
        assert_eq!(report.weekly[0].before.total_hours, 23.0);
        assert_eq!(report.weekly[0].after.total_hours, 10.0);
        assert_eq!(report.weekly[1].after.total_hours, 13.0);
        assert_eq!(report.weeks_over_before(), 1);
        assert_eq!(report.weeks_over_after(), 0);

        assert_eq!(report.pending.with_request, 1);
        assert_eq!(report.pending.landed_on_requested, 1);
        assert_eq!(report.pending.moved_without_request, 1);
        assert!(report.to_string().contains("移动 2 个"));
    }
}
