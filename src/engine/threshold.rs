// ==========================================
// Relay 调期排程 - 周产能阈值解析
// ==========================================
// 每周两条软上限:
// - 总工时上限（节假日周取节假日阈值）
// - 子池工时上限 = 门店平均目标 × 每周子池门店数上限
// 节假日判定: 输入记录标记了该周为节假日，或显式节假日日历包含该周
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::relay::RawRelayRecord;
use crate::domain::week::WeekCapacity;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

// ==========================================
// ThresholdResolver - 阈值解析器
// ==========================================
pub struct ThresholdResolver {
    total_hours_threshold: f64,
    holiday_total_hours_threshold: f64,
    subpool_hours_threshold: f64,
    holiday_subpool_hours_threshold: f64,
    holidays: BTreeSet<NaiveDate>,
}

impl ThresholdResolver {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            total_hours_threshold: config.total_hours_threshold,
            holiday_total_hours_threshold: config.holiday_total_hours_threshold,
            subpool_hours_threshold: config.subpool_hours_threshold(),
            holiday_subpool_hours_threshold: config.holiday_subpool_hours_threshold(),
            holidays: BTreeSet::new(),
        }
    }

    /// 追加显式节假日日历
    pub fn with_holidays<I>(mut self, weeks: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.holidays.extend(weeks);
        self
    }

    /// 从输入记录收集节假日周（记录标记其当前周为节假日）
    pub fn holidays_from_records(records: &[RawRelayRecord]) -> BTreeSet<NaiveDate> {
        records
            .iter()
            .filter(|r| r.is_holiday)
            .filter_map(|r| r.current_week.or(r.original_week))
            .collect()
    }

    pub fn is_holiday(&self, week: NaiveDate) -> bool {
        self.holidays.contains(&week)
    }

    /// 单周阈值
    pub fn capacity_for(&self, week: NaiveDate) -> WeekCapacity {
        let is_holiday = self.is_holiday(week);
        let (total, subpool) = if is_holiday {
            (self.holiday_total_hours_threshold, self.holiday_subpool_hours_threshold)
        } else {
            (self.total_hours_threshold, self.subpool_hours_threshold)
        };

        WeekCapacity {
            week,
            is_holiday,
            total_hours_threshold: total,
            subpool_hours_threshold: subpool,
        }
    }

    /// 候选周阈值（顺序与输入一致）
    pub fn resolve(&self, weeks: &[NaiveDate]) -> Vec<WeekCapacity> {
        let capacities: Vec<WeekCapacity> = weeks.iter().map(|&w| self.capacity_for(w)).collect();
        debug!(
            weeks_count = capacities.len(),
            holiday_weeks = capacities.iter().filter(|c| c.is_holiday).count(),
            "周阈值解析完成"
        );
        capacities
    }
}
