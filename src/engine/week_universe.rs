// ==========================================
// Relay 调期排程 - 候选周构建
// ==========================================
// 候选周 = 最早原始周所在周 ~ 今天 + N 周 之间的全部周末日期
//          再过滤掉早于回看边界的周
// 输出有序、去重；为空时由编排器走恒等降级
// 输入日期先对齐到所在周的周末日期，保证原始周落在候选周网格上
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::relay::{RawRelayRecord, RelayStoreInstance};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::{debug, info};

// ==========================================
// WeekUniverseBuilder - 候选周构建器
// ==========================================
pub struct WeekUniverseBuilder {
    future_buffer_weeks: u32,
    lookback_horizon_days: u32,
    week_ending_weekday: Weekday,
}

impl WeekUniverseBuilder {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            future_buffer_weeks: config.future_buffer_weeks,
            lookback_horizon_days: config.lookback_horizon_days,
            week_ending_weekday: config.week_ending_weekday,
        }
    }

    /// 回看边界 = 今天 - lookback_horizon_days（溢出时取最小日期）
    pub fn horizon(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_signed(Duration::days(i64::from(self.lookback_horizon_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// 候选周终点 = 今天 + future_buffer_weeks 周（溢出时取最大日期）
    pub fn end(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_signed(Duration::weeks(i64::from(self.future_buffer_weeks)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// 给定日期所在周的周末日期（当天即周末日时返回当天）
    pub fn week_ending_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        let target = i64::from(self.week_ending_weekday.num_days_from_monday());
        let current = i64::from(date.weekday().num_days_from_monday());
        date.checked_add_signed(Duration::days((target - current).rem_euclid(7)))
            .unwrap_or(date)
    }

    /// 记录中的周字段对齐到周末日期（原始周、当前周、请求目标周）
    pub fn align_record(&self, mut record: RawRelayRecord) -> RawRelayRecord {
        let align = |week: Option<NaiveDate>| week.map(|w| self.week_ending_on_or_after(w));
        record.original_week = align(record.original_week);
        record.current_week = align(record.current_week);
        if let Some(request) = record.pending_request.as_mut() {
            request.requested_week = align(request.requested_week);
        }
        record
    }

    /// 批量对齐
    ///
    /// # 返回
    /// (对齐后记录, 原始周或当前周被调整的记录数)
    pub fn align_records(&self, records: Vec<RawRelayRecord>) -> (Vec<RawRelayRecord>, usize) {
        let mut shifted = 0usize;
        let aligned: Vec<RawRelayRecord> = records
            .into_iter()
            .map(|record| {
                let before = (record.original_week, record.current_week);
                let record = self.align_record(record);
                if before != (record.original_week, record.current_week) {
                    shifted += 1;
                }
                record
            })
            .collect();

        if shifted > 0 {
            info!(
                shifted,
                week_ending = %self.week_ending_weekday,
                "周字段不在周末日，已对齐到所在周的周末日期"
            );
        }
        (aligned, shifted)
    }

    /// 构建候选周
    ///
    /// # 起点
    /// 实例最早原始周；全部缺失时取最早当前周；仍缺失时取今天
    pub fn build(&self, instances: &[RelayStoreInstance], today: NaiveDate) -> Vec<NaiveDate> {
        let earliest = instances
            .iter()
            .filter_map(|i| i.original_week())
            .min()
            .or_else(|| instances.iter().filter_map(|i| i.current_week).min())
            .unwrap_or(today);

        let end = self.end(today);
        let horizon = self.horizon(today);

        let mut weeks = Vec::new();
        let mut week = self.week_ending_on_or_after(earliest);
        while week <= end {
            if week >= horizon {
                weeks.push(week);
            }
            week = match week.checked_add_signed(Duration::weeks(1)) {
                Some(next) => next,
                None => break,
            };
        }

        debug!(
            earliest = %earliest,
            end = %end,
            horizon = %horizon,
            weeks_count = weeks.len(),
            "候选周构建完成"
        );
        weeks
    }
}
