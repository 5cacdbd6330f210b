// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::NaiveDate;
use modular_balancing::config::OptimizerConfig;
use modular_balancing::domain::relay::{PendingRequest, RawRelayRecord};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ==========================================
// RawRelayRecord 构建器
// ==========================================

pub struct RelayRecordBuilder {
    record: RawRelayRecord,
}

impl RelayRecordBuilder {
    pub fn new(relay_id: &str, store_id: &str) -> Self {
        Self {
            record: RawRelayRecord::new(relay_id, store_id, None, 0.0),
        }
    }

    /// 原始周（当前周同步设置）
    pub fn week(mut self, week: NaiveDate) -> Self {
        self.record.original_week = Some(week);
        self.record.current_week = Some(week);
        self
    }

    pub fn current_week(mut self, week: NaiveDate) -> Self {
        self.record.current_week = Some(week);
        self
    }

    pub fn hours(mut self, hours: f64) -> Self {
        self.record.relay_hours = hours;
        self
    }

    pub fn store_type(mut self, store_type: &str) -> Self {
        self.record.store_type = store_type.to_string();
        self
    }

    pub fn dept(mut self, dept: &str) -> Self {
        self.record.dept_category = Some(dept.to_string());
        self
    }

    pub fn change_perc(mut self, perc: f64) -> Self {
        self.record.relay_change_perc = Some(perc);
        self
    }

    pub fn immovable(mut self) -> Self {
        self.record.immovable = true;
        self
    }

    pub fn group(mut self, group_id: &str) -> Self {
        self.record.adjacency_group = Some(group_id.to_string());
        self
    }

    pub fn holiday(mut self) -> Self {
        self.record.is_holiday = true;
        self
    }

    pub fn requested(mut self, request_type: &str, week: NaiveDate) -> Self {
        self.record.pending_request = Some(PendingRequest {
            request_type: Some(request_type.to_string()),
            requested_week: Some(week),
            status: Some("Pending".to_string()),
        });
        self
    }

    pub fn build(self) -> RawRelayRecord {
        self.record
    }
}

// ==========================================
// 批量数据
// ==========================================

/// 同一周内 count 条记录（不同 relay，同一门店）
pub fn create_week_batch(prefix: &str, week: NaiveDate, count: usize, hours: f64) -> Vec<RawRelayRecord> {
    (0..count)
        .map(|i| {
            RelayRecordBuilder::new(&format!("{}{:03}", prefix, i), "S001")
                .week(week)
                .hours(hours)
                .build()
        })
        .collect()
}

/// 小规模场景配置（总工时上限 500，节假日 400）
pub fn create_small_config() -> OptimizerConfig {
    OptimizerConfig {
        total_hours_threshold: 500.0,
        holiday_total_hours_threshold: 400.0,
        future_buffer_weeks: 12,
        solver_time_limit_seconds: 60,
        ..OptimizerConfig::default()
    }
}
