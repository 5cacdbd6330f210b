// ==========================================
// Relay 调期排程 - 优化器配置
// ==========================================
// 职责: 优化器全部命名参数 + 默认值 + 校验
// 默认值与上游业务约定保持一致（阈值/惩罚需业务确认后调整）
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::types::ImmovableMode;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 候选周延伸上限（周）
pub const MAX_FUTURE_BUFFER_WEEKS: u32 = 520;

/// 回看边界上限（天）
pub const MAX_LOOKBACK_HORIZON_DAYS: u32 = 3_660;

// ==========================================
// 配置键（config_kv.key）
// ==========================================
pub mod config_keys {
    // 候选周范围
    pub const FUTURE_BUFFER_WEEKS: &str = "future_buffer_weeks";
    pub const LOOKBACK_HORIZON_DAYS: &str = "lookback_horizon_days";
    pub const WEEK_ENDING_WEEKDAY: &str = "week_ending_weekday";

    // 总工时上限
    pub const TOTAL_HOURS_THRESHOLD: &str = "total_hours_threshold";
    pub const HOLIDAY_TOTAL_HOURS_THRESHOLD: &str = "holiday_total_hours_threshold";

    // 子池工时上限
    pub const SUBPOOL_AVG_HOURS_THRESHOLD: &str = "subpool_avg_hours_threshold";
    pub const HOLIDAY_SUBPOOL_AVG_HOURS_THRESHOLD: &str = "holiday_subpool_avg_hours_threshold";
    pub const MAX_SUBPOOL_STORES_PER_WEEK: &str = "max_subpool_stores_per_week";
    pub const SUBPOOL_STORE_TYPES: &str = "subpool_store_types"; // JSON 数组

    // 目标函数系数
    pub const MOVE_COST_PER_INSTANCE: &str = "move_cost_per_instance";
    pub const TOTAL_OVERAGE_PENALTY_WEIGHT: &str = "total_overage_penalty_weight";
    pub const SUBPOOL_OVERAGE_PENALTY_WEIGHT: &str = "subpool_overage_penalty_weight";

    // 不可移动规则
    pub const IMMOVABLE_MODE: &str = "immovable_mode";
    pub const IMMOVABLE_MOVE_COST: &str = "immovable_move_cost";

    // 资源上限
    pub const SOLVER_TIME_LIMIT_SECONDS: &str = "solver_time_limit_seconds";
    pub const ADJACENCY_GROUP_CAP: &str = "adjacency_group_cap";
}

// ==========================================
// OptimizerConfig - 优化器参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    // ===== 候选周范围 =====
    pub future_buffer_weeks: u32,        // 候选周延伸到今天之后的周数
    pub lookback_horizon_days: u32,      // 最早可排周 = 今天 - N 天
    pub week_ending_weekday: Weekday,    // 周末日（周末日期所在星期）

    // ===== 总工时上限 =====
    pub total_hours_threshold: f64,
    pub holiday_total_hours_threshold: f64,

    // ===== 子池工时上限 =====
    pub subpool_avg_hours_threshold: f64,
    pub holiday_subpool_avg_hours_threshold: f64,
    pub max_subpool_stores_per_week: u32,
    pub subpool_store_types: Vec<String>,

    // ===== 目标函数系数 =====
    pub move_cost_per_instance: f64,
    pub total_overage_penalty_weight: f64,
    pub subpool_overage_penalty_weight: f64,

    // ===== 不可移动规则 =====
    pub immovable_mode: ImmovableMode,
    pub immovable_move_cost: f64,        // Soft 模式下不可移动实例的移动成本

    // ===== 资源上限 =====
    pub solver_time_limit_seconds: u64,
    pub adjacency_group_cap: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            future_buffer_weeks: 12,
            lookback_horizon_days: 365,
            week_ending_weekday: Weekday::Sun,
            total_hours_threshold: 500_000.0,
            holiday_total_hours_threshold: 450_000.0,
            subpool_avg_hours_threshold: 40.0,
            holiday_subpool_avg_hours_threshold: 35.0,
            max_subpool_stores_per_week: 20,
            subpool_store_types: vec!["Neighborhood Market".to_string()],
            move_cost_per_instance: 1.0,
            total_overage_penalty_weight: 1000.0,
            subpool_overage_penalty_weight: 500.0,
            immovable_mode: ImmovableMode::Soft,
            immovable_move_cost: 1.0,
            solver_time_limit_seconds: 300,
            adjacency_group_cap: 10,
        }
    }
}

impl OptimizerConfig {
    /// 子池工时上限（常规周）= 门店平均目标 × 门店数
    pub fn subpool_hours_threshold(&self) -> f64 {
        self.subpool_avg_hours_threshold * f64::from(self.max_subpool_stores_per_week)
    }

    /// 子池工时上限（节假日周）
    pub fn holiday_subpool_hours_threshold(&self) -> f64 {
        self.holiday_subpool_avg_hours_threshold * f64::from(self.max_subpool_stores_per_week)
    }

    /// 求解时间上限
    pub fn solver_time_limit(&self) -> Duration {
        Duration::from_secs(self.solver_time_limit_seconds)
    }

    /// 门店类型是否属于子池
    pub fn is_subpool_store_type(&self, store_type: &str) -> bool {
        let store_type = store_type.trim();
        self.subpool_store_types
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(store_type))
    }

    /// 校验参数
    ///
    /// # 规则
    /// - 阈值/系数必须为有限非负数，惩罚权重必须为正
    /// - 节假日阈值必须严格低于常规阈值
    /// - 候选周延伸与回看边界有上限
    /// - 求解时间上限必须为正
    pub fn validate(&self) -> ConfigResult<()> {
        use config_keys::*;

        let non_negative = [
            (TOTAL_HOURS_THRESHOLD, self.total_hours_threshold),
            (HOLIDAY_TOTAL_HOURS_THRESHOLD, self.holiday_total_hours_threshold),
            (SUBPOOL_AVG_HOURS_THRESHOLD, self.subpool_avg_hours_threshold),
            (HOLIDAY_SUBPOOL_AVG_HOURS_THRESHOLD, self.holiday_subpool_avg_hours_threshold),
            (MOVE_COST_PER_INSTANCE, self.move_cost_per_instance),
            (IMMOVABLE_MOVE_COST, self.immovable_move_cost),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, format!("必须为有限非负数，实际 {}", value)));
            }
        }

        let positive = [
            (TOTAL_OVERAGE_PENALTY_WEIGHT, self.total_overage_penalty_weight),
            (SUBPOOL_OVERAGE_PENALTY_WEIGHT, self.subpool_overage_penalty_weight),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(key, format!("必须为正数，实际 {}", value)));
            }
        }

        if self.holiday_total_hours_threshold >= self.total_hours_threshold {
            return Err(invalid(
                HOLIDAY_TOTAL_HOURS_THRESHOLD,
                format!(
                    "节假日阈值 {} 必须低于常规阈值 {}",
                    self.holiday_total_hours_threshold, self.total_hours_threshold
                ),
            ));
        }
        if self.holiday_subpool_avg_hours_threshold >= self.subpool_avg_hours_threshold {
            return Err(invalid(
                HOLIDAY_SUBPOOL_AVG_HOURS_THRESHOLD,
                format!(
                    "节假日阈值 {} 必须低于常规阈值 {}",
                    self.holiday_subpool_avg_hours_threshold, self.subpool_avg_hours_threshold
                ),
            ));
        }

        if self.future_buffer_weeks > MAX_FUTURE_BUFFER_WEEKS {
            return Err(invalid(
                FUTURE_BUFFER_WEEKS,
                format!("不能超过 {}，实际 {}", MAX_FUTURE_BUFFER_WEEKS, self.future_buffer_weeks),
            ));
        }
        if self.lookback_horizon_days > MAX_LOOKBACK_HORIZON_DAYS {
            return Err(invalid(
                LOOKBACK_HORIZON_DAYS,
                format!("不能超过 {}，实际 {}", MAX_LOOKBACK_HORIZON_DAYS, self.lookback_horizon_days),
            ));
        }

        if self.solver_time_limit_seconds == 0 {
            return Err(invalid(SOLVER_TIME_LIMIT_SECONDS, "必须大于 0".to_string()));
        }

        Ok(())
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message,
    }
}
