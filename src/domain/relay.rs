// ==========================================
// Relay 调期排程 - Relay 门店实例领域模型
// ==========================================
// 原始记录 (RawRelayRecord) → 归一化实例 (RelayStoreInstance)
// 实例身份: (relay, store, 原始周) 复合键，归一化后必须唯一
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 原始周缺失时的占位符
pub const MISSING_WEEK_SENTINEL: &str = "NA";

/// 无调整组占位符（上游数据约定）
pub const NO_GROUP: &str = "NO_GROUP";

/// 门店类型缺失时的默认值
pub const UNKNOWN_STORE_TYPE: &str = "Unknown";

// ==========================================
// PendingRequest - 待处理变更请求
// ==========================================
// 仅用于事后报表关联，不参与求解
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_type: Option<String>,       // 请求类型 (BRA/MRA)
    pub requested_week: Option<NaiveDate>,  // 请求目标周
    pub status: Option<String>,             // 请求状态 (Pending/Approved/...)
}

// ==========================================
// RawRelayRecord - 上游特征层输出的原始记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelayRecord {
    // ===== 身份 =====
    pub relay_id: String,
    pub store_id: String,
    pub original_week: Option<NaiveDate>, // 原始排期周（周末日期）

    // ===== 属性 =====
    pub current_week: Option<NaiveDate>,  // 当前排期周
    pub dept_category: Option<String>,    // 部门品类
    pub store_type: String,               // 门店类型（子池判定）
    pub relay_hours: f64,                 // 执行所需工时
    pub relay_change_perc: Option<f64>,   // 变更幅度
    pub immovable: bool,                  // 季节性/DC 调整，不可移动
    pub adjacency_group: Option<String>,  // 调整组（None = 无组）
    pub is_holiday: bool,                 // 当前周是否节假日周

    // ===== 外部请求 =====
    pub pending_request: Option<PendingRequest>,

    // ===== 元信息 =====
    pub row_number: usize,
}

impl RawRelayRecord {
    /// 创建仅含必填字段的记录，其余字段取默认值
    pub fn new(relay_id: &str, store_id: &str, original_week: Option<NaiveDate>, hours: f64) -> Self {
        Self {
            relay_id: relay_id.to_string(),
            store_id: store_id.to_string(),
            original_week,
            current_week: original_week,
            dept_category: None,
            store_type: UNKNOWN_STORE_TYPE.to_string(),
            relay_hours: hours,
            relay_change_perc: None,
            immovable: false,
            adjacency_group: None,
            is_holiday: false,
            pending_request: None,
            row_number: 0,
        }
    }

    /// 请求目标周（排序偏好用）
    pub fn requested_week(&self) -> Option<NaiveDate> {
        self.pending_request.as_ref().and_then(|r| r.requested_week)
    }
}

// ==========================================
// InstanceKey - 实例复合键
// ==========================================
// ordinal > 0 表示归一化阶段追加的确定性序号后缀
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub relay_id: String,
    pub store_id: String,
    pub original_week: Option<NaiveDate>,
    pub ordinal: u32,
}

impl InstanceKey {
    /// 由原始字段构造（去除首尾空白）
    pub fn from_parts(relay_id: &str, store_id: &str, original_week: Option<NaiveDate>) -> Self {
        Self {
            relay_id: relay_id.trim().to_string(),
            store_id: store_id.trim().to_string(),
            original_week,
            ordinal: 0,
        }
    }

    /// 追加序号后缀
    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let week = self
            .original_week
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| MISSING_WEEK_SENTINEL.to_string());
        write!(f, "{}_{}_{}", self.relay_id, self.store_id, week)?;
        if self.ordinal > 0 {
            write!(f, "_{}", self.ordinal)?;
        }
        Ok(())
    }
}

// ==========================================
// RelayStoreInstance - 可调度最小单元
// ==========================================
// 生命周期: 每次优化由快照创建，求解期间只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayStoreInstance {
    pub key: InstanceKey,
    pub current_week: Option<NaiveDate>,
    pub dept_category: Option<String>,
    pub store_type: String,
    pub hours: f64,
    pub relay_change_perc: Option<f64>,
    pub immovable: bool,
    pub adjacency_group: Option<String>,
    pub pending_request: Option<PendingRequest>,
}

impl RelayStoreInstance {
    pub fn relay_id(&self) -> &str {
        &self.key.relay_id
    }

    pub fn store_id(&self) -> &str {
        &self.key.store_id
    }

    pub fn original_week(&self) -> Option<NaiveDate> {
        self.key.original_week
    }

    /// 由原始记录与已确定的键构造实例
    pub fn from_record(key: InstanceKey, record: RawRelayRecord) -> Self {
        let adjacency_group = record
            .adjacency_group
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty() && g != NO_GROUP);

        Self {
            key,
            current_week: record.current_week,
            dept_category: record.dept_category,
            store_type: record.store_type.trim().to_string(),
            hours: if record.relay_hours.is_finite() { record.relay_hours.max(0.0) } else { 0.0 },
            relay_change_perc: record.relay_change_perc,
            immovable: record.immovable,
            adjacency_group,
            pending_request: record.pending_request,
        }
    }
}
