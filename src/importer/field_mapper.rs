// ==========================================
// Relay 调期排程 - 字段映射器实现
// ==========================================
// 职责: 源列 → RawRelayRecord 字段映射 + 类型转换 + 上游特征派生
// 派生规则:
// - 不可移动 = Cannot_Move 显式标记 或 Short_Desc 为季节性/DC 调整
// - 门店类型缺失 → Unknown
// - 调整组 NO_GROUP → 无组
// - 原始周缺失 → 取当前周
// ==========================================

use crate::domain::relay::{PendingRequest, RawRelayRecord, NO_GROUP, UNKNOWN_STORE_TYPE};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FieldMapper as FieldMapperTrait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// 视为不可移动的 relay 描述
const IMMOVABLE_SHORT_DESCS: [&str; 2] = ["Seasonal Relay", "DC Realignment"];

/// 支持的日期格式
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d", "%m/%d/%Y"];

/// 支持的日期时间格式（取日期部分）
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_to_raw_relay(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawRelayRecord> {
        // 主键
        let relay_id = self.require_string(row, "Relay_ID", row_number)?;
        let store_id = self.require_string(row, "Store_ID", row_number)?;

        // 排期周
        let current_week = self.parse_date(row, "WK_End_Date", row_number)?;
        let original_week = self
            .parse_date(row, "Original_WK_End_Date", row_number)?
            .or(current_week);

        // 不可移动派生
        let cannot_move = self.parse_bool(row, "Cannot_Move", row_number)?.unwrap_or(false);
        let short_desc_immovable = self
            .get_string(row, "Short_Desc")
            .map(|desc| {
                IMMOVABLE_SHORT_DESCS
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(&desc))
            })
            .unwrap_or(false);

        // 待处理请求（任一字段有值即视为存在）
        let request_type = self.get_string(row, "Request_Type");
        let requested_week = self.parse_date(row, "Requested_Move_WK", row_number)?;
        let request_status = self.get_string(row, "Status");
        let pending_request =
            if request_type.is_some() || requested_week.is_some() || request_status.is_some() {
                Some(PendingRequest {
                    request_type,
                    requested_week,
                    status: request_status,
                })
            } else {
                None
            };

        Ok(RawRelayRecord {
            relay_id,
            store_id,
            original_week,
            current_week,
            dept_category: self.get_string(row, "DeptCat"),
            store_type: self
                .get_string(row, "Store_Type")
                .unwrap_or_else(|| UNKNOWN_STORE_TYPE.to_string()),
            relay_hours: self.parse_f64(row, "Relay_Hours", row_number)?.unwrap_or(0.0),
            relay_change_perc: self.parse_f64(row, "Relay_Change_Perc", row_number)?,
            immovable: cannot_move || short_desc_immovable,
            adjacency_group: self
                .get_string(row, "Adjustment_Group_ID")
                .filter(|g| g != NO_GROUP),
            is_holiday: self.parse_bool(row, "Is_Holiday", row_number)?.unwrap_or(false),
            pending_request,
            row_number,
        })
    }
}

impl FieldMapper {
    /// 提取字符串字段（返回 Option），支持多个可能的列名（别名）
    fn get_string(&self, row: &HashMap<String, String>, key: &str) -> Option<String> {
        let aliases: &[&str] = match key {
            "Relay_ID" => &["Relay_ID", "RelayID", "relay_id"],
            "Store_ID" => &["Store_ID", "Store", "store_id"],
            "Original_WK_End_Date" => &["Original_WK_End_Date", "original_week"],
            "WK_End_Date" => &["WK_End_Date", "current_week"],
            "Relay_Hours" => &["Relay_Hours", "Total_Store_Hours", "hours"],
            "Store_Type" => &["Store_Type", "store_type"],
            "DeptCat" => &["DeptCat", "Dept_Category"],
            "Adjustment_Group_ID" => &["Adjustment_Group_ID", "adjacency_group"],
            _ => std::slice::from_ref(&key),
        };

        for alias in aliases {
            if let Some(v) = row.get(*alias) {
                let trimmed = v.trim();
                if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("nan") {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }

    fn require_string(
        &self,
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> ImportResult<String> {
        self.get_string(row, key)
            .ok_or_else(|| ImportError::RequiredFieldMissing {
                row: row_number,
                field: key.to_string(),
            })
    }

    /// 解析浮点数
    fn parse_f64(
        &self,
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> ImportResult<Option<f64>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ImportError::TypeConversionError {
                    row: row_number,
                    field: key.to_string(),
                    message: format!("无法解析为浮点数: {}", value),
                }),
        }
    }

    /// 解析布尔值（true/false, 1/0, yes/no, y/n）
    fn parse_bool(
        &self,
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> ImportResult<Option<bool>> {
        match self.get_string(row, key) {
            None => Ok(None),
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "t" | "1" | "1.0" | "yes" | "y" => Ok(Some(true)),
                "false" | "f" | "0" | "0.0" | "no" | "n" => Ok(Some(false)),
                _ => Err(ImportError::TypeConversionError {
                    row: row_number,
                    field: key.to_string(),
                    message: format!("无法解析为布尔值: {}", value),
                }),
            },
        }
    }

    /// 解析日期
    ///
    /// # 支持
    /// - YYYY-MM-DD / YYYYMMDD / YYYY/MM/DD / MM/DD/YYYY
    /// - 带时间部分的日期时间（取日期）
    /// - Excel 日期序列号（1899-12-30 起算）
    fn parse_date(
        &self,
        row: &HashMap<String, String>,
        key: &str,
        row_number: usize,
    ) -> ImportResult<Option<NaiveDate>> {
        let value = match self.get_string(row, key) {
            None => return Ok(None),
            Some(v) => v,
        };

        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(&value, fmt) {
                return Ok(Some(date));
            }
        }
        for fmt in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&value, fmt) {
                return Ok(Some(dt.date()));
            }
        }
        if let Some(date) = excel_serial_to_date(&value) {
            return Ok(Some(date));
        }

        Err(ImportError::DateFormatError {
            row: row_number,
            field: key.to_string(),
            value,
        })
    }
}

/// Excel 日期序列号 → 日期（仅接受 1954..2119 年区间的序列号）
fn excel_serial_to_date(value: &str) -> Option<NaiveDate> {
    let serial = value.parse::<f64>().ok()?;
    if !(20_000.0..=80_000.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}
