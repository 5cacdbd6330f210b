// ==========================================
// Relay 调期排程 - 建议排程导出
// ==========================================
// 输出: 每个实例一行，原始周 / 建议周并列，便于比对
// ==========================================

use crate::domain::relay::{MISSING_WEEK_SENTINEL, NO_GROUP};
use crate::domain::schedule::SuggestedAssignment;
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use csv::Writer;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// 导出行
#[derive(Debug, Serialize)]
struct AssignmentRow<'a> {
    #[serde(rename = "Instance_ID")]
    instance_id: &'a str,
    #[serde(rename = "Relay_ID")]
    relay_id: &'a str,
    #[serde(rename = "Store_ID")]
    store_id: &'a str,
    #[serde(rename = "Original_WK_End_Date")]
    original_week: String,
    #[serde(rename = "Suggested_WK_End_Date")]
    suggested_week: String,
    #[serde(rename = "Moved")]
    moved: bool,
    #[serde(rename = "Relay_Hours")]
    hours: f64,
    #[serde(rename = "Store_Type")]
    store_type: &'a str,
    #[serde(rename = "DeptCat")]
    dept_category: &'a str,
    #[serde(rename = "Cannot_Move")]
    immovable: bool,
    #[serde(rename = "Adjustment_Group_ID")]
    adjacency_group: &'a str,
    #[serde(rename = "Request_Type")]
    request_type: &'a str,
    #[serde(rename = "Requested_Move_WK")]
    requested_week: String,
    #[serde(rename = "Status")]
    request_status: &'a str,
}

fn week_text(week: Option<NaiveDate>) -> String {
    week.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| MISSING_WEEK_SENTINEL.to_string())
}

impl<'a> From<&'a SuggestedAssignment> for AssignmentRow<'a> {
    fn from(a: &'a SuggestedAssignment) -> Self {
        let request = a.pending_request.as_ref();
        Self {
            instance_id: &a.instance_id,
            relay_id: &a.relay_id,
            store_id: &a.store_id,
            original_week: week_text(a.original_week),
            suggested_week: week_text(a.suggested_week),
            moved: a.is_moved(),
            hours: a.hours,
            store_type: &a.store_type,
            dept_category: a.dept_category.as_deref().unwrap_or(""),
            immovable: a.immovable,
            adjacency_group: a.adjacency_group.as_deref().unwrap_or(NO_GROUP),
            request_type: request.and_then(|r| r.request_type.as_deref()).unwrap_or(""),
            requested_week: request
                .and_then(|r| r.requested_week)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            request_status: request.and_then(|r| r.status.as_deref()).unwrap_or(""),
        }
    }
}

/// 写入任意 writer
pub fn write_assignments<W: Write>(writer: W, assignments: &[SuggestedAssignment]) -> ImportResult<usize> {
    let mut csv_writer = Writer::from_writer(writer);
    for assignment in assignments {
        csv_writer.serialize(AssignmentRow::from(assignment))?;
    }
    csv_writer
        .flush()
        .map_err(|e| ImportError::FileWriteError(e.to_string()))?;
    Ok(assignments.len())
}

/// 导出建议排程到 CSV 文件
///
/// # 返回
/// - Ok(usize): 写入的数据行数
pub fn write_assignments_csv(path: &Path, assignments: &[SuggestedAssignment]) -> ImportResult<usize> {
    let file = std::fs::File::create(path)
        .map_err(|e| ImportError::FileWriteError(format!("{}: {}", path.display(), e)))?;
    let rows = write_assignments(file, assignments)?;
    info!(path = %path.display(), rows, "建议排程已导出");
    Ok(rows)
}
