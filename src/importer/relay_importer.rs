// ==========================================
// Relay 调期排程 - Relay 记录导入器
// ==========================================
// 职责: 整合导入流程，从文件到 RawRelayRecord 列表
// 流程: 解析 → 映射（单行错误记录后跳过，不阻断整批）
// ==========================================

use crate::domain::relay::RawRelayRecord;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper as RelayFieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{FieldMapper, FileParser};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RowRejection - 被拒绝的数据行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub row_number: usize,
    pub reason: String,
}

// ==========================================
// RelayImportReport - 导入结果
// ==========================================
#[derive(Debug, Clone)]
pub struct RelayImportReport {
    pub batch_id: String,
    pub total_rows: usize,
    pub records: Vec<RawRelayRecord>,
    pub rejected: Vec<RowRejection>,
    pub elapsed_ms: u64,
}

impl RelayImportReport {
    pub fn accepted_count(&self) -> usize {
        self.records.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

// ==========================================
// RelayImporter - 导入器
// ==========================================
pub struct RelayImporter {
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
}

impl Default for RelayImporter {
    fn default() -> Self {
        Self::new(Box::new(UniversalFileParser), Box::new(RelayFieldMapper))
    }
}

impl RelayImporter {
    /// 创建导入器
    ///
    /// # 参数
    /// - file_parser: 文件解析器
    /// - field_mapper: 字段映射器
    pub fn new(file_parser: Box<dyn FileParser>, field_mapper: Box<dyn FieldMapper>) -> Self {
        Self {
            file_parser,
            field_mapper,
        }
    }

    /// 从文件导入 relay 记录
    ///
    /// # 返回
    /// - Ok(RelayImportReport): 成功映射的记录 + 被拒绝行
    /// - Err: 文件级错误（不存在/格式不支持/解析失败）
    #[instrument(skip(self, file_path), fields(batch_id = tracing::field::Empty))]
    pub fn import_file(&self, file_path: &Path) -> ImportResult<RelayImportReport> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("batch_id", batch_id.as_str());
        info!(file_path = %file_path.display(), "开始导入 relay 数据");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let raw_rows = self.file_parser.parse_to_raw_records(file_path)?;
        let total_rows = raw_rows.len();
        info!(total_rows, "文件解析完成");

        // === 步骤 2: 字段映射 ===
        debug!("步骤 2: 字段映射");
        let (records, rejected) = self.map_rows(&raw_rows)?;

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            success = records.len(),
            failed = rejected.len(),
            elapsed_ms,
            "relay 数据导入完成"
        );

        Ok(RelayImportReport {
            batch_id,
            total_rows,
            records,
            rejected,
            elapsed_ms,
        })
    }

    /// 批量映射；行级错误记录为拒绝行，其它错误向上传播
    pub fn map_rows(
        &self,
        rows: &[HashMap<String, String>],
    ) -> ImportResult<(Vec<RawRelayRecord>, Vec<RowRejection>)> {
        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 1;
            match self.field_mapper.map_to_raw_relay(row, row_number) {
                Ok(record) => records.push(record),
                Err(e) if e.is_row_error() => {
                    warn!(row_number, error = %e, "字段映射失败，跳过该行");
                    rejected.push(RowRejection {
                        row_number,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok((records, rejected))
    }
}

/// 便捷入口：默认解析器 + 默认映射器
pub fn import_relay_file(file_path: &Path) -> ImportResult<RelayImportReport> {
    RelayImporter::default().import_file(file_path)
}
