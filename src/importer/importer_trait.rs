// ==========================================
// Relay 调期排程 - 导入层 Trait 接口
// ==========================================
// 流程: 文件 → 行映射 (表头→值) → RawRelayRecord
// ==========================================

use crate::domain::relay::RawRelayRecord;
use crate::importer::error::ImportResult;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// FileParser - 文件解析器
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行（表头 → 单元格文本）
    ///
    /// # 约定
    /// - 表头与单元格均去除首尾空白
    /// - 完全空白的行被跳过
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// FieldMapper - 字段映射器
// ==========================================
pub trait FieldMapper: Send + Sync {
    /// 单行映射为 RawRelayRecord
    ///
    /// # 参数
    /// - row: 表头 → 单元格文本
    /// - row_number: 数据行号（从 1 开始，不含表头）
    fn map_to_raw_relay(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<RawRelayRecord>;
}
