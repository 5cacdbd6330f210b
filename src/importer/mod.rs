// ==========================================
// Relay 调期排程 - 导入/导出层
// ==========================================
// 职责: 外部文件 → RawRelayRecord；建议排程 → CSV
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod exporter;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod relay_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use exporter::{write_assignments, write_assignments_csv};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use relay_importer::{import_relay_file, RelayImportReport, RelayImporter, RowRejection};

// 重导出 Trait 接口
pub use importer_trait::{FieldMapper, FileParser};
