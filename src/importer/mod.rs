// ==========================================
// 门店库存调拨系统 - 导入模块
// ==========================================
// 流水线: 文件解析 -> 规范形状解析(适配器回退) -> 数值规范化
// 落库由对账引擎负责,本模块不触数据库
// ==========================================

pub mod canonical;
pub mod error;
pub mod file_parser;
pub mod format_adapter;
pub mod normalizer;

pub use canonical::{resolve_canonical, CanonicalSheet, CanonicalWorkbook, ColumnMap};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, UniversalFileParser};
pub use format_adapter::{AdapterError, FormatAdapter, WideLayoutAdapter};
pub use normalizer::{normalize_price_cents, normalize_quantity};
