// ==========================================
// 门店库存调拨系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、表格数据结构
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod stock;
pub mod transfer;
pub mod types;
pub mod workbook;

// 重导出核心类型
pub use stock::{
    FieldChange, FieldValue, InventoryItem, ItemField, Shop, ShopStock, ShopStockExportRow,
};
pub use transfer::TransferRequest;
pub use types::{format_price_cents, parse_price_cents, Actor, Role, TransferState};
pub use workbook::{CellDefect, RawWorkbook, SheetData};
