// ==========================================
// 门店库存调拨系统 - 引擎层
// ==========================================
// 职责: 对账、调拨工作流、导出的业务编排
// 红线: 每个公开操作一个事务,失败即整体回滚
// ==========================================

pub mod export;
pub mod reconcile;
pub mod transfer;

pub use export::{export_file_stem, write_sheet_csv, ExportBuilder, ExportScope};
pub use reconcile::{ReconcileEngine, ReconcilePolicy, ReconcileReport};
pub use transfer::{
    LogNotifier, SubmitOutcome, TransferEngine, TransferError, TransferNotifier, TransferResult,
};
