// ==========================================
// 门店库存调拨系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 仓库-门店库存对账与调拨工作流
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Actor, Role, TransferState};

// 领域实体
pub use domain::{InventoryItem, Shop, ShopStock, TransferRequest};

// 引擎
pub use engine::{
    ExportBuilder, ExportScope, LogNotifier, ReconcileEngine, ReconcilePolicy, ReconcileReport,
    SubmitOutcome, TransferEngine, TransferError, TransferNotifier,
};

// 导入
pub use importer::{
    resolve_canonical, CanonicalWorkbook, FormatAdapter, ImportError, UniversalFileParser,
    WideLayoutAdapter,
};

// API
pub use api::{ApiError, ApiResult, StockApi, TransferApi};

// 配置
pub use config::ConfigManager;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "门店库存调拨系统";

// ==========================================
// 预编译检查
// ==========================================
