// ==========================================
// 门店库存调拨系统 - 配置模块
// ==========================================

pub mod config_manager;

pub use config_manager::ConfigManager;
