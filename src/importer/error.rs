// ==========================================
// 门店库存调拨系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::workbook::CellDefect;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 规范形状错误 =====
    #[error("工作簿缺少规范工作表: 未找到 \"{warehouse}\" 或 \"{shop}\"")]
    MissingCanonicalSheets { warehouse: String, shop: String },

    #[error("工作表 {sheet} 缺少必需列: {column}")]
    MissingColumn { sheet: String, column: String },

    // 适配器的原始消息必须原样透传
    #[error("格式适配器 {adapter} 转换失败: {message}")]
    AdapterFailed { adapter: String, message: String },

    // ===== 数值缺陷 =====
    // 任一缺陷即拒绝整次上传,缺陷清单随错误返回
    #[error("数值缺陷 {} 处,上传整体拒绝", .0.len())]
    NumericDefects(Vec<CellDefect>),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<RepositoryError>: 对账落库阶段的持久化失败
impl From<crate::repository::error::RepositoryError> for ImportError {
    fn from(err: crate::repository::error::RepositoryError) -> Self {
        ImportError::InternalError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
