// ==========================================
// 门店库存调拨系统 - API 层错误类型
// ==========================================
// 职责: 引擎/仓储错误 -> 面向调用方的错误分类
// 红线: 内部失败原因只记日志,不向非库管调用方透出
// ==========================================

use crate::domain::workbook::CellDefect;
use crate::engine::transfer::TransferError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 错误分类
#[derive(Error, Debug)]
pub enum ApiError {
    // 上传形状/参数不合法,未发生任何写入
    #[error("校验失败: {0}")]
    Validation(String),

    // 数值缺陷清单随错误返回,供上传方定位
    #[error("校验失败: {summary}")]
    NumericDefects {
        summary: String,
        defects: Vec<CellDefect>,
    },

    #[error("资源不存在: {0}")]
    NotFound(String),

    // 业务冲突(库存不足/锁定),操作被拒绝且无部分变更
    #[error("操作冲突: {0}")]
    Conflict(String),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("内部错误,请联系管理员")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::NumericDefects(defects) => ApiError::NumericDefects {
                summary: format!("数值缺陷 {} 处,上传整体拒绝", defects.len()),
                defects,
            },
            ImportError::FileNotFound(_)
            | ImportError::UnsupportedFormat(_)
            | ImportError::ExcelParseError(_)
            | ImportError::CsvParseError(_)
            | ImportError::MissingCanonicalSheets { .. }
            | ImportError::MissingColumn { .. }
            | ImportError::AdapterFailed { .. } => ApiError::Validation(err.to_string()),
            ImportError::FileReadError(_)
            | ImportError::InternalError(_)
            | ImportError::Other(_) => {
                tracing::error!("上传内部错误: {}", err);
                ApiError::Internal
            }
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::MaintenanceLocked
            | TransferError::InsufficientStock { .. }
            | TransferError::LockedByOrder { .. } => ApiError::Conflict(err.to_string()),
            TransferError::InvalidQuantity(_) => ApiError::Validation(err.to_string()),
            TransferError::ItemNotFound(_)
            | TransferError::ShopNotFound(_)
            | TransferError::RequestNotFound { .. } => ApiError::NotFound(err.to_string()),
            TransferError::PermissionDenied => ApiError::PermissionDenied(err.to_string()),
            TransferError::Repository(inner) => {
                tracing::error!("调拨内部错误: {}", inner);
                ApiError::Internal
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RepositoryError::ValidationError(_) => ApiError::Validation(err.to_string()),
            RepositoryError::UniqueConstraintViolation(_)
            | RepositoryError::ForeignKeyViolation(_)
            | RepositoryError::CheckConstraintViolation(_)
            | RepositoryError::BusinessRuleViolation(_) => ApiError::Conflict(err.to_string()),
            other => {
                tracing::error!("仓储内部错误: {}", other);
                ApiError::Internal
            }
        }
    }
}
