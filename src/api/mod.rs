// ==========================================
// 门店库存调拨系统 - API 层
// ==========================================
// 职责: 对外入口,权限裁剪与错误分类
// 边界: HTTP 路由/认证/序列化由外层承接,此处只收角色解析结果
// ==========================================

pub mod error;
pub mod stock_api;
pub mod transfer_api;

pub use error::{ApiError, ApiResult};
pub use stock_api::StockApi;
pub use transfer_api::TransferApi;
