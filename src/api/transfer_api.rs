// ==========================================
// 门店库存调拨系统 - 调拨 API
// ==========================================
// 职责: 调拨工作流的对外入口,叠加归属校验
// 权限: 门店角色只能操作本店;确认/改量仅限库管;
//       取消对库管或归属门店开放(绕过维护锁)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::transfer::TransferRequest;
use crate::domain::types::Actor;
use crate::engine::transfer::{SubmitOutcome, TransferEngine};

pub struct TransferApi {
    engine: TransferEngine,
}

impl TransferApi {
    pub fn new(engine: TransferEngine) -> Self {
        Self { engine }
    }

    /// 门店归属校验: 门店角色只能以本店名义操作
    fn require_shop_access(actor: &Actor, shop_name: &str) -> ApiResult<()> {
        if actor.is_manager() || actor.name == shop_name {
            return Ok(());
        }
        Err(ApiError::PermissionDenied(format!(
            "门店 {} 无权操作 {}",
            actor.name, shop_name
        )))
    }

    /// 发起/覆写调拨草稿
    pub fn request_transfer(
        &self,
        shop_name: &str,
        sku: &str,
        quantity: i64,
        actor: &Actor,
    ) -> ApiResult<TransferRequest> {
        Self::require_shop_access(actor, shop_name)?;
        Ok(self
            .engine
            .request_transfer(shop_name, sku, quantity, actor)?)
    }

    /// 批量提交本店草稿
    pub fn submit_outstanding(&self, shop_name: &str, actor: &Actor) -> ApiResult<SubmitOutcome> {
        Self::require_shop_access(actor, shop_name)?;
        Ok(self.engine.submit_outstanding(shop_name, actor)?)
    }

    /// 确认调拨 (仅限库管,引擎内校验)
    pub fn complete_transfer(
        &self,
        shop_name: &str,
        sku: &str,
        quantity: i64,
        actor: &Actor,
    ) -> ApiResult<()> {
        Ok(self
            .engine
            .complete_transfer(shop_name, sku, quantity, actor)?)
    }

    /// 取消调拨 (库管或归属门店,绕过维护锁)
    pub fn cancel_transfer(&self, shop_name: &str, sku: &str, actor: &Actor) -> ApiResult<()> {
        Self::require_shop_access(actor, shop_name)?;
        Ok(self.engine.cancel_transfer(shop_name, sku)?)
    }

    /// 库管改量
    pub fn update_request_quantity(
        &self,
        shop_name: &str,
        sku: &str,
        quantity: i64,
        actor: &Actor,
    ) -> ApiResult<()> {
        Ok(self
            .engine
            .update_request_quantity(shop_name, sku, quantity, actor)?)
    }

    /// 本店申请清单
    pub fn list_requests(&self, shop_name: &str, actor: &Actor) -> ApiResult<Vec<TransferRequest>> {
        Self::require_shop_access(actor, shop_name)?;
        Ok(self.engine.list_requests(shop_name)?)
    }
}
