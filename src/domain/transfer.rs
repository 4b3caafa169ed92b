// ==========================================
// 门店库存调拨系统 - 调拨实体
// ==========================================
// 职责: 调拨申请记录(仓库台账与门店台账之间的暂存桥)
// ==========================================

use crate::domain::types::TransferState;
use serde::{Deserialize, Serialize};

// ==========================================
// TransferRequest - 调拨申请
// ==========================================
/// 调拨申请记录
///
/// (shop_id, sku) 唯一 —— 每组合最多一条未结申请。
/// 草稿重复申请覆盖数量(不累加);ordered=true 后锁定,
/// 仅库管可通过确认/改量操作覆盖。完成或取消即删除记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub transfer_id: String,  // UUID
    pub shop_id: String,      // 门店ID
    pub sku: String,          // 商品编码
    pub quantity: i64,        // 申请数量(>=1)
    pub ordered: bool,        // false=草稿, true=已提交
    pub created_at: String,   // 创建时间
    pub last_updated: String, // 最后更新时间
}

impl TransferRequest {
    pub fn state(&self) -> TransferState {
        TransferState::from_ordered_flag(self.ordered)
    }
}
