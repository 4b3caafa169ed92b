// ==========================================
// 门店库存调拨系统 - 领域类型定义
// ==========================================
// 职责: 角色/操作人、调拨状态、金额表示
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 角色 (Role)
// ==========================================
// 权限解析由外部完成(认证/分组属于系统边界外),
// 核心只消费解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Manager,  // 库管
    ShopUser, // 门店
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Manager => write!(f, "MANAGER"),
            Role::ShopUser => write!(f, "SHOP_USER"),
        }
    }
}

// ==========================================
// 操作人 (Actor)
// ==========================================
/// 操作人上下文
///
/// 门店角色的 name 即门店名称(与 shop.name 一致)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn manager(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: Role::Manager,
        }
    }

    pub fn shop_user(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: Role::ShopUser,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

// ==========================================
// 调拨状态 (Transfer State)
// ==========================================
// 状态机: NONE → DRAFT → ORDERED → {COMPLETED, CANCELLED}
// 终态删除记录,数据库只保存 DRAFT/ORDERED (ordered 标志)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Draft,   // 草稿,门店可修改数量
    Ordered, // 已提交,等待库管确认
}

impl TransferState {
    pub fn from_ordered_flag(ordered: bool) -> Self {
        if ordered {
            TransferState::Ordered
        } else {
            TransferState::Draft
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferState::Draft => write!(f, "DRAFT"),
            TransferState::Ordered => write!(f, "ORDERED"),
        }
    }
}

// ==========================================
// 金额表示 (定点两位小数,以分为单位存储)
// ==========================================

/// 解析零售价字符串为"分"
///
/// 口径: ^\d+(\.\d{1,2})?$ ,最多两位小数,不接受负数/空串
pub fn parse_price_cents(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (whole, frac, has_dot) = match s.split_once('.') {
        None => (s, "", false),
        Some((w, f)) => (w, f, true),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if has_dot && (frac.is_empty() || frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let frac_cents: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse::<i64>().ok()?,
    };

    whole.checked_mul(100)?.checked_add(frac_cents)
}

/// 将"分"格式化为两位小数字符串(导出口径)
pub fn format_price_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
