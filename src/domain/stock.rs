// ==========================================
// 门店库存调拨系统 - 库存实体
// ==========================================
// 职责: 仓库台账(InventoryItem)、门店台账(ShopStock)、门店注册(Shop)
// 红线: 不含数据访问逻辑
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// InventoryItem - 仓库台账(中央库存唯一事实源)
// ==========================================
/// 仓库商品记录
///
/// 不变量:
/// - quantity >= 0
/// - retail_price_cents 以分为单位,保证恰好两位小数
/// - 被 ShopStock/TransferRequest 引用后不再物理删除,仅停用(active=false)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub sku: String,              // 商品编码(主键,稳定标识)
    pub description: String,      // 商品描述
    pub retail_price_cents: i64,  // 零售价(分)
    pub quantity: i64,            // 仓库数量
    pub active: bool,             // 在售标志,停用即软删除
    pub last_updated: String,     // 最后更新时间
}

// ==========================================
// ShopStock - 门店台账(已调出仓库的库存投影)
// ==========================================
/// 门店库存行,(shop_id, sku) 唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopStock {
    pub shop_id: String,
    pub sku: String,
    pub quantity: i64,
    pub last_updated: String,
}

/// 导出视图: 门店库存行 + 门店名称 + 商品字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopStockExportRow {
    pub shop_name: String,
    pub sku: String,
    pub description: String,
    pub retail_price_cents: i64,
    pub quantity: i64,
}

// ==========================================
// Shop - 门店注册表
// ==========================================
/// 门店身份,按名称解析(resolveShop 契约)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    pub shop_id: String, // UUID
    pub name: String,    // 门店名称,唯一
}

// ==========================================
// 类型化字段访问表
// ==========================================
// 对账引擎的差异步骤产出类型化变更集,
// 每个变更行单次写入(不逐字段写)

/// 仓库商品可比对/可写入的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    RetailPrice,
    Quantity,
    Active,
}

impl ItemField {
    /// 对应的数据库列名
    pub fn column(&self) -> &'static str {
        match self {
            ItemField::Description => "description",
            ItemField::RetailPrice => "retail_price_cents",
            ItemField::Quantity => "quantity",
            ItemField::Active => "active",
        }
    }
}

/// 字段值(与 ItemField 配对)
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

/// 单字段变更
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: ItemField,
    pub value: FieldValue,
}

impl FieldChange {
    pub fn text(field: ItemField, value: &str) -> Self {
        Self {
            field,
            value: FieldValue::Text(value.to_string()),
        }
    }

    pub fn int(field: ItemField, value: i64) -> Self {
        Self {
            field,
            value: FieldValue::Int(value),
        }
    }

    pub fn flag(field: ItemField, value: bool) -> Self {
        Self {
            field,
            value: FieldValue::Bool(value),
        }
    }
}
