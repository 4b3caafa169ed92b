// ==========================================
// 门店库存调拨系统 - 规范工作簿解析
// ==========================================
// 职责: 原始工作簿 -> 规范两表形状(列定位 + 适配器回退)
// 契约: 两张规范表各自可缺,至少一张可解析;
//       表头解析不到的列忽略,不报错;SKU 列必需
// ==========================================

use crate::domain::workbook::{RawWorkbook, SheetData};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::format_adapter::FormatAdapter;
use tracing::warn;

// ===== 规范表名与列名 =====
pub const WAREHOUSE_SHEET: &str = "Warehouse Stock";
pub const SHOP_SHEET: &str = "Shop Stock";

pub const COLUMN_SKU: &str = "SKU";
pub const COLUMN_DESCRIPTION: &str = "Description";
pub const COLUMN_RETAIL_PRICE: &str = "Retail Price";
pub const COLUMN_QUANTITY: &str = "Quantity";
pub const SHOP_COLUMN_SHOP_USER: &str = "Shop User";

// ==========================================
// ColumnMap - 表头列定位
// ==========================================
/// 规范列名 -> 列下标的定位结果
///
/// SKU 为行主键,必需;其余列可缺(缺列字段不参与对账)
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub shop: Option<usize>,
    pub sku: usize,
    pub description: Option<usize>,
    pub price: Option<usize>,
    pub quantity: Option<usize>,
}

// ==========================================
// CanonicalSheet / CanonicalWorkbook
// ==========================================
#[derive(Debug, Clone)]
pub struct CanonicalSheet {
    pub data: SheetData,
    pub columns: ColumnMap,
}

/// 规范两表工作簿: 对账引擎的唯一输入形状
#[derive(Debug, Clone, Default)]
pub struct CanonicalWorkbook {
    pub warehouse: Option<CanonicalSheet>,
    pub shop: Option<CanonicalSheet>,
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// 解析单张规范表的表头
///
/// 门店表必须含 "Shop User" 列,仓库表不得依赖它
fn resolve_sheet(sheet: &SheetData, is_shop: bool) -> ImportResult<CanonicalSheet> {
    let headers = &sheet.headers;

    let sku = find_column(headers, COLUMN_SKU).ok_or_else(|| ImportError::MissingColumn {
        sheet: sheet.name.clone(),
        column: COLUMN_SKU.to_string(),
    })?;

    let shop = if is_shop {
        Some(
            find_column(headers, SHOP_COLUMN_SHOP_USER).ok_or_else(|| {
                ImportError::MissingColumn {
                    sheet: sheet.name.clone(),
                    column: SHOP_COLUMN_SHOP_USER.to_string(),
                }
            })?,
        )
    } else {
        None
    };

    Ok(CanonicalSheet {
        data: sheet.clone(),
        columns: ColumnMap {
            shop,
            sku,
            description: find_column(headers, COLUMN_DESCRIPTION),
            price: find_column(headers, COLUMN_RETAIL_PRICE),
            quantity: find_column(headers, COLUMN_QUANTITY),
        },
    })
}

/// 宽松解析: 表缺失或表头不合格都按"该表不存在"处理
fn try_resolve(raw: &RawWorkbook, name: &str, is_shop: bool) -> Option<CanonicalSheet> {
    raw.sheet(name).and_then(|s| resolve_sheet(s, is_shop).ok())
}

/// 严格解析: 表缺失返回 None,表头不合格报错
fn resolve_strict(
    raw: &RawWorkbook,
    name: &str,
    is_shop: bool,
) -> ImportResult<Option<CanonicalSheet>> {
    match raw.sheet(name) {
        Some(s) => Ok(Some(resolve_sheet(s, is_shop)?)),
        None => Ok(None),
    }
}

/// 原始工作簿 -> 规范工作簿
///
/// 直接解析优先;任一规范表缺失且配置了适配器时回退适配,
/// 整次解析最多调用一次,适配产物只填补缺失的表。
/// 两表都未直接解析到时适配器失败按校验错误透传原始消息。
pub fn resolve_canonical(
    raw: &RawWorkbook,
    adapter: Option<&dyn FormatAdapter>,
) -> ImportResult<CanonicalWorkbook> {
    let mut warehouse = try_resolve(raw, WAREHOUSE_SHEET, false);
    let mut shop = try_resolve(raw, SHOP_SHEET, true);

    if let Some(adapter) = adapter {
        if warehouse.is_none() || shop.is_none() {
            match adapter.adapt(raw) {
                Ok(adapted) => {
                    // 适配产物按严格口径解析,只填补缺失的表;
                    // 直接解析到的表不被适配产物覆盖
                    if warehouse.is_none() {
                        warehouse = resolve_strict(&adapted, WAREHOUSE_SHEET, false)?;
                    }
                    if shop.is_none() {
                        shop = resolve_strict(&adapted, SHOP_SHEET, true)?;
                    }
                }
                Err(e) if warehouse.is_none() && shop.is_none() => {
                    return Err(ImportError::AdapterFailed {
                        adapter: adapter.name().to_string(),
                        message: e.0,
                    })
                }
                // 已有直接解析结果时适配失败不吞掉上传,降级为日志
                Err(e) => {
                    warn!("格式适配器 {} 失败,仅保留直接解析的表: {}", adapter.name(), e.0);
                }
            }
        }
    }

    if warehouse.is_none() && shop.is_none() {
        return Err(ImportError::MissingCanonicalSheets {
            warehouse: WAREHOUSE_SHEET.to_string(),
            shop: SHOP_SHEET.to_string(),
        });
    }

    Ok(CanonicalWorkbook { warehouse, shop })
}
