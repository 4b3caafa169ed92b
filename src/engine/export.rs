// ==========================================
// 门店库存调拨系统 - 导出构建器
// ==========================================
// 职责: 当前台账 -> 规范两表形状(读路径)
// 口径: 仓库表只导出在售商品;门店表按角色裁剪
// ==========================================

use crate::domain::types::format_price_cents;
use crate::domain::workbook::{RawWorkbook, SheetData};
use crate::importer::canonical::{
    COLUMN_DESCRIPTION, COLUMN_QUANTITY, COLUMN_RETAIL_PRICE, COLUMN_SKU, SHOP_COLUMN_SHOP_USER,
    SHOP_SHEET, WAREHOUSE_SHEET,
};
use crate::repository::error::RepositoryResult;
use crate::repository::item_repo::InventoryItemRepository;
use crate::repository::shop_stock_repo::ShopStockRepository;
use chrono::Local;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 导出范围
#[derive(Debug, Clone)]
pub enum ExportScope {
    /// 库管: 两表全量
    Manager,
    /// 门店: 门店表仅含本店行
    Shop(String),
}

// ==========================================
// ExportBuilder - 导出构建器
// ==========================================
pub struct ExportBuilder {
    item_repo: InventoryItemRepository,
    shop_stock_repo: ShopStockRepository,
}

impl ExportBuilder {
    pub fn new(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        Ok(Self {
            item_repo: InventoryItemRepository::from_connection(conn.clone())?,
            shop_stock_repo: ShopStockRepository::from_connection(conn)?,
        })
    }

    /// 构建规范两表工作簿
    ///
    /// 产物可直接回灌对账引擎(往返零差异)
    pub fn build_workbook(&self, scope: &ExportScope) -> RepositoryResult<RawWorkbook> {
        let mut warehouse = SheetData::new(
            WAREHOUSE_SHEET,
            vec![
                COLUMN_SKU.to_string(),
                COLUMN_DESCRIPTION.to_string(),
                COLUMN_RETAIL_PRICE.to_string(),
                COLUMN_QUANTITY.to_string(),
            ],
        );
        for item in self.item_repo.list_active()? {
            warehouse.rows.push(vec![
                item.sku,
                item.description,
                format_price_cents(item.retail_price_cents),
                item.quantity.to_string(),
            ]);
        }

        let shop_filter = match scope {
            ExportScope::Manager => None,
            ExportScope::Shop(shop_id) => Some(shop_id.as_str()),
        };

        let mut shop = SheetData::new(
            SHOP_SHEET,
            vec![
                SHOP_COLUMN_SHOP_USER.to_string(),
                COLUMN_SKU.to_string(),
                COLUMN_DESCRIPTION.to_string(),
                COLUMN_RETAIL_PRICE.to_string(),
                COLUMN_QUANTITY.to_string(),
            ],
        );
        for row in self.shop_stock_repo.list_for_export(shop_filter)? {
            shop.rows.push(vec![
                row.shop_name,
                row.sku,
                row.description,
                format_price_cents(row.retail_price_cents),
                row.quantity.to_string(),
            ]);
        }

        info!(
            "导出构建: 仓库 {} 行, 门店 {} 行",
            warehouse.rows.len(),
            shop.rows.len()
        );
        Ok(RawWorkbook {
            sheets: vec![warehouse, shop],
        })
    }
}

/// 导出文件名主干: SSM_DATA_<本地时间戳>
pub fn export_file_stem() -> String {
    format!("SSM_DATA_{}", Local::now().format("%Y%m%d_%H%M%S"))
}

/// 单表写出 CSV
pub fn write_sheet_csv(sheet: &SheetData, path: &Path) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&sheet.headers)?;
    for row in &sheet.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_stem_shape() {
        let stem = export_file_stem();
        assert!(stem.starts_with("SSM_DATA_"));
        // SSM_DATA_ + YYYYMMDD_HHMMSS
        assert_eq!(stem.len(), "SSM_DATA_".len() + 15);
    }
}
