// ==========================================
// 门店库存调拨系统 - 格式适配器
// ==========================================
// 职责: 任意来料布局 -> 规范两表形状的可插拔转换
// 契约: adapt 失败时原始消息原样透传给上传方
// ==========================================

use crate::domain::workbook::{RawWorkbook, SheetData};
use crate::importer::canonical::{
    COLUMN_DESCRIPTION, COLUMN_QUANTITY, COLUMN_RETAIL_PRICE, COLUMN_SKU, SHOP_COLUMN_SHOP_USER,
    SHOP_SHEET, WAREHOUSE_SHEET,
};
use crate::importer::normalizer::{normalize_price_cents, normalize_quantity};
use std::collections::HashMap;

/// 适配器错误: 消息面向上传方,保持可读
#[derive(Debug, Clone)]
pub struct AdapterError(pub String);

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for AdapterError {}

/// 格式适配器接口
///
/// 规范表解析失败时整次上传最多调用一次
pub trait FormatAdapter {
    fn name(&self) -> &str;
    fn adapt(&self, raw: &RawWorkbook) -> Result<RawWorkbook, AdapterError>;
}

// ==========================================
// WideLayoutAdapter - 宽表透视适配器
// ==========================================
/// 宽表布局适配: 一行一 SKU,各仓/各门店数量铺成列
///
/// - warehouse_columns 多仓数量按行求和并入单一仓库表
/// - shop_columns 逐列展开成门店表行,(源列名, 门店名) 成对配置
/// - 数量/价格不可转换按 0 处理(来料脏数据由对账前校验兜底)
pub struct WideLayoutAdapter {
    /// 源工作表名,None 取第一张表
    pub source_sheet: Option<String>,
    pub sku_column: String,
    pub description_column: String,
    pub price_column: String,
    pub warehouse_columns: Vec<String>,
    pub shop_columns: Vec<(String, String)>,
}

impl WideLayoutAdapter {
    fn column_index(sheet: &SheetData, name: &str) -> Option<usize> {
        sheet.headers.iter().position(|h| h == name)
    }
}

impl FormatAdapter for WideLayoutAdapter {
    fn name(&self) -> &str {
        "WideLayoutAdapter"
    }

    fn adapt(&self, raw: &RawWorkbook) -> Result<RawWorkbook, AdapterError> {
        let source = match &self.source_sheet {
            Some(name) => raw
                .sheet(name)
                .ok_or_else(|| AdapterError(format!("源工作表不存在: {}", name)))?,
            None => raw
                .sheets
                .first()
                .ok_or_else(|| AdapterError("工作簿为空".to_string()))?,
        };

        let sku_idx = Self::column_index(source, &self.sku_column)
            .ok_or_else(|| AdapterError(format!("源工作表缺少 SKU 列: {}", self.sku_column)))?;
        let desc_idx = Self::column_index(source, &self.description_column);
        let price_idx = Self::column_index(source, &self.price_column);

        let wh_indices: Vec<usize> = self
            .warehouse_columns
            .iter()
            .filter_map(|c| Self::column_index(source, c))
            .collect();
        let shop_indices: Vec<(usize, &str)> = self
            .shop_columns
            .iter()
            .filter_map(|(col, user)| {
                Self::column_index(source, col).map(|idx| (idx, user.as_str()))
            })
            .collect();

        if wh_indices.is_empty() && shop_indices.is_empty() {
            return Err(AdapterError(
                "源工作表未命中任何仓库/门店数量列".to_string(),
            ));
        }

        // 仓库表: 多仓列求和,重复 SKU 聚合
        let mut wh_sheet = SheetData::new(
            WAREHOUSE_SHEET,
            vec![
                COLUMN_SKU.to_string(),
                COLUMN_DESCRIPTION.to_string(),
                COLUMN_RETAIL_PRICE.to_string(),
                COLUMN_QUANTITY.to_string(),
            ],
        );
        let mut wh_totals: HashMap<String, usize> = HashMap::new();

        // 门店表: 逐门店列展开,零数量行丢弃
        let mut shop_sheet = SheetData::new(
            SHOP_SHEET,
            vec![
                SHOP_COLUMN_SHOP_USER.to_string(),
                COLUMN_SKU.to_string(),
                COLUMN_DESCRIPTION.to_string(),
                COLUMN_RETAIL_PRICE.to_string(),
                COLUMN_QUANTITY.to_string(),
            ],
        );

        for row in &source.rows {
            let sku = SheetData::cell(row, sku_idx).to_string();
            if sku.is_empty() {
                continue;
            }

            let description = desc_idx
                .map(|i| SheetData::cell(row, i).to_string())
                .unwrap_or_default();
            let raw_price = price_idx
                .map(|i| SheetData::cell(row, i).to_string())
                .unwrap_or_default();
            let price = if normalize_price_cents(&raw_price).is_some() {
                raw_price
            } else {
                "0".to_string()
            };

            if !wh_indices.is_empty() {
                let total: i64 = wh_indices
                    .iter()
                    .map(|&i| normalize_quantity(SheetData::cell(row, i)).unwrap_or(0))
                    .sum();

                match wh_totals.get(&sku) {
                    Some(&existing_row) => {
                        let prev =
                            normalize_quantity(&wh_sheet.rows[existing_row][3]).unwrap_or(0);
                        wh_sheet.rows[existing_row][3] = (prev + total).to_string();
                    }
                    None => {
                        wh_totals.insert(sku.clone(), wh_sheet.rows.len());
                        wh_sheet.rows.push(vec![
                            sku.clone(),
                            description.clone(),
                            price.clone(),
                            total.to_string(),
                        ]);
                    }
                }
            }

            for &(idx, shop_user) in &shop_indices {
                let qty = normalize_quantity(SheetData::cell(row, idx)).unwrap_or(0);
                if qty <= 0 {
                    continue;
                }
                shop_sheet.rows.push(vec![
                    shop_user.to_string(),
                    sku.clone(),
                    description.clone(),
                    price.clone(),
                    qty.to_string(),
                ]);
            }
        }

        let mut sheets = Vec::new();
        if !wh_indices.is_empty() {
            sheets.push(wh_sheet);
        }
        if !shop_indices.is_empty() {
            sheets.push(shop_sheet);
        }

        Ok(RawWorkbook { sheets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_workbook() -> RawWorkbook {
        let mut sheet = SheetData::new(
            "Supplier Export",
            vec![
                "product code".to_string(),
                "product desc".to_string(),
                "price".to_string(),
                "Inverness".to_string(),
                "Aberdeen".to_string(),
                "London".to_string(),
                "Paris".to_string(),
            ],
        );
        sheet.rows.push(vec![
            "X1".to_string(),
            "Widget".to_string(),
            "9.99".to_string(),
            "4".to_string(),
            "6".to_string(),
            "2".to_string(),
            "0".to_string(),
        ]);
        sheet.rows.push(vec![
            "".to_string(), // 无 SKU,丢弃
            "Ghost".to_string(),
            "1.00".to_string(),
            "1".to_string(),
            "1".to_string(),
            "1".to_string(),
            "1".to_string(),
        ]);
        RawWorkbook {
            sheets: vec![sheet],
        }
    }

    fn adapter() -> WideLayoutAdapter {
        WideLayoutAdapter {
            source_sheet: Some("Supplier Export".to_string()),
            sku_column: "product code".to_string(),
            description_column: "product desc".to_string(),
            price_column: "price".to_string(),
            warehouse_columns: vec!["Inverness".to_string(), "Aberdeen".to_string()],
            shop_columns: vec![
                ("London".to_string(), "shop.london".to_string()),
                ("Paris".to_string(), "shop.paris".to_string()),
            ],
        }
    }

    #[test]
    fn test_pivot_to_canonical_shape() {
        let out = adapter().adapt(&wide_workbook()).unwrap();

        let wh = out.sheet(WAREHOUSE_SHEET).expect("Warehouse sheet missing");
        assert_eq!(wh.rows.len(), 1);
        // 多仓求和: 4 + 6
        assert_eq!(wh.rows[0], vec!["X1", "Widget", "9.99", "10"]);

        let shop = out.sheet(SHOP_SHEET).expect("Shop sheet missing");
        // 零数量门店行丢弃
        assert_eq!(shop.rows.len(), 1);
        assert_eq!(shop.rows[0], vec!["shop.london", "X1", "Widget", "9.99", "2"]);
    }

    #[test]
    fn test_missing_source_sheet_is_error() {
        let mut a = adapter();
        a.source_sheet = Some("Nope".to_string());
        let err = a.adapt(&wide_workbook()).unwrap_err();
        assert!(err.0.contains("Nope"));
    }

    #[test]
    fn test_no_quantity_columns_is_error() {
        let mut a = adapter();
        a.warehouse_columns = vec!["Glasgow".to_string()];
        a.shop_columns = vec![("Berlin".to_string(), "shop.berlin".to_string())];
        assert!(a.adapt(&wide_workbook()).is_err());
    }
}
