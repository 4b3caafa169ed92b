// ==========================================
// 门店库存调拨系统 - 对账引擎
// ==========================================
// 职责: 规范工作簿 -> 最小安全变更集 -> 单一事务落库
// 红线: 写库前完成全部数值校验(fail-closed),
//       任一缺陷即整体拒绝,绝不出现部分落库
// ==========================================

use crate::domain::stock::{FieldChange, InventoryItem, ItemField};
use crate::domain::workbook::{CellDefect, SheetData};
use crate::importer::canonical::{
    CanonicalSheet, CanonicalWorkbook, COLUMN_QUANTITY, COLUMN_RETAIL_PRICE,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::normalizer::{normalize_price_cents, normalize_quantity};
use crate::repository::error::RepositoryError;
use crate::repository::item_repo::InventoryItemRepository;
use crate::repository::shop_repo::ShopRepository;
use crate::repository::shop_stock_repo::ShopStockRepository;
use rusqlite::{Connection, Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// ==========================================
// 策略与报告
// ==========================================

/// 对账策略
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilePolicy {
    /// 允许停用/删除快照中缺失的记录
    pub allow_deletions: bool,
}

/// 对账结果报告
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReconcileReport {
    pub items_created: usize,
    pub items_updated: usize,
    pub items_deactivated: usize,
    pub shop_rows_created: usize,
    pub shop_rows_updated: usize,
    pub shop_rows_deleted: usize,
    pub orphans_removed: usize,
    pub warnings: Vec<String>,
}

// ==========================================
// 解析后的行 (校验阶段产物)
// ==========================================
// 字段为 None 表示该列在表头中不存在,对账时跳过该字段
struct ParsedRow {
    shop_name: Option<String>,
    sku: String,
    description: Option<String>,
    price_cents: Option<i64>,
    quantity: Option<i64>,
}

// ==========================================
// ReconcileEngine - 对账引擎
// ==========================================
pub struct ReconcileEngine {
    conn: Arc<Mutex<Connection>>,
}

impl ReconcileEngine {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 对账入口: 两阶段执行
    ///
    /// 阶段 1 纯校验(无副作用),阶段 2 单一事务落库。
    /// 校验失败时数据库不发生任何写入。
    pub fn reconcile(
        &self,
        workbook: &CanonicalWorkbook,
        policy: &ReconcilePolicy,
    ) -> ImportResult<ReconcileReport> {
        info!("对账开始: allow_deletions={}", policy.allow_deletions);

        // ===== 阶段 1: 数值校验与行解析 =====
        let mut defects = Vec::new();
        let warehouse_rows = workbook
            .warehouse
            .as_ref()
            .map(|s| Self::parse_sheet(s, &mut defects));
        let shop_rows = workbook
            .shop
            .as_ref()
            .map(|s| Self::parse_sheet(s, &mut defects));

        if !defects.is_empty() {
            warn!("对账拒绝: 数值缺陷 {} 处", defects.len());
            return Err(ImportError::NumericDefects(defects));
        }

        // ===== 阶段 2: 单一事务落库 =====
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("连接锁获取失败: {}", e)))?;
        let tx = conn
            .transaction()
            .map_err(RepositoryError::from)?;

        let mut report = ReconcileReport::default();

        // 孤儿清理先行: 防御此前部分失败遗留的悬挂门店行
        report.orphans_removed = ShopStockRepository::delete_orphans_tx(&tx)?;
        if report.orphans_removed > 0 {
            info!("孤儿门店行清理: {} 行", report.orphans_removed);
        }

        if let Some(rows) = &warehouse_rows {
            Self::apply_warehouse(&tx, rows, policy, &mut report)?;
        }
        if let Some(rows) = &shop_rows {
            Self::apply_shop(&tx, rows, policy, &mut report)?;
        }

        tx.commit().map_err(RepositoryError::from)?;

        info!(
            "对账完成: 商品 +{}/~{}/-{}, 门店行 +{}/~{}/-{}, 警告 {}",
            report.items_created,
            report.items_updated,
            report.items_deactivated,
            report.shop_rows_created,
            report.shop_rows_updated,
            report.shop_rows_deleted,
            report.warnings.len()
        );
        Ok(report)
    }

    /// 单表解析: SKU 空白行静默跳过(非缺陷),数值缺陷聚合上报
    fn parse_sheet(sheet: &CanonicalSheet, defects: &mut Vec<CellDefect>) -> Vec<ParsedRow> {
        let cols = &sheet.columns;
        let mut parsed = Vec::new();

        for (i, row) in sheet.data.rows.iter().enumerate() {
            // 行号含表头,从 1 起
            let row_number = i + 2;

            let sku = SheetData::cell(row, cols.sku).to_string();
            if sku.is_empty() {
                continue;
            }

            let shop_name = cols
                .shop
                .map(|idx| SheetData::cell(row, idx).to_string());
            let description = cols
                .description
                .map(|idx| SheetData::cell(row, idx).to_string());

            let price_cents = cols.price.map(|idx| {
                let raw = SheetData::cell(row, idx);
                match normalize_price_cents(raw) {
                    Some(v) => v,
                    None => {
                        defects.push(CellDefect {
                            row_number,
                            sheet_name: sheet.data.name.clone(),
                            column_name: COLUMN_RETAIL_PRICE.to_string(),
                            raw_value: raw.to_string(),
                            key_value: sku.clone(),
                        });
                        0
                    }
                }
            });

            let quantity = cols.quantity.map(|idx| {
                let raw = SheetData::cell(row, idx);
                match normalize_quantity(raw) {
                    Some(v) => v,
                    None => {
                        defects.push(CellDefect {
                            row_number,
                            sheet_name: sheet.data.name.clone(),
                            column_name: COLUMN_QUANTITY.to_string(),
                            raw_value: raw.to_string(),
                            key_value: sku.clone(),
                        });
                        0
                    }
                }
            });

            parsed.push(ParsedRow {
                shop_name,
                sku,
                description,
                price_cents,
                quantity,
            });
        }

        parsed
    }

    /// 仓库商品差异: 仅变化字段进入变更集,每行至多一次写入
    fn diff_item(item: &InventoryItem, row: &ParsedRow) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(description) = &row.description {
            if description != &item.description {
                changes.push(FieldChange::text(ItemField::Description, description));
            }
        }
        if let Some(price) = row.price_cents {
            if price != item.retail_price_cents {
                changes.push(FieldChange::int(ItemField::RetailPrice, price));
            }
        }
        if let Some(quantity) = row.quantity {
            if quantity != item.quantity {
                changes.push(FieldChange::int(ItemField::Quantity, quantity));
            }
        }

        changes
    }

    /// 仓库表落库: 上新/差异更新/复活/停用扫描
    fn apply_warehouse(
        tx: &Transaction,
        rows: &[ParsedRow],
        policy: &ReconcilePolicy,
        report: &mut ReconcileReport,
    ) -> ImportResult<()> {
        let mut seen: HashSet<String> = HashSet::new();

        for row in rows {
            seen.insert(row.sku.clone());

            match InventoryItemRepository::find_by_sku_tx(tx, &row.sku)? {
                None => {
                    let item = InventoryItem {
                        sku: row.sku.clone(),
                        description: row.description.clone().unwrap_or_default(),
                        retail_price_cents: row.price_cents.unwrap_or(0),
                        quantity: row.quantity.unwrap_or(0),
                        active: true,
                        last_updated: String::new(),
                    };
                    InventoryItemRepository::insert_tx(tx, &item)?;
                    report.items_created += 1;
                }
                Some(item) => {
                    let mut changes = Self::diff_item(&item, row);
                    // 停用后重新出现在快照中,同笔写入内复活
                    if !item.active {
                        changes.push(FieldChange::flag(ItemField::Active, true));
                    }
                    if !changes.is_empty() {
                        InventoryItemRepository::apply_changes_tx(tx, &row.sku, &changes)?;
                        report.items_updated += 1;
                    }
                }
            }
        }

        // 停用扫描: 快照外的在售商品停用,不物理删除
        if policy.allow_deletions {
            for sku in InventoryItemRepository::list_active_skus_tx(tx)? {
                if !seen.contains(&sku) {
                    InventoryItemRepository::deactivate_tx(tx, &sku)?;
                    report.items_deactivated += 1;
                }
            }
        }

        Ok(())
    }

    /// 门店表落库: 以 (shop, sku) 为键镜像仓库表流程
    fn apply_shop(
        tx: &Transaction,
        rows: &[ParsedRow],
        policy: &ReconcilePolicy,
        report: &mut ReconcileReport,
    ) -> ImportResult<()> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut shop_cache: HashMap<String, Option<String>> = HashMap::new();

        for row in rows {
            let shop_name = row.shop_name.as_deref().unwrap_or("");

            let shop_id = match shop_cache.get(shop_name) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = ShopRepository::find_by_name_tx(tx, shop_name)?
                        .map(|s| s.shop_id);
                    shop_cache.insert(shop_name.to_string(), resolved.clone());
                    resolved
                }
            };

            // 门店解析失败: 跳过并告警,不作为硬失败
            let shop_id = match shop_id {
                Some(id) => id,
                None => {
                    let message = format!("未知门店 \"{}\": 行跳过 (SKU {})", shop_name, row.sku);
                    warn!("{}", message);
                    report.warnings.push(message);
                    continue;
                }
            };

            match InventoryItemRepository::find_by_sku_tx(tx, &row.sku)? {
                None => {
                    // 占位商品: 门店行不得凭空产生在售仓库存量
                    let item = InventoryItem {
                        sku: row.sku.clone(),
                        description: row.description.clone().unwrap_or_default(),
                        retail_price_cents: row.price_cents.unwrap_or(0),
                        quantity: 0,
                        active: false,
                        last_updated: String::new(),
                    };
                    InventoryItemRepository::insert_tx(tx, &item)?;
                    report.items_created += 1;
                }
                Some(item) => {
                    // 仓库持有的描述/价格字段同趟回传
                    let mut changes = Vec::new();
                    if let Some(description) = &row.description {
                        if description != &item.description {
                            changes
                                .push(FieldChange::text(ItemField::Description, description));
                        }
                    }
                    if let Some(price) = row.price_cents {
                        if price != item.retail_price_cents {
                            changes.push(FieldChange::int(ItemField::RetailPrice, price));
                        }
                    }
                    if !changes.is_empty() {
                        InventoryItemRepository::apply_changes_tx(tx, &row.sku, &changes)?;
                        report.items_updated += 1;
                    }
                }
            }

            let quantity = row.quantity.unwrap_or(0);
            match ShopStockRepository::find_tx(tx, &shop_id, &row.sku)? {
                None => {
                    ShopStockRepository::insert_tx(tx, &shop_id, &row.sku, quantity)?;
                    report.shop_rows_created += 1;
                }
                Some(existing) => {
                    if existing.quantity != quantity {
                        ShopStockRepository::set_quantity_tx(tx, &shop_id, &row.sku, quantity)?;
                        report.shop_rows_updated += 1;
                    }
                }
            }

            seen.insert((shop_id, row.sku.clone()));
        }

        // 删除扫描: 快照外且商品仍存在的门店行删除
        if policy.allow_deletions {
            for (shop_id, sku) in ShopStockRepository::list_pairs_tx(tx)? {
                if !seen.contains(&(shop_id.clone(), sku.clone())) {
                    ShopStockRepository::delete_tx(tx, &shop_id, &sku)?;
                    report.shop_rows_deleted += 1;
                }
            }
        }

        Ok(())
    }
}
