// ==========================================
// 门店库存调拨系统 - 仓库台账仓储
// ==========================================
// 职责: 管理 inventory_item 表 (SKU 主键)
// 说明: 对账引擎通过 *_tx 静态方法在同一事务内组合多笔写入
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::stock::{FieldChange, FieldValue, InventoryItem};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params, Connection, Result as SqliteResult, Row, ToSql, Transaction};
use std::sync::{Arc, Mutex};

// FieldValue 直接作为 SQL 参数绑定
impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Text(s) => s.to_sql(),
            FieldValue::Int(i) => i.to_sql(),
            FieldValue::Bool(b) => b.to_sql(),
        }
    }
}

pub struct InventoryItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryItemRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let repo = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        repo.ensure_table()?;
        Ok(repo)
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在(如果不存在则创建)
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS inventory_item (
              sku TEXT PRIMARY KEY,
              description TEXT NOT NULL DEFAULT '',
              retail_price_cents INTEGER NOT NULL DEFAULT 0 CHECK(retail_price_cents >= 0),
              quantity INTEGER NOT NULL DEFAULT 0 CHECK(quantity >= 0),
              active INTEGER NOT NULL DEFAULT 1,
              last_updated TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_inventory_item_active
              ON inventory_item(active);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<InventoryItem> {
        Ok(InventoryItem {
            sku: row.get(0)?,
            description: row.get(1)?,
            retail_price_cents: row.get(2)?,
            quantity: row.get(3)?,
            active: row.get(4)?,
            last_updated: row.get(5)?,
        })
    }

    const SELECT_COLUMNS: &'static str =
        "sku, description, retail_price_cents, quantity, active, last_updated";

    /// 按 SKU 查找
    pub fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<InventoryItem>> {
        let conn = self.get_conn()?;
        Self::find_by_sku_impl(&conn, sku)
    }

    fn find_by_sku_impl(
        conn: &Connection,
        sku: &str,
    ) -> RepositoryResult<Option<InventoryItem>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_item WHERE sku = ?1",
            Self::SELECT_COLUMNS
        ))?;
        let result = stmt.query_row(params![sku], Self::map_row);
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 列出全部商品(按 SKU 排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_item ORDER BY sku ASC",
            Self::SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 列出在售商品(按 SKU 排序,导出口径)
    pub fn list_active(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_item WHERE active = 1 ORDER BY sku ASC",
            Self::SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 事务内操作 (供引擎在单一事务中组合)
    // ==========================================

    /// 事务内按 SKU 查找
    pub fn find_by_sku_tx(tx: &Transaction, sku: &str) -> RepositoryResult<Option<InventoryItem>> {
        Self::find_by_sku_impl(tx, sku)
    }

    /// 事务内插入新商品
    pub fn insert_tx(tx: &Transaction, item: &InventoryItem) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO inventory_item (sku, description, retail_price_cents, quantity, active, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
            "#,
            params![
                item.sku,
                item.description,
                item.retail_price_cents,
                item.quantity,
                item.active,
            ],
        )?;
        Ok(())
    }

    /// 事务内应用变更集: 每行一次写入,仅更新变化字段
    ///
    /// 变更集为空时不产生任何写入
    pub fn apply_changes_tx(
        tx: &Transaction,
        sku: &str,
        changes: &[FieldChange],
    ) -> RepositoryResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut set_clauses: Vec<String> = changes
            .iter()
            .map(|c| format!("{} = ?", c.field.column()))
            .collect();
        set_clauses.push("last_updated = datetime('now')".to_string());

        let sql = format!(
            "UPDATE inventory_item SET {} WHERE sku = ?",
            set_clauses.join(", ")
        );

        let mut bind: Vec<&dyn ToSql> = changes.iter().map(|c| &c.value as &dyn ToSql).collect();
        bind.push(&sku as &dyn ToSql);

        tx.execute(&sql, rusqlite::params_from_iter(bind))?;
        Ok(())
    }

    /// 事务内调整仓库数量(delta 可为负)
    ///
    /// CHECK(quantity >= 0) 作为最终兜底,业务校验在引擎层先行
    pub fn adjust_quantity_tx(tx: &Transaction, sku: &str, delta: i64) -> RepositoryResult<()> {
        let changed = tx.execute(
            r#"
            UPDATE inventory_item
            SET quantity = quantity + ?1, last_updated = datetime('now')
            WHERE sku = ?2
            "#,
            params![delta, sku],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "InventoryItem".to_string(),
                id: sku.to_string(),
            });
        }
        Ok(())
    }

    /// 事务内列出在售 SKU(停用扫描用)
    pub fn list_active_skus_tx(tx: &Transaction) -> RepositoryResult<Vec<String>> {
        let mut stmt =
            tx.prepare("SELECT sku FROM inventory_item WHERE active = 1 ORDER BY sku ASC")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 事务内停用商品(软删除,保引用完整性)
    pub fn deactivate_tx(tx: &Transaction, sku: &str) -> RepositoryResult<()> {
        tx.execute(
            "UPDATE inventory_item SET active = 0, last_updated = datetime('now') WHERE sku = ?1",
            params![sku],
        )?;
        Ok(())
    }
}
