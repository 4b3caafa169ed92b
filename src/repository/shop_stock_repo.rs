// ==========================================
// 门店库存调拨系统 - 门店台账仓储
// ==========================================
// 职责: 管理 shop_stock 表 ((shop_id, sku) 唯一约束)
// 说明: 孤儿清理/停用扫描等跨表写入通过 *_tx 方法在引擎事务内完成
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::stock::{ShopStock, ShopStockExportRow};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Transaction};
use std::sync::{Arc, Mutex};

pub struct ShopStockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShopStockRepository {
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
    ///
    /// (shop_id, sku) 唯一性由约束保证,不靠扫描
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS shop_stock (
              shop_id TEXT NOT NULL,
              sku TEXT NOT NULL,
              quantity INTEGER NOT NULL DEFAULT 0 CHECK(quantity >= 0),
              last_updated TEXT NOT NULL DEFAULT (datetime('now')),
              UNIQUE(shop_id, sku)
            );

            CREATE INDEX IF NOT EXISTS idx_shop_stock_sku
              ON shop_stock(sku);
            "#,
        )?;
        Ok(())
    }

    /// 导出视图: 门店库存联门店/商品字段
    ///
    /// # 参数
    /// - shop_id: Some 时仅导出该门店(非库管口径)
    pub fn list_for_export(
        &self,
        shop_id: Option<&str>,
    ) -> RepositoryResult<Vec<ShopStockExportRow>> {
        let conn = self.get_conn()?;

        let base = r#"
            SELECT s.name, ss.sku, i.description, i.retail_price_cents, ss.quantity
            FROM shop_stock ss
            JOIN shop s ON s.shop_id = ss.shop_id
            JOIN inventory_item i ON i.sku = ss.sku
        "#;

        let map = |row: &rusqlite::Row<'_>| -> SqliteResult<ShopStockExportRow> {
            Ok(ShopStockExportRow {
                shop_name: row.get(0)?,
                sku: row.get(1)?,
                description: row.get(2)?,
                retail_price_cents: row.get(3)?,
                quantity: row.get(4)?,
            })
        };

        let rows = match shop_id {
            Some(id) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE ss.shop_id = ?1 ORDER BY s.name ASC, ss.sku ASC",
                    base
                ))?;
                let rows = stmt
                    .query_map(params![id], map)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{} ORDER BY s.name ASC, ss.sku ASC", base))?;
                let rows = stmt.query_map([], map)?.collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        Ok(rows)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 事务内按 (shop_id, sku) 查找
    pub fn find_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
    ) -> RepositoryResult<Option<ShopStock>> {
        let result = tx.query_row(
            r#"
            SELECT shop_id, sku, quantity, last_updated
            FROM shop_stock
            WHERE shop_id = ?1 AND sku = ?2
            "#,
            params![shop_id, sku],
            |row| {
                Ok(ShopStock {
                    shop_id: row.get(0)?,
                    sku: row.get(1)?,
                    quantity: row.get(2)?,
                    last_updated: row.get(3)?,
                })
            },
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 事务内插入门店库存行
    pub fn insert_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO shop_stock (shop_id, sku, quantity, last_updated)
            VALUES (?1, ?2, ?3, datetime('now'))
            "#,
            params![shop_id, sku, quantity],
        )?;
        Ok(())
    }

    /// 事务内覆写数量(对账口径: 仅数量变化才调用,单次写入)
    pub fn set_quantity_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            UPDATE shop_stock
            SET quantity = ?1, last_updated = datetime('now')
            WHERE shop_id = ?2 AND sku = ?3
            "#,
            params![quantity, shop_id, sku],
        )?;
        Ok(())
    }

    /// 事务内增量调整数量(调拨确认口径)
    pub fn add_quantity_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
        delta: i64,
    ) -> RepositoryResult<()> {
        let changed = tx.execute(
            r#"
            UPDATE shop_stock
            SET quantity = quantity + ?1, last_updated = datetime('now')
            WHERE shop_id = ?2 AND sku = ?3
            "#,
            params![delta, shop_id, sku],
        )?;
        if changed == 0 {
            Self::insert_tx(tx, shop_id, sku, delta)?;
        }
        Ok(())
    }

    /// 事务内删除单行
    pub fn delete_tx(tx: &Transaction, shop_id: &str, sku: &str) -> RepositoryResult<usize> {
        let changed = tx.execute(
            "DELETE FROM shop_stock WHERE shop_id = ?1 AND sku = ?2",
            params![shop_id, sku],
        )?;
        Ok(changed)
    }

    /// 事务内清理孤儿行: 引用的商品已不存在于 inventory_item
    ///
    /// 防御此前部分失败遗留的悬挂行,每次上传前执行
    pub fn delete_orphans_tx(tx: &Transaction) -> RepositoryResult<usize> {
        let changed = tx.execute(
            r#"
            DELETE FROM shop_stock
            WHERE sku NOT IN (SELECT sku FROM inventory_item)
            "#,
            [],
        )?;
        Ok(changed)
    }

    /// 事务内列出全部 (shop_id, sku) 组合(仅商品仍存在的行,删除扫描用)
    pub fn list_pairs_tx(tx: &Transaction) -> RepositoryResult<Vec<(String, String)>> {
        let mut stmt = tx.prepare(
            r#"
            SELECT ss.shop_id, ss.sku
            FROM shop_stock ss
            JOIN inventory_item i ON i.sku = ss.sku
            ORDER BY ss.shop_id ASC, ss.sku ASC
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}
