// ==========================================
// 门店库存调拨系统 - 调拨申请仓储
// ==========================================
// 职责: 管理 transfer_request 表 ((shop_id, sku) 唯一,每组合最多一条未结申请)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::transfer::TransferRequest;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct TransferRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TransferRequestRepository {
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
            CREATE TABLE IF NOT EXISTS transfer_request (
              transfer_id TEXT PRIMARY KEY,
              shop_id TEXT NOT NULL,
              sku TEXT NOT NULL,
              quantity INTEGER NOT NULL CHECK(quantity >= 1),
              ordered INTEGER NOT NULL DEFAULT 0,
              created_at TEXT NOT NULL DEFAULT (datetime('now')),
              last_updated TEXT NOT NULL DEFAULT (datetime('now')),
              UNIQUE(shop_id, sku)
            );

            CREATE INDEX IF NOT EXISTS idx_transfer_request_shop
              ON transfer_request(shop_id, ordered);
            "#,
        )?;
        Ok(())
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<TransferRequest> {
        Ok(TransferRequest {
            transfer_id: row.get(0)?,
            shop_id: row.get(1)?,
            sku: row.get(2)?,
            quantity: row.get(3)?,
            ordered: row.get(4)?,
            created_at: row.get(5)?,
            last_updated: row.get(6)?,
        })
    }

    const SELECT_COLUMNS: &'static str =
        "transfer_id, shop_id, sku, quantity, ordered, created_at, last_updated";

    /// 列出某门店的全部申请(草稿+已提交,按创建时间排序)
    pub fn list_by_shop(&self, shop_id: &str) -> RepositoryResult<Vec<TransferRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transfer_request WHERE shop_id = ?1 ORDER BY created_at ASC, sku ASC",
            Self::SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![shop_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 列出全部已提交申请(库管工作队列口径)
    pub fn list_ordered(&self) -> RepositoryResult<Vec<TransferRequest>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transfer_request WHERE ordered = 1 ORDER BY last_updated ASC, sku ASC",
            Self::SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 事务内按 (shop_id, sku) 查找未结申请
    pub fn find_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
    ) -> RepositoryResult<Option<TransferRequest>> {
        let result = tx.query_row(
            &format!(
                "SELECT {} FROM transfer_request WHERE shop_id = ?1 AND sku = ?2",
                Self::SELECT_COLUMNS
            ),
            params![shop_id, sku],
            Self::map_row,
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 事务内创建草稿申请
    pub fn insert_draft_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
        quantity: i64,
    ) -> RepositoryResult<TransferRequest> {
        let transfer_id = Uuid::new_v4().to_string();
        tx.execute(
            r#"
            INSERT INTO transfer_request (transfer_id, shop_id, sku, quantity, ordered)
            VALUES (?1, ?2, ?3, ?4, 0)
            "#,
            params![transfer_id, shop_id, sku, quantity],
        )?;

        Self::find_tx(tx, shop_id, sku)?.ok_or_else(|| RepositoryError::InternalError(
            "刚插入的调拨申请读取失败".to_string(),
        ))
    }

    /// 事务内覆写申请数量(草稿重复申请/库管改量口径,不累加)
    pub fn set_quantity_tx(
        tx: &Transaction,
        shop_id: &str,
        sku: &str,
        quantity: i64,
    ) -> RepositoryResult<()> {
        let changed = tx.execute(
            r#"
            UPDATE transfer_request
            SET quantity = ?1, last_updated = datetime('now')
            WHERE shop_id = ?2 AND sku = ?3
            "#,
            params![quantity, shop_id, sku],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TransferRequest".to_string(),
                id: format!("{}/{}", shop_id, sku),
            });
        }
        Ok(())
    }

    /// 事务内列出某门店的草稿申请(提交批次口径)
    pub fn list_drafts_tx(
        tx: &Transaction,
        shop_id: &str,
    ) -> RepositoryResult<Vec<TransferRequest>> {
        let mut stmt = tx.prepare(&format!(
            "SELECT {} FROM transfer_request WHERE shop_id = ?1 AND ordered = 0 ORDER BY sku ASC",
            Self::SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![shop_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 事务内将某门店全部草稿置为已提交,返回影响行数
    pub fn mark_ordered_by_shop_tx(tx: &Transaction, shop_id: &str) -> RepositoryResult<usize> {
        let changed = tx.execute(
            r#"
            UPDATE transfer_request
            SET ordered = 1, last_updated = datetime('now')
            WHERE shop_id = ?1 AND ordered = 0
            "#,
            params![shop_id],
        )?;
        Ok(changed)
    }

    /// 事务内删除申请(完成/取消共用的终态动作)
    pub fn delete_tx(tx: &Transaction, shop_id: &str, sku: &str) -> RepositoryResult<usize> {
        let changed = tx.execute(
            "DELETE FROM transfer_request WHERE shop_id = ?1 AND sku = ?2",
            params![shop_id, sku],
        )?;
        Ok(changed)
    }
}
