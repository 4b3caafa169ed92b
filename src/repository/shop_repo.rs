// ==========================================
// 门店库存调拨系统 - 门店注册仓储
// ==========================================
// 职责: 管理 shop 表,按名称解析门店身份(resolveShop 契约)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::stock::Shop;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Transaction};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub struct ShopRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShopRepository {
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
            CREATE TABLE IF NOT EXISTS shop (
              shop_id TEXT PRIMARY KEY,
              name TEXT NOT NULL UNIQUE,
              created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// 注册门店(名称唯一)
    pub fn register(&self, name: &str) -> RepositoryResult<Shop> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::ValidationError(
                "门店名称不能为空".to_string(),
            ));
        }

        let shop = Shop {
            shop_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO shop (shop_id, name) VALUES (?1, ?2)",
            params![shop.shop_id, shop.name],
        )?;
        Ok(shop)
    }

    /// 按名称解析门店
    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Shop>> {
        let conn = self.get_conn()?;
        Self::find_by_name_impl(&conn, name)
    }

    fn find_by_name_impl(conn: &Connection, name: &str) -> RepositoryResult<Option<Shop>> {
        let result = conn.query_row(
            "SELECT shop_id, name FROM shop WHERE name = ?1",
            params![name],
            |row| {
                Ok(Shop {
                    shop_id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 事务内按名称解析门店
    pub fn find_by_name_tx(tx: &Transaction, name: &str) -> RepositoryResult<Option<Shop>> {
        Self::find_by_name_impl(tx, name)
    }

    /// 列出全部门店(按名称排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Shop>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT shop_id, name FROM shop ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Shop {
                    shop_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}
