// ==========================================
// 门店库存调拨系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// 说明: 维护锁(edit_lock)是全局单例状态,落库而非进程内全局变量,
//       每次变更操作开始时读取一次
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 维护锁: 置位时阻止非库管的调拨变更
pub const KEY_EDIT_LOCK: &str = "edit_lock";

/// 上传删除策略: 置位时对账会停用/删除快照中缺失的记录
pub const KEY_ALLOW_UPLOAD_DELETIONS: &str = "allow_upload_deletions";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_table()?;
        Ok(manager)
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let manager = Self { conn };
        manager.ensure_table()?;
        Ok(manager)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// 读取配置值
    fn get_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值(Upsert)
    fn set_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取布尔配置,缺省按 default
    pub fn get_bool(&self, key: &str, default: bool) -> RepositoryResult<bool> {
        Ok(self
            .get_value(key)?
            .map(|v| v == "true")
            .unwrap_or(default))
    }

    pub fn set_bool(&self, key: &str, value: bool) -> RepositoryResult<()> {
        self.set_value(key, if value { "true" } else { "false" })
    }

    // ==========================================
    // 业务配置快捷方法
    // ==========================================

    /// 维护锁是否置位
    pub fn is_edit_locked(&self) -> RepositoryResult<bool> {
        self.get_bool(KEY_EDIT_LOCK, false)
    }

    pub fn set_edit_lock(&self, locked: bool) -> RepositoryResult<()> {
        self.set_bool(KEY_EDIT_LOCK, locked)
    }

    /// 对账时是否允许删除/停用快照外记录
    pub fn allow_upload_deletions(&self) -> RepositoryResult<bool> {
        self.get_bool(KEY_ALLOW_UPLOAD_DELETIONS, false)
    }

    pub fn set_allow_upload_deletions(&self, allow: bool) -> RepositoryResult<()> {
        self.set_bool(KEY_ALLOW_UPLOAD_DELETIONS, allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let manager = ConfigManager::new(":memory:").unwrap();
        // 未配置时: 不锁、不删
        assert!(!manager.is_edit_locked().unwrap());
        assert!(!manager.allow_upload_deletions().unwrap());
    }

    #[test]
    fn test_toggle_round_trip() {
        let manager = ConfigManager::new(":memory:").unwrap();

        manager.set_edit_lock(true).unwrap();
        assert!(manager.is_edit_locked().unwrap());
        manager.set_edit_lock(false).unwrap();
        assert!(!manager.is_edit_locked().unwrap());

        manager.set_allow_upload_deletions(true).unwrap();
        assert!(manager.allow_upload_deletions().unwrap());
    }
}
