// ==========================================
// 门店库存调拨系统 - 调拨工作流引擎
// ==========================================
// 状态机: NONE → DRAFT → ORDERED → {COMPLETED, CANCELLED}
// 红线: 仓库数量任何转换后不得为负,校验失败时台账零变化;
//       每个操作一个事务,不存在可观察的中间状态
// ==========================================

use crate::config::ConfigManager;
use crate::domain::stock::Shop;
use crate::domain::transfer::TransferRequest;
use crate::domain::types::Actor;
use crate::repository::error::RepositoryError;
use crate::repository::item_repo::InventoryItemRepository;
use crate::repository::shop_repo::ShopRepository;
use crate::repository::shop_stock_repo::ShopStockRepository;
use crate::repository::transfer_repo::TransferRequestRepository;
use rusqlite::{Connection, Transaction};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

// ==========================================
// 错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum TransferError {
    // 维护锁置位,非库管变更被阻断
    #[error("系统维护中,调拨操作暂不可用")]
    MaintenanceLocked,

    #[error("库存不足: {sku} 可用 {available},申请 {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error("申请已提交待确认,不可修改: {shop}/{sku}")]
    LockedByOrder { shop: String, sku: String },

    #[error("调拨数量必须为正整数: {0}")]
    InvalidQuantity(i64),

    #[error("商品不存在: {0}")]
    ItemNotFound(String),

    #[error("门店不存在: {0}")]
    ShopNotFound(String),

    #[error("调拨申请不存在: {shop}/{sku}")]
    RequestNotFound { shop: String, sku: String },

    #[error("权限不足: 该操作仅限库管")]
    PermissionDenied,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type TransferResult<T> = Result<T, TransferError>;

/// 批量提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 提交了 n 条草稿
    Submitted(usize),
    /// 无草稿可提交(非错误)
    NothingToSubmit,
}

// ==========================================
// 通知接口 (外部协作方,尽力而为)
// ==========================================
/// 提交批次通知
///
/// 在 ORDERED 状态提交前调用,内容与提交集一致;
/// 通知失败只记日志,不回滚提交
pub trait TransferNotifier {
    fn notify(
        &self,
        shop: &Shop,
        batch: &[TransferRequest],
        actor: &str,
    ) -> anyhow::Result<()>;
}

/// 缺省实现: 结构化日志通知
pub struct LogNotifier;

impl TransferNotifier for LogNotifier {
    fn notify(
        &self,
        shop: &Shop,
        batch: &[TransferRequest],
        actor: &str,
    ) -> anyhow::Result<()> {
        info!(
            shop = %shop.name,
            actor = %actor,
            count = batch.len(),
            "调拨批次已提交"
        );
        Ok(())
    }
}

// ==========================================
// TransferEngine - 调拨工作流引擎
// ==========================================
pub struct TransferEngine {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
    notifier: Box<dyn TransferNotifier + Send + Sync>,
}

impl TransferEngine {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config: Arc<ConfigManager>,
        notifier: Box<dyn TransferNotifier + Send + Sync>,
    ) -> Self {
        Self {
            conn,
            config,
            notifier,
        }
    }

    /// 维护锁检查
    ///
    /// 锁状态与引擎共用一个连接,必须在开启事务前读取
    fn check_edit_lock(&self, actor: &Actor) -> TransferResult<()> {
        if self.config.is_edit_locked()? && !actor.is_manager() {
            return Err(TransferError::MaintenanceLocked);
        }
        Ok(())
    }

    fn lock_conn(&self) -> TransferResult<std::sync::MutexGuard<Connection>> {
        Ok(self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?)
    }

    fn resolve_shop_tx(tx: &Transaction, shop_name: &str) -> TransferResult<Shop> {
        ShopRepository::find_by_name_tx(tx, shop_name)?
            .ok_or_else(|| TransferError::ShopNotFound(shop_name.to_string()))
    }

    /// 事务内校验仓库可用量
    fn check_stock_tx(tx: &Transaction, sku: &str, requested: i64) -> TransferResult<()> {
        let item = InventoryItemRepository::find_by_sku_tx(tx, sku)?
            .ok_or_else(|| TransferError::ItemNotFound(sku.to_string()))?;
        if item.quantity < requested {
            return Err(TransferError::InsufficientStock {
                sku: sku.to_string(),
                available: item.quantity,
                requested,
            });
        }
        Ok(())
    }

    /// 发起调拨申请 (NONE → DRAFT / DRAFT 覆写)
    ///
    /// 草稿重复申请覆写数量而非累加;已提交的申请拒绝修改。
    /// 草稿校验可用量但不预占,并发草稿可能同时通过(完成时复验)。
    pub fn request_transfer(
        &self,
        shop_name: &str,
        sku: &str,
        quantity: i64,
        actor: &Actor,
    ) -> TransferResult<TransferRequest> {
        if quantity <= 0 {
            return Err(TransferError::InvalidQuantity(quantity));
        }
        self.check_edit_lock(actor)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;

        let shop = Self::resolve_shop_tx(&tx, shop_name)?;
        Self::check_stock_tx(&tx, sku, quantity)?;

        let request = match TransferRequestRepository::find_tx(&tx, &shop.shop_id, sku)? {
            None => TransferRequestRepository::insert_draft_tx(&tx, &shop.shop_id, sku, quantity)?,
            Some(existing) if existing.ordered => {
                return Err(TransferError::LockedByOrder {
                    shop: shop.name,
                    sku: sku.to_string(),
                });
            }
            Some(_) => {
                TransferRequestRepository::set_quantity_tx(&tx, &shop.shop_id, sku, quantity)?;
                TransferRequestRepository::find_tx(&tx, &shop.shop_id, sku)?.ok_or_else(|| {
                    RepositoryError::InternalError("草稿覆写后读取失败".to_string())
                })?
            }
        };

        tx.commit().map_err(RepositoryError::from)?;
        info!("调拨草稿: {}/{} x{}", shop_name, sku, quantity);
        Ok(request)
    }

    /// 批量提交草稿 (DRAFT → ORDERED)
    ///
    /// 通知在提交前发出,内容即本次提交的批次;
    /// 通知失败不回滚(尽力而为)
    pub fn submit_outstanding(
        &self,
        shop_name: &str,
        actor: &Actor,
    ) -> TransferResult<SubmitOutcome> {
        self.check_edit_lock(actor)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;

        let shop = Self::resolve_shop_tx(&tx, shop_name)?;
        let drafts = TransferRequestRepository::list_drafts_tx(&tx, &shop.shop_id)?;
        if drafts.is_empty() {
            return Ok(SubmitOutcome::NothingToSubmit);
        }

        if let Err(e) = self.notifier.notify(&shop, &drafts, &actor.name) {
            warn!("调拨批次通知失败(不回滚提交): {}", e);
        }

        let submitted = TransferRequestRepository::mark_ordered_by_shop_tx(&tx, &shop.shop_id)?;
        tx.commit().map_err(RepositoryError::from)?;

        info!("调拨批次提交: {} x{} 条", shop_name, submitted);
        Ok(SubmitOutcome::Submitted(submitted))
    }

    /// 确认调拨 (ORDERED → COMPLETED,仅限库管)
    ///
    /// 完成时复验可用量(草稿创建后库存可能已漂移);
    /// 门店入账 + 仓库出账 + 申请删除为一个原子单元
    pub fn complete_transfer(
        &self,
        shop_name: &str,
        sku: &str,
        quantity: i64,
        actor: &Actor,
    ) -> TransferResult<()> {
        if !actor.is_manager() {
            return Err(TransferError::PermissionDenied);
        }
        if quantity <= 0 {
            return Err(TransferError::InvalidQuantity(quantity));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;

        let shop = Self::resolve_shop_tx(&tx, shop_name)?;
        if TransferRequestRepository::find_tx(&tx, &shop.shop_id, sku)?.is_none() {
            return Err(TransferError::RequestNotFound {
                shop: shop.name,
                sku: sku.to_string(),
            });
        }
        Self::check_stock_tx(&tx, sku, quantity)?;

        ShopStockRepository::add_quantity_tx(&tx, &shop.shop_id, sku, quantity)?;
        InventoryItemRepository::adjust_quantity_tx(&tx, sku, -quantity)?;
        TransferRequestRepository::delete_tx(&tx, &shop.shop_id, sku)?;

        tx.commit().map_err(RepositoryError::from)?;
        info!("调拨完成: {}/{} x{}", shop_name, sku, quantity);
        Ok(())
    }

    /// 取消调拨 (任意状态 → CANCELLED)
    ///
    /// 绕过维护锁: 取消必须随时可用,避免维护窗口内申请卡死
    pub fn cancel_transfer(&self, shop_name: &str, sku: &str) -> TransferResult<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;

        let shop = Self::resolve_shop_tx(&tx, shop_name)?;
        let deleted = TransferRequestRepository::delete_tx(&tx, &shop.shop_id, sku)?;
        if deleted == 0 {
            return Err(TransferError::RequestNotFound {
                shop: shop.name,
                sku: sku.to_string(),
            });
        }

        tx.commit().map_err(RepositoryError::from)?;
        info!("调拨取消: {}/{}", shop_name, sku);
        Ok(())
    }

    /// 库管改量 (任意未结状态,仅限库管)
    ///
    /// 已提交的申请普通门店不可改,库管可以
    pub fn update_request_quantity(
        &self,
        shop_name: &str,
        sku: &str,
        quantity: i64,
        actor: &Actor,
    ) -> TransferResult<()> {
        if !actor.is_manager() {
            return Err(TransferError::PermissionDenied);
        }
        if quantity <= 0 {
            return Err(TransferError::InvalidQuantity(quantity));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;

        let shop = Self::resolve_shop_tx(&tx, shop_name)?;
        Self::check_stock_tx(&tx, sku, quantity)?;

        match TransferRequestRepository::set_quantity_tx(&tx, &shop.shop_id, sku, quantity) {
            Ok(()) => {}
            Err(RepositoryError::NotFound { .. }) => {
                return Err(TransferError::RequestNotFound {
                    shop: shop.name,
                    sku: sku.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().map_err(RepositoryError::from)?;
        Ok(())
    }

    /// 门店申请清单(只读)
    pub fn list_requests(&self, shop_name: &str) -> TransferResult<Vec<TransferRequest>> {
        let shop_repo = ShopRepository::from_connection(self.conn.clone())?;
        let shop = shop_repo
            .find_by_name(shop_name)?
            .ok_or_else(|| TransferError::ShopNotFound(shop_name.to_string()))?;

        let repo = TransferRequestRepository::from_connection(self.conn.clone())?;
        Ok(repo.list_by_shop(&shop.shop_id)?)
    }
}
