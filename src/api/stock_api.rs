// ==========================================
// 门店库存调拨系统 - 库存 API
// ==========================================
// 职责: 上传对账、导出、维护锁/删除策略、门店注册的对外入口
// 权限: 上传与配置变更仅限库管;导出按角色裁剪
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::stock::{InventoryItem, Shop};
use crate::domain::types::Actor;
use crate::domain::workbook::RawWorkbook;
use crate::engine::export::{export_file_stem, write_sheet_csv, ExportBuilder, ExportScope};
use crate::engine::reconcile::{ReconcileEngine, ReconcilePolicy, ReconcileReport};
use crate::importer::canonical::resolve_canonical;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::format_adapter::FormatAdapter;
use crate::repository::item_repo::InventoryItemRepository;
use crate::repository::shop_repo::ShopRepository;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct StockApi {
    config: Arc<ConfigManager>,
    reconcile_engine: ReconcileEngine,
    export_builder: ExportBuilder,
    item_repo: InventoryItemRepository,
    shop_repo: ShopRepository,
}

impl StockApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<ConfigManager>) -> ApiResult<Self> {
        Ok(Self {
            config,
            reconcile_engine: ReconcileEngine::new(conn.clone()),
            export_builder: ExportBuilder::new(conn.clone())?,
            item_repo: InventoryItemRepository::from_connection(conn.clone())?,
            shop_repo: ShopRepository::from_connection(conn)?,
        })
    }

    fn require_manager(actor: &Actor, operation: &str) -> ApiResult<()> {
        if !actor.is_manager() {
            return Err(ApiError::PermissionDenied(format!(
                "{} 仅限库管",
                operation
            )));
        }
        Ok(())
    }

    // ==========================================
    // 上传对账
    // ==========================================

    /// 上传文件对账 (仅限库管)
    ///
    /// 流水线: 解析 -> 规范形状(适配器回退) -> 对账落库
    pub fn upload_file(
        &self,
        path: &Path,
        adapter: Option<&dyn FormatAdapter>,
        actor: &Actor,
    ) -> ApiResult<ReconcileReport> {
        Self::require_manager(actor, "库存上传")?;
        info!("库存上传: {} by {}", path.display(), actor.name);

        let raw = UniversalFileParser.parse(path)?;
        self.reconcile_raw(&raw, adapter)
    }

    /// 内存工作簿对账 (仅限库管)
    pub fn upload_workbook(
        &self,
        raw: &RawWorkbook,
        adapter: Option<&dyn FormatAdapter>,
        actor: &Actor,
    ) -> ApiResult<ReconcileReport> {
        Self::require_manager(actor, "库存上传")?;
        self.reconcile_raw(raw, adapter)
    }

    fn reconcile_raw(
        &self,
        raw: &RawWorkbook,
        adapter: Option<&dyn FormatAdapter>,
    ) -> ApiResult<ReconcileReport> {
        let workbook = resolve_canonical(raw, adapter)?;
        let policy = ReconcilePolicy {
            allow_deletions: self.config.allow_upload_deletions()?,
        };
        Ok(self.reconcile_engine.reconcile(&workbook, &policy)?)
    }

    // ==========================================
    // 导出
    // ==========================================

    fn export_scope(&self, actor: &Actor) -> ApiResult<ExportScope> {
        if actor.is_manager() {
            return Ok(ExportScope::Manager);
        }
        // 门店角色: 门店表仅含本店行,按操作人名解析门店
        let shop = self
            .shop_repo
            .find_by_name(&actor.name)?
            .ok_or_else(|| ApiError::NotFound(format!("门店不存在: {}", actor.name)))?;
        Ok(ExportScope::Shop(shop.shop_id))
    }

    /// 导出当前台账为规范两表工作簿
    pub fn export_workbook(&self, actor: &Actor) -> ApiResult<RawWorkbook> {
        let scope = self.export_scope(actor)?;
        Ok(self.export_builder.build_workbook(&scope)?)
    }

    /// 导出当前台账为 CSV 文件(每表一个文件),返回写出的路径
    pub fn export_to_csv(&self, dir: &Path, actor: &Actor) -> ApiResult<Vec<PathBuf>> {
        let workbook = self.export_workbook(actor)?;
        let stem = export_file_stem();

        let mut paths = Vec::new();
        for sheet in &workbook.sheets {
            let file_name = format!("{}_{}.csv", stem, sheet.name.replace(' ', "_"));
            let path = dir.join(file_name);
            write_sheet_csv(sheet, &path).map_err(|e| {
                tracing::error!("导出写文件失败: {}", e);
                ApiError::Internal
            })?;
            paths.push(path);
        }

        info!("导出完成: {} 个文件", paths.len());
        Ok(paths)
    }

    // ==========================================
    // 配置与门店
    // ==========================================

    /// 读取维护锁状态
    pub fn edit_lock(&self) -> ApiResult<bool> {
        Ok(self.config.is_edit_locked()?)
    }

    /// 切换维护锁 (仅限库管)
    pub fn set_edit_lock(&self, locked: bool, actor: &Actor) -> ApiResult<()> {
        Self::require_manager(actor, "维护锁切换")?;
        self.config.set_edit_lock(locked)?;
        info!("维护锁: {} by {}", locked, actor.name);
        Ok(())
    }

    /// 切换上传删除策略 (仅限库管)
    pub fn set_allow_deletions(&self, allow: bool, actor: &Actor) -> ApiResult<()> {
        Self::require_manager(actor, "删除策略切换")?;
        self.config.set_allow_upload_deletions(allow)?;
        info!("上传删除策略: {} by {}", allow, actor.name);
        Ok(())
    }

    /// 注册门店 (仅限库管)
    pub fn register_shop(&self, name: &str, actor: &Actor) -> ApiResult<Shop> {
        Self::require_manager(actor, "门店注册")?;
        Ok(self.shop_repo.register(name)?)
    }

    /// 在售商品清单(只读)
    pub fn list_active_items(&self) -> ApiResult<Vec<InventoryItem>> {
        Ok(self.item_repo.list_active()?)
    }

    /// 门店清单(只读)
    pub fn list_shops(&self) -> ApiResult<Vec<Shop>> {
        Ok(self.shop_repo.list_all()?)
    }
}
