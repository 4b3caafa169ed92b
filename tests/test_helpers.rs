// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的全栈装配、工作簿构造、批次捕获通知器
// ==========================================

#![allow(dead_code)]

use rusqlite::Connection;
use shop_stock_manager::api::{StockApi, TransferApi};
use shop_stock_manager::config::ConfigManager;
use shop_stock_manager::domain::stock::{InventoryItem, Shop};
use shop_stock_manager::domain::transfer::TransferRequest;
use shop_stock_manager::domain::workbook::{RawWorkbook, SheetData};
use shop_stock_manager::engine::transfer::{TransferEngine, TransferNotifier};
use shop_stock_manager::repository::item_repo::InventoryItemRepository;
use shop_stock_manager::repository::shop_stock_repo::ShopStockRepository;
use shop_stock_manager::repository::transfer_repo::TransferRequestRepository;
use std::sync::{Arc, Mutex};

/// 全栈测试装配: 共享内存库上的 API + 引擎 + 仓储
pub struct TestApp {
    pub conn: Arc<Mutex<Connection>>,
    pub config: Arc<ConfigManager>,
    pub stock: StockApi,
    pub transfer: TransferApi,
    /// 提交批次捕获: (门店名, 批次条数)
    pub notified: Arc<Mutex<Vec<(String, usize)>>>,
}

/// 批次捕获通知器
pub struct CapturingNotifier {
    pub sink: Arc<Mutex<Vec<(String, usize)>>>,
    /// 置位时通知固定失败(验证尽力而为语义)
    pub fail: bool,
}

impl TransferNotifier for CapturingNotifier {
    fn notify(
        &self,
        shop: &Shop,
        batch: &[TransferRequest],
        _actor: &str,
    ) -> anyhow::Result<()> {
        self.sink
            .lock()
            .unwrap()
            .push((shop.name.clone(), batch.len()));
        if self.fail {
            anyhow::bail!("通知通道不可用");
        }
        Ok(())
    }
}

pub fn setup() -> TestApp {
    setup_inner(false)
}

/// 通知器固定失败的装配
pub fn setup_with_failing_notifier() -> TestApp {
    setup_inner(true)
}

fn setup_inner(fail_notify: bool) -> TestApp {
    shop_stock_manager::logging::init_test();

    let conn = shop_stock_manager::db::open_sqlite_connection(":memory:")
        .expect("Failed to open test database");
    let conn = Arc::new(Mutex::new(conn));

    let config =
        Arc::new(ConfigManager::from_connection(conn.clone()).expect("Failed to init config"));
    // 建表
    let _ = TransferRequestRepository::from_connection(conn.clone()).unwrap();

    let stock = StockApi::new(conn.clone(), config.clone()).expect("Failed to init stock api");

    let notified = Arc::new(Mutex::new(Vec::new()));
    let notifier = CapturingNotifier {
        sink: notified.clone(),
        fail: fail_notify,
    };
    let engine = TransferEngine::new(conn.clone(), config.clone(), Box::new(notifier));
    let transfer = TransferApi::new(engine);

    TestApp {
        conn,
        config,
        stock,
        transfer,
        notified,
    }
}

/// 注册门店后返回装配
pub fn setup_with_shops(names: &[&str]) -> TestApp {
    let app = setup();
    let manager = manager();
    for name in names {
        app.stock.register_shop(name, &manager).unwrap();
    }
    app
}

pub fn manager() -> shop_stock_manager::domain::types::Actor {
    shop_stock_manager::domain::types::Actor::manager("warehouse")
}

pub fn shop_user(name: &str) -> shop_stock_manager::domain::types::Actor {
    shop_stock_manager::domain::types::Actor::shop_user(name)
}

// ==========================================
// 工作簿构造
// ==========================================

/// 仓库表工作簿: (SKU, 描述, 价格, 数量)
pub fn warehouse_workbook(rows: &[(&str, &str, &str, &str)]) -> RawWorkbook {
    let mut sheet = SheetData::new(
        "Warehouse Stock",
        vec![
            "SKU".to_string(),
            "Description".to_string(),
            "Retail Price".to_string(),
            "Quantity".to_string(),
        ],
    );
    for (sku, desc, price, qty) in rows {
        sheet.rows.push(vec![
            sku.to_string(),
            desc.to_string(),
            price.to_string(),
            qty.to_string(),
        ]);
    }
    RawWorkbook {
        sheets: vec![sheet],
    }
}

/// 门店表工作簿: (门店, SKU, 描述, 价格, 数量)
pub fn shop_workbook(rows: &[(&str, &str, &str, &str, &str)]) -> RawWorkbook {
    let mut sheet = SheetData::new(
        "Shop Stock",
        vec![
            "Shop User".to_string(),
            "SKU".to_string(),
            "Description".to_string(),
            "Retail Price".to_string(),
            "Quantity".to_string(),
        ],
    );
    for (shop, sku, desc, price, qty) in rows {
        sheet.rows.push(vec![
            shop.to_string(),
            sku.to_string(),
            desc.to_string(),
            price.to_string(),
            qty.to_string(),
        ]);
    }
    RawWorkbook {
        sheets: vec![sheet],
    }
}

/// 两表合并
pub fn combined_workbook(warehouse: RawWorkbook, shop: RawWorkbook) -> RawWorkbook {
    let mut sheets = warehouse.sheets;
    sheets.extend(shop.sheets);
    RawWorkbook { sheets }
}

// ==========================================
// 台账读取
// ==========================================

pub fn find_item(app: &TestApp, sku: &str) -> Option<InventoryItem> {
    InventoryItemRepository::from_connection(app.conn.clone())
        .unwrap()
        .find_by_sku(sku)
        .unwrap()
}

pub fn shop_quantity(app: &TestApp, shop_name: &str, sku: &str) -> Option<i64> {
    let repo = ShopStockRepository::from_connection(app.conn.clone()).unwrap();
    repo.list_for_export(None)
        .unwrap()
        .into_iter()
        .find(|row| row.shop_name == shop_name && row.sku == sku)
        .map(|row| row.quantity)
}
