// ==========================================
// 门店库存调拨系统 - 命令行入口
// ==========================================
// 提供库管日常操作: 上传对账、导出、维护锁、删除策略、门店注册
// 调拨工作流以库形式供上层服务集成
// ==========================================

use anyhow::{bail, Context, Result};
use shop_stock_manager::api::{ApiError, StockApi, TransferApi};
use shop_stock_manager::config::ConfigManager;
use shop_stock_manager::db;
use shop_stock_manager::domain::types::Actor;
use shop_stock_manager::engine::transfer::{LogNotifier, TransferEngine};
use shop_stock_manager::logging;
use shop_stock_manager::repository::transfer_repo::TransferRequestRepository;
use std::path::Path;
use std::sync::{Arc, Mutex};

struct App {
    stock: StockApi,
    transfer: TransferApi,
}

fn bootstrap(db_path: &str) -> Result<App> {
    let conn = db::open_sqlite_connection(db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    db::record_schema_version(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let config = Arc::new(ConfigManager::from_connection(conn.clone())?);
    // 调拨表在此建表,引擎本身不负责 DDL
    let _ = TransferRequestRepository::from_connection(conn.clone())?;

    let stock = StockApi::new(conn.clone(), config.clone())?;
    let engine = TransferEngine::new(conn, config, Box::new(LogNotifier));
    let transfer = TransferApi::new(engine);

    Ok(App { stock, transfer })
}

fn parse_toggle(value: &str) -> Result<bool> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        other => bail!("期望 on/off,实际: {}", other),
    }
}

fn print_usage() {
    println!("{} v{}", shop_stock_manager::APP_NAME, shop_stock_manager::VERSION);
    println!();
    println!("用法: shop-stock-manager <命令> [参数]");
    println!();
    println!("命令:");
    println!("  import <文件>        上传表格并对账 (.xlsx/.xls/.csv)");
    println!("  export <目录>        导出当前台账为规范 CSV");
    println!("  lock [on|off]        查看/切换维护锁");
    println!("  deletions on|off     切换上传删除策略");
    println!("  add-shop <名称>      注册门店");
    println!("  shops                门店清单");
    println!("  items                在售商品清单");
    println!("  request <门店> <SKU> <数量>    发起/覆写调拨草稿");
    println!("  submit <门店>                  提交门店全部草稿");
    println!("  complete <门店> <SKU> <数量>   确认调拨(台账移动)");
    println!("  cancel <门店> <SKU>            取消调拨申请");
    println!("  requests <门店>                门店申请清单");
    println!();
    println!("环境变量:");
    println!("  SSM_DB               数据库路径(默认用户数据目录)");
    println!("  RUST_LOG             日志级别(默认 info)");
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    let db_path = std::env::var("SSM_DB").unwrap_or_else(|_| db::default_db_path());
    if let Some(parent) = Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!("使用数据库: {}", db_path);

    let app = bootstrap(&db_path)?;
    // 命令行入口默认以库管身份操作
    let actor = Actor::manager("cli");

    match command.as_str() {
        "import" => {
            let file = args.get(1).context("缺少参数: 文件路径")?;
            let report = match app.stock.upload_file(Path::new(file), None, &actor) {
                Ok(report) => report,
                // 缺陷清单以 JSON 输出,便于定位到具体单元格
                Err(ApiError::NumericDefects { summary, defects }) => {
                    eprintln!("{}", summary);
                    eprintln!("{}", serde_json::to_string_pretty(&defects)?);
                    bail!("上传被拒绝,未发生任何写入");
                }
                Err(e) => return Err(e.into()),
            };
            println!(
                "对账完成: 商品 新增 {} / 更新 {} / 停用 {}",
                report.items_created, report.items_updated, report.items_deactivated
            );
            println!(
                "门店行: 新增 {} / 更新 {} / 删除 {},孤儿清理 {}",
                report.shop_rows_created,
                report.shop_rows_updated,
                report.shop_rows_deleted,
                report.orphans_removed
            );
            for warning in &report.warnings {
                println!("警告: {}", warning);
            }
        }
        "export" => {
            let dir = args.get(1).context("缺少参数: 输出目录")?;
            std::fs::create_dir_all(dir)?;
            let paths = app.stock.export_to_csv(Path::new(dir), &actor)?;
            for path in paths {
                println!("已写出: {}", path.display());
            }
        }
        "lock" => {
            // 无参数时只查看当前状态
            match args.get(1) {
                None => {
                    let locked = app.stock.edit_lock()?;
                    println!("维护锁: {}", if locked { "on" } else { "off" });
                }
                Some(value) => {
                    let value = parse_toggle(value)?;
                    app.stock.set_edit_lock(value, &actor)?;
                    println!("维护锁: {}", if value { "on" } else { "off" });
                }
            }
        }
        "deletions" => {
            let value = parse_toggle(args.get(1).context("缺少参数: on|off")?)?;
            app.stock.set_allow_deletions(value, &actor)?;
            println!("上传删除策略: {}", if value { "on" } else { "off" });
        }
        "add-shop" => {
            let name = args.get(1).context("缺少参数: 门店名称")?;
            let shop = app.stock.register_shop(name, &actor)?;
            println!("门店已注册: {} ({})", shop.name, shop.shop_id);
        }
        "shops" => {
            for shop in app.stock.list_shops()? {
                println!("{}\t{}", shop.shop_id, shop.name);
            }
        }
        "items" => {
            for item in app.stock.list_active_items()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    item.sku,
                    item.description,
                    shop_stock_manager::domain::types::format_price_cents(
                        item.retail_price_cents
                    ),
                    item.quantity
                );
            }
        }
        "request" => {
            let shop = args.get(1).context("缺少参数: 门店名称")?;
            let sku = args.get(2).context("缺少参数: SKU")?;
            let quantity: i64 = args.get(3).context("缺少参数: 数量")?.parse()?;
            let request = app.transfer.request_transfer(shop, sku, quantity, &actor)?;
            println!(
                "草稿已记录: {}/{} x{} ({})",
                shop, sku, request.quantity, request.state()
            );
        }
        "submit" => {
            let shop = args.get(1).context("缺少参数: 门店名称")?;
            match app.transfer.submit_outstanding(shop, &actor)? {
                shop_stock_manager::engine::SubmitOutcome::Submitted(n) => {
                    println!("已提交 {} 条草稿", n)
                }
                shop_stock_manager::engine::SubmitOutcome::NothingToSubmit => {
                    println!("无草稿可提交")
                }
            }
        }
        "complete" => {
            let shop = args.get(1).context("缺少参数: 门店名称")?;
            let sku = args.get(2).context("缺少参数: SKU")?;
            let quantity: i64 = args.get(3).context("缺少参数: 数量")?.parse()?;
            app.transfer.complete_transfer(shop, sku, quantity, &actor)?;
            println!("调拨完成: {}/{} x{}", shop, sku, quantity);
        }
        "cancel" => {
            let shop = args.get(1).context("缺少参数: 门店名称")?;
            let sku = args.get(2).context("缺少参数: SKU")?;
            app.transfer.cancel_transfer(shop, sku, &actor)?;
            println!("已取消: {}/{}", shop, sku);
        }
        "requests" => {
            let shop = args.get(1).context("缺少参数: 门店名称")?;
            for request in app.transfer.list_requests(shop, &actor)? {
                println!(
                    "{}\t{}\tx{}\t{}",
                    request.sku,
                    request.state(),
                    request.quantity,
                    request.last_updated
                );
            }
        }
        other => {
            print_usage();
            bail!("未知命令: {}", other);
        }
    }

    Ok(())
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!("{:#}", e);
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}
