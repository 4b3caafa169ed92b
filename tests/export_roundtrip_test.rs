// ==========================================
// 导出构建器集成测试
// ==========================================
// 覆盖: 规范两表导出、角色裁剪、导出-回灌零差异、CSV 落盘回读
// ==========================================

mod test_helpers;

use shop_stock_manager::importer::canonical::{SHOP_SHEET, WAREHOUSE_SHEET};
use shop_stock_manager::importer::file_parser::{CsvParser, FileParser};
use test_helpers::*;

fn seed(app: &TestApp) {
    app.stock
        .upload_workbook(
            &combined_workbook(
                warehouse_workbook(&[
                    ("X1", "Widget", "9.99", "10"),
                    ("X2", "Gadget", "3.50", "4"),
                ]),
                shop_workbook(&[
                    ("London", "X1", "Widget", "9.99", "1"),
                    ("Paris", "X1", "Widget", "9.99", "3"),
                    ("Paris", "X2", "Gadget", "3.50", "2"),
                ]),
            ),
            None,
            &manager(),
        )
        .unwrap();
}

#[test]
fn test_manager_export_contains_both_sheets_in_full() {
    let app = setup_with_shops(&["Paris", "London"]);
    seed(&app);

    let wb = app.stock.export_workbook(&manager()).unwrap();

    let warehouse = wb.sheet(WAREHOUSE_SHEET).expect("Warehouse sheet missing");
    assert_eq!(warehouse.rows.len(), 2);
    assert_eq!(warehouse.rows[0], vec!["X1", "Widget", "9.99", "10"]);

    let shop = wb.sheet(SHOP_SHEET).expect("Shop sheet missing");
    assert_eq!(shop.rows.len(), 3);
}

#[test]
fn test_shop_export_scoped_to_own_rows() {
    let app = setup_with_shops(&["Paris", "London"]);
    seed(&app);

    let wb = app.stock.export_workbook(&shop_user("Paris")).unwrap();
    let shop = wb.sheet(SHOP_SHEET).unwrap();

    assert_eq!(shop.rows.len(), 2);
    assert!(shop.rows.iter().all(|row| row[0] == "Paris"));
}

#[test]
fn test_inactive_items_excluded_from_warehouse_sheet() {
    let app = setup_with_shops(&["Paris"]);
    let manager = manager();
    seed(&app);

    app.stock.set_allow_deletions(true, &manager).unwrap();
    app.stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
            None,
            &manager,
        )
        .unwrap();

    let wb = app.stock.export_workbook(&manager).unwrap();
    let warehouse = wb.sheet(WAREHOUSE_SHEET).unwrap();
    assert_eq!(warehouse.rows.len(), 1);
    assert_eq!(warehouse.rows[0][0], "X1");
}

#[test]
fn test_export_then_reimport_is_zero_diff() {
    let app = setup_with_shops(&["Paris", "London"]);
    let manager = manager();
    seed(&app);

    let exported = app.stock.export_workbook(&manager).unwrap();
    let report = app.stock.upload_workbook(&exported, None, &manager).unwrap();

    assert_eq!(report.items_created, 0);
    assert_eq!(report.items_updated, 0);
    assert_eq!(report.shop_rows_created, 0);
    assert_eq!(report.shop_rows_updated, 0);
    assert_eq!(report.shop_rows_deleted, 0);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_export_to_csv_and_reparse() {
    let app = setup_with_shops(&["Paris"]);
    let manager = manager();
    seed(&app);

    let dir = tempfile::tempdir().unwrap();
    let paths = app.stock.export_to_csv(dir.path(), &manager).unwrap();
    assert_eq!(paths.len(), 2);

    // 文件名主干 + 表名
    assert!(paths[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("SSM_DATA_"));

    // 仓库表 CSV 回读后归类一致
    let warehouse_path = paths
        .iter()
        .find(|p| p.to_string_lossy().contains("Warehouse"))
        .unwrap();
    let reparsed = CsvParser.parse_to_raw_workbook(warehouse_path).unwrap();
    let sheet = reparsed.sheet(WAREHOUSE_SHEET).unwrap();
    assert_eq!(sheet.rows.len(), 2);
    assert_eq!(sheet.rows[0], vec!["X1", "Widget", "9.99", "10"]);
}

#[test]
fn test_shop_export_for_unregistered_actor_is_not_found() {
    let app = setup_with_shops(&["Paris"]);
    let err = app.stock.export_workbook(&shop_user("Ghost")).unwrap_err();
    assert!(matches!(
        err,
        shop_stock_manager::api::ApiError::NotFound(_)
    ));
}
