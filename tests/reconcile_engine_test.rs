// ==========================================
// 对账引擎集成测试
// ==========================================
// 覆盖: 上新/差异更新/幂等、fail-closed 拒绝、
//       停用与复活、门店表镜像、孤儿清理、适配器回退
// ==========================================

mod test_helpers;

use shop_stock_manager::api::ApiError;
use shop_stock_manager::domain::workbook::{RawWorkbook, SheetData};
use shop_stock_manager::importer::format_adapter::WideLayoutAdapter;
use test_helpers::*;

#[test]
fn test_upload_creates_then_updates_quantity_only() {
    let app = setup();
    let manager = manager();

    // 首次上传: 上新
    let report = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
            None,
            &manager,
        )
        .unwrap();
    assert_eq!(report.items_created, 1);
    assert_eq!(report.items_updated, 0);

    // 再次上传,仅数量变化: 恰好一次更新,价格/描述不动
    let report = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "12")]),
            None,
            &manager,
        )
        .unwrap();
    assert_eq!(report.items_created, 0);
    assert_eq!(report.items_updated, 1);

    let item = find_item(&app, "X1").unwrap();
    assert_eq!(item.quantity, 12);
    assert_eq!(item.description, "Widget");
    assert_eq!(item.retail_price_cents, 999);
    assert!(item.active);
}

#[test]
fn test_reconcile_is_idempotent() {
    let app = setup();
    let manager = manager();
    let wb = warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("X2", "Gadget", "3.50", "4")]);

    app.stock.upload_workbook(&wb, None, &manager).unwrap();
    let second = app.stock.upload_workbook(&wb, None, &manager).unwrap();

    // 第二趟零变更
    assert_eq!(second.items_created, 0);
    assert_eq!(second.items_updated, 0);
    assert_eq!(second.shop_rows_created, 0);
    assert_eq!(second.shop_rows_updated, 0);
}

#[test]
fn test_numeric_defect_rejects_whole_upload() {
    let app = setup();
    let manager = manager();

    let wb = warehouse_workbook(&[
        ("X1", "Widget", "9.99", "10"),
        ("X2", "Gadget", "3.50", "not-a-number"),
    ]);
    let err = app.stock.upload_workbook(&wb, None, &manager).unwrap_err();

    match err {
        ApiError::NumericDefects { defects, .. } => {
            assert_eq!(defects.len(), 1);
            assert_eq!(defects[0].key_value, "X2");
            assert_eq!(defects[0].column_name, "Quantity");
            assert_eq!(defects[0].row_number, 3);
        }
        other => panic!("Expected NumericDefects, got {:?}", other),
    }

    // 全有或全无: 合法行也不落库
    assert!(find_item(&app, "X1").is_none());
}

#[test]
fn test_bad_price_rejects_upload() {
    let app = setup();
    let err = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.999", "10")]),
            None,
            &manager(),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::NumericDefects { .. }));
}

#[test]
fn test_blank_sku_rows_skipped_silently() {
    let app = setup();
    let report = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("", "Ghost", "1.00", "5")]),
            None,
            &manager(),
        )
        .unwrap();

    assert_eq!(report.items_created, 1);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_deactivate_and_reactivate() {
    let app = setup();
    let manager = manager();
    app.stock.set_allow_deletions(true, &manager).unwrap();

    app.stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("X2", "Gadget", "3.50", "4")]),
            None,
            &manager,
        )
        .unwrap();

    // X2 从快照消失: 停用而非删除
    let report = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
            None,
            &manager,
        )
        .unwrap();
    assert_eq!(report.items_deactivated, 1);

    let x2 = find_item(&app, "X2").unwrap();
    assert!(!x2.active);

    // X2 重新出现: 同笔写入内复活
    app.stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("X2", "Gadget", "3.50", "4")]),
            None,
            &manager,
        )
        .unwrap();
    assert!(find_item(&app, "X2").unwrap().active);
}

#[test]
fn test_no_deactivation_when_deletions_disabled() {
    let app = setup();
    let manager = manager();

    app.stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("X2", "Gadget", "3.50", "4")]),
            None,
            &manager,
        )
        .unwrap();
    let report = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
            None,
            &manager,
        )
        .unwrap();

    assert_eq!(report.items_deactivated, 0);
    assert!(find_item(&app, "X2").unwrap().active);
}

#[test]
fn test_shop_sheet_upserts_and_overwrites_quantity() {
    let app = setup_with_shops(&["Paris"]);
    let manager = manager();

    app.stock
        .upload_workbook(
            &combined_workbook(
                warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
                shop_workbook(&[("Paris", "X1", "Widget", "9.99", "3")]),
            ),
            None,
            &manager,
        )
        .unwrap();
    assert_eq!(shop_quantity(&app, "Paris", "X1"), Some(3));

    // 数量覆写,不累加
    app.stock
        .upload_workbook(
            &shop_workbook(&[("Paris", "X1", "Widget", "9.99", "7")]),
            None,
            &manager,
        )
        .unwrap();
    assert_eq!(shop_quantity(&app, "Paris", "X1"), Some(7));
}

#[test]
fn test_unknown_shop_is_warning_not_failure() {
    let app = setup_with_shops(&["Paris"]);

    let report = app
        .stock
        .upload_workbook(
            &shop_workbook(&[
                ("Paris", "X1", "Widget", "9.99", "3"),
                ("Atlantis", "X1", "Widget", "9.99", "5"),
            ]),
            None,
            &manager(),
        )
        .unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Atlantis"));
    assert_eq!(shop_quantity(&app, "Paris", "X1"), Some(3));
    assert_eq!(shop_quantity(&app, "Atlantis", "X1"), None);
}

#[test]
fn test_shop_row_creates_inactive_placeholder_item() {
    let app = setup_with_shops(&["Paris"]);

    // 仓库表不含 X9: 门店行产生占位商品,不得凭空在售
    app.stock
        .upload_workbook(
            &shop_workbook(&[("Paris", "X9", "Mystery", "5.00", "2")]),
            None,
            &manager(),
        )
        .unwrap();

    let item = find_item(&app, "X9").unwrap();
    assert!(!item.active);
    assert_eq!(item.quantity, 0);
    assert_eq!(item.description, "Mystery");
    assert_eq!(item.retail_price_cents, 500);
    assert_eq!(shop_quantity(&app, "Paris", "X9"), Some(2));
}

#[test]
fn test_shop_sheet_propagates_price_to_item() {
    let app = setup_with_shops(&["Paris"]);
    let manager = manager();

    app.stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
            None,
            &manager,
        )
        .unwrap();

    // 门店表携带新价格: 回传到仓库台账
    app.stock
        .upload_workbook(
            &shop_workbook(&[("Paris", "X1", "Widget", "8.49", "3")]),
            None,
            &manager,
        )
        .unwrap();
    assert_eq!(find_item(&app, "X1").unwrap().retail_price_cents, 849);
}

#[test]
fn test_shop_row_deletion_scan() {
    let app = setup_with_shops(&["Paris"]);
    let manager = manager();
    app.stock.set_allow_deletions(true, &manager).unwrap();

    app.stock
        .upload_workbook(
            &combined_workbook(
                warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("X2", "Gadget", "3.50", "4")]),
                shop_workbook(&[
                    ("Paris", "X1", "Widget", "9.99", "3"),
                    ("Paris", "X2", "Gadget", "3.50", "1"),
                ]),
            ),
            None,
            &manager,
        )
        .unwrap();

    // X2 的门店行从快照消失: 删除
    let report = app
        .stock
        .upload_workbook(
            &combined_workbook(
                warehouse_workbook(&[("X1", "Widget", "9.99", "10"), ("X2", "Gadget", "3.50", "4")]),
                shop_workbook(&[("Paris", "X1", "Widget", "9.99", "3")]),
            ),
            None,
            &manager,
        )
        .unwrap();

    assert_eq!(report.shop_rows_deleted, 1);
    assert_eq!(shop_quantity(&app, "Paris", "X2"), None);
}

#[test]
fn test_missing_canonical_sheets_is_validation_error() {
    let app = setup();
    let raw = RawWorkbook {
        sheets: vec![SheetData::new("Random", vec!["A".to_string()])],
    };
    let err = app.stock.upload_workbook(&raw, None, &manager()).unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
fn test_adapter_fallback_pivots_wide_layout() {
    let app = setup_with_shops(&["shop.paris"]);

    let mut sheet = SheetData::new(
        "Supplier Export",
        vec![
            "product code".to_string(),
            "product desc".to_string(),
            "price".to_string(),
            "Inverness".to_string(),
            "Paris".to_string(),
        ],
    );
    sheet.rows.push(vec![
        "X1".to_string(),
        "Widget".to_string(),
        "9.99".to_string(),
        "10".to_string(),
        "3".to_string(),
    ]);
    let raw = RawWorkbook {
        sheets: vec![sheet],
    };

    let adapter = WideLayoutAdapter {
        source_sheet: Some("Supplier Export".to_string()),
        sku_column: "product code".to_string(),
        description_column: "product desc".to_string(),
        price_column: "price".to_string(),
        warehouse_columns: vec!["Inverness".to_string()],
        shop_columns: vec![("Paris".to_string(), "shop.paris".to_string())],
    };

    app.stock
        .upload_workbook(&raw, Some(&adapter), &manager())
        .unwrap();

    let item = find_item(&app, "X1").unwrap();
    assert_eq!(item.quantity, 10);
    assert_eq!(shop_quantity(&app, "shop.paris", "X1"), Some(3));
}

#[test]
fn test_adapter_fills_only_missing_shop_sheet() {
    // 仓库表已是规范形状,门店数据在宽表里: 适配器只补门店表
    let app = setup_with_shops(&["shop.paris"]);

    let mut warehouse = SheetData::new(
        "Warehouse Stock",
        vec![
            "SKU".to_string(),
            "Description".to_string(),
            "Retail Price".to_string(),
            "Quantity".to_string(),
        ],
    );
    warehouse.rows.push(vec![
        "X1".to_string(),
        "Widget".to_string(),
        "9.99".to_string(),
        "10".to_string(),
    ]);

    let mut wide = SheetData::new(
        "Supplier Export",
        vec![
            "product code".to_string(),
            "product desc".to_string(),
            "price".to_string(),
            "Inverness".to_string(),
            "Paris".to_string(),
        ],
    );
    wide.rows.push(vec![
        "X1".to_string(),
        "Widget".to_string(),
        "9.99".to_string(),
        "99".to_string(),
        "3".to_string(),
    ]);

    let raw = RawWorkbook {
        sheets: vec![warehouse, wide],
    };
    let adapter = WideLayoutAdapter {
        source_sheet: Some("Supplier Export".to_string()),
        sku_column: "product code".to_string(),
        description_column: "product desc".to_string(),
        price_column: "price".to_string(),
        warehouse_columns: vec!["Inverness".to_string()],
        shop_columns: vec![("Paris".to_string(), "shop.paris".to_string())],
    };

    app.stock
        .upload_workbook(&raw, Some(&adapter), &manager())
        .unwrap();

    // 仓库量取自直接解析的规范表,不被适配产物(99)覆盖
    assert_eq!(find_item(&app, "X1").unwrap().quantity, 10);
    // 门店行来自适配器回退,不再丢失
    assert_eq!(shop_quantity(&app, "shop.paris", "X1"), Some(3));
}

#[test]
fn test_adapter_failure_message_preserved() {
    let app = setup();

    let raw = RawWorkbook {
        sheets: vec![SheetData::new("Random", vec!["A".to_string()])],
    };
    let adapter = WideLayoutAdapter {
        source_sheet: Some("Nope".to_string()),
        sku_column: "sku".to_string(),
        description_column: "desc".to_string(),
        price_column: "price".to_string(),
        warehouse_columns: vec!["wh".to_string()],
        shop_columns: Vec::new(),
    };

    let err = app
        .stock
        .upload_workbook(&raw, Some(&adapter), &manager())
        .unwrap_err();
    match err {
        ApiError::Validation(message) => {
            // 适配器原始消息原样透传
            assert!(message.contains("Nope"), "message: {}", message);
        }
        other => panic!("Expected Validation, got {:?}", other),
    }
}

#[test]
fn test_upload_requires_manager() {
    let app = setup_with_shops(&["Paris"]);
    let err = app
        .stock
        .upload_workbook(
            &warehouse_workbook(&[("X1", "Widget", "9.99", "10")]),
            None,
            &shop_user("Paris"),
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}
