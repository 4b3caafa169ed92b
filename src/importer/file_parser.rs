// ==========================================
// 门店库存调拨系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 产物: RawWorkbook(保留全部工作表与原始布局)
// ==========================================

use crate::domain::workbook::{RawWorkbook, SheetData};
use crate::importer::canonical::{SHOP_COLUMN_SHOP_USER, SHOP_SHEET, WAREHOUSE_SHEET};
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 文件解析器接口: 文件路径 -> 原始工作簿
pub trait FileParser {
    fn parse_to_raw_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook>;
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 按文件内容自动识别格式,.xls/.xlsx 同一入口
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::ExcelParseError(
                "Excel 文件无工作表".to_string(),
            ));
        }

        // 读取全部工作表,保留顺序
        let mut sheets = Vec::new();
        for sheet_name in sheet_names {
            let range = workbook.worksheet_range(&sheet_name)?;

            let mut rows_iter = range.rows();
            let header_row = match rows_iter.next() {
                Some(row) => row,
                None => {
                    // 空表保留表名,后续按"缺表头"处理
                    sheets.push(SheetData::new(&sheet_name, Vec::new()));
                    continue;
                }
            };

            let headers: Vec<String> = header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect();

            let mut sheet = SheetData::new(&sheet_name, headers);
            for data_row in rows_iter {
                let row: Vec<String> = data_row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect();

                // 跳过完全空白的行
                if row.iter().all(|v| v.is_empty()) {
                    continue;
                }
                sheet.rows.push(row);
            }
            sheets.push(sheet);
        }

        Ok(RawWorkbook { sheets })
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
// CSV 只有一个工作表: 表头含"Shop User"列时按门店表归类,
// 否则按仓库表归类
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_workbook(&self, file_path: &Path) -> ImportResult<RawWorkbook> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let sheet_name = if headers.iter().any(|h| h == SHOP_COLUMN_SHOP_USER) {
            SHOP_SHEET
        } else {
            WAREHOUSE_SHEET
        };

        let mut sheet = SheetData::new(sheet_name, headers);
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|v| v.trim().to_string()).collect();

            // 跳过完全空白的行
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            sheet.rows.push(row);
        }

        Ok(RawWorkbook {
            sheets: vec![sheet],
        })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<RawWorkbook> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_workbook(path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_workbook(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_parser_warehouse_shape() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "SKU,Description,Retail Price,Quantity").unwrap();
        writeln!(temp_file, "X1,Widget,9.99,10").unwrap();
        writeln!(temp_file, "X2,Gadget,3.50,4").unwrap();

        let wb = CsvParser.parse_to_raw_workbook(temp_file.path()).unwrap();
        assert_eq!(wb.sheets.len(), 1);

        let sheet = wb.sheet(WAREHOUSE_SHEET).expect("Sheet not classified");
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], "X1");
    }

    #[test]
    fn test_csv_parser_shop_shape() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "Shop User,SKU,Description,Retail Price,Quantity").unwrap();
        writeln!(temp_file, "Paris,X1,Widget,9.99,2").unwrap();

        let wb = CsvParser.parse_to_raw_workbook(temp_file.path()).unwrap();
        assert!(wb.sheet(SHOP_SHEET).is_some());
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "SKU,Quantity").unwrap();
        writeln!(temp_file, "X1,2").unwrap();
        writeln!(temp_file, ",").unwrap(); // 空行
        writeln!(temp_file, "X2,3").unwrap();

        let wb = CsvParser.parse_to_raw_workbook(temp_file.path()).unwrap();
        assert_eq!(wb.sheets[0].rows.len(), 2);
    }

    #[test]
    fn test_xls_extension_routed_to_excel_parser() {
        // .xls 走 Excel 入口: 内容非法时报解析错误而非格式不支持
        let mut temp_file = tempfile::Builder::new()
            .suffix(".xls")
            .tempfile()
            .unwrap();
        temp_file.write_all(b"not a spreadsheet").unwrap();

        let result = UniversalFileParser.parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::ExcelParseError(_))));
    }

    #[test]
    fn test_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_workbook(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_unsupported_extension() {
        let result = UniversalFileParser.parse("stock.pdf");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
