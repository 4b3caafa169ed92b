// ==========================================
// 门店库存调拨系统 - 表格数据结构
// ==========================================
// 职责: 原始/规范工作簿的内存表示、数值缺陷报告
// 说明: 单元格统一以去空格后的字符串承载,
//       类型化转换由 normalizer 负责
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// SheetData - 单个工作表
// ==========================================
/// 单个工作表: 表头行 + 数据行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    pub fn new(name: &str, headers: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    /// 按列下标取单元格,缺列按空串处理(行长可短于表头)
    pub fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(|s| s.as_str()).unwrap_or("")
    }
}

// ==========================================
// RawWorkbook - 任意布局的原始工作簿
// ==========================================
/// 解析产物: 保留文件内的全部工作表,顺序不变
#[derive(Debug, Clone, Default)]
pub struct RawWorkbook {
    pub sheets: Vec<SheetData>,
}

impl RawWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&SheetData> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

// ==========================================
// CellDefect - 数值缺陷报告
// ==========================================
/// 单元格数值缺陷
///
/// 任一缺陷都会导致整次上传拒绝(fail-closed),
/// 报告用于诊断,不进入数据库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellDefect {
    pub row_number: usize,   // 行号(含表头,从1起)
    pub sheet_name: String,  // 工作表名
    pub column_name: String, // 规范列名
    pub raw_value: String,   // 原始单元格内容
    pub key_value: String,   // 所在行的主键(SKU)
}
