// ==========================================
// 门店库存调拨系统 - 数值规范化器
// ==========================================
// 职责: 单元格原始字符串 -> 类型化字段值
// 契约: 纯函数,不产生副作用;
//       空白按 0 处理,不可转换返回 None,由调用方聚合缺陷
// ==========================================

use crate::domain::types::parse_price_cents;

/// 数量单元格规范化
///
/// - 空白/纯空格 -> Some(0)
/// - 整数字面量 -> Some(n)
/// - 小数部分为零的浮点("12.0")按整数接受
/// - 负数/不可转换 -> None(缺陷)
pub fn normalize_quantity(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0);
    }

    let value = if let Ok(n) = trimmed.parse::<i64>() {
        n
    } else {
        // 表格软件常把整数导出成 "12.0"
        let f = trimmed.parse::<f64>().ok()?;
        if !f.is_finite() || f.fract() != 0.0 {
            return None;
        }
        f as i64
    };

    if value < 0 {
        return None;
    }
    Some(value)
}

/// 价格单元格规范化(定点两位小数,落库为分)
///
/// - 空白 -> Some(0)
/// - "9.99" / "12" / "0.5" -> Some(分值)
/// - 负数/超两位小数/不可转换 -> None(缺陷)
pub fn normalize_price_cents(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    parse_price_cents(trimmed)
}
