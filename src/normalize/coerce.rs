//! 单元格类型转换: 金额 / 数量 / 日期

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::str::FromStr;

/// 科学计数法指数绝对值上限
const MAX_EXPONENT: i64 = 32;
/// 有效数字上限
const MAX_DIGITS: u64 = 64;

const CURRENCY_SYMBOLS: &[&str] = &["R$", "US$", "$", "€", "£", "¥"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

/// 解析十进制数
///
/// 先直接解析; 失败后去掉货币符号与空白, 判断千分位/小数分隔符再解析.
/// "R$ 1.234,56" -> 1234.56, "1,234.56" -> 1234.56, "10,5" -> 10.5
pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(value) = bounded_decimal(trimmed) {
        return Some(value);
    }

    let cleaned = normalize_separators(&strip_currency(trimmed))?;
    bounded_decimal(&cleaned)
}

/// 指数超出 ±MAX_EXPONENT 或有效数字过多时不解析
fn bounded_decimal(s: &str) -> Option<BigDecimal> {
    if let Some(loc) = s.find(&['e', 'E'][..]) {
        let exp = &s[loc + 1..];
        let exp: i64 = exp.strip_prefix('+').unwrap_or(exp).parse().ok()?;
        if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&exp) {
            return None;
        }
    }
    let value = BigDecimal::from_str(s).ok()?;
    (value.digits() <= MAX_DIGITS).then_some(value)
}

/// 按 NUMERIC(precision, scale) 舍入; 整数部分放不下时返回 None
pub fn fit_numeric(value: &BigDecimal, precision: i64, scale: i64) -> Option<BigDecimal> {
    let rounded = value.round(scale);
    if rounded.is_zero() {
        return Some(BigDecimal::zero());
    }
    let (_, exponent) = rounded.as_bigint_and_exponent();
    let integer_digits = rounded.digits() as i64 - exponent;
    (integer_digits <= precision - scale).then_some(rounded)
}

fn strip_currency(raw: &str) -> String {
    let mut s = raw.to_string();
    for symbol in CURRENCY_SYMBOLS {
        s = s.replace(symbol, "");
    }
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// 统一为 `.` 小数点, 去掉千分位
fn normalize_separators(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => s.to_string(),
        (_, 0) if commas == 1 => s.replace(',', "."),
        (_, 0) => s.replace(',', ""),
        (0, 1) => s.to_string(),
        (0, _) => s.replace('.', ""),
        _ => {
            let last_comma = s.rfind(',')?;
            let last_dot = s.rfind('.')?;
            if last_comma > last_dot {
                // 1.234,56
                if commas > 1 {
                    return None;
                }
                s.replace('.', "").replace(',', ".")
            } else {
                // 1,234.56
                if dots > 1 {
                    return None;
                }
                s.replace(',', "")
            }
        }
    };
    Some(normalized)
}

/// 是否可以直接解析为数字 (不做任何清洗)
pub fn is_plain_number(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().map(|v| v.is_finite()).unwrap_or(false)
}

/// 去掉货币符号、空白、`,` 与 `.` 之后是否为数字
pub fn is_currency_string(raw: &str) -> bool {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, 'R' | '$' | '€' | '£' | '¥' | ',' | '.') && !c.is_whitespace())
        .collect();
    !cleaned.is_empty() && cleaned.parse::<f64>().map(|v| v.is_finite()).unwrap_or(false)
}

/// 尽力解析日期; 带时间的值取日期部分
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_datetime(trimmed).map(|dt| dt.date()))
}

/// 尽力解析日期时间; 只有日期时取零点
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
