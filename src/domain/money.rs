//! 金额计算
//!
//! 金额以 f64 存储（两位小数），每一步结果都经过 `ensure_number` 兜底，
//! 非有限值（NaN / ±inf）不会写入数据库。

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// 关单校验容差：已付 >= 应付 - PAYMENT_EPSILON 即视为付清
pub const PAYMENT_EPSILON: f64 = 0.005;

/// 已存合计与重算合计的最大允许偏差
pub const TOTALS_TOLERANCE: f64 = 0.01;

/// 非有限值返回 fallback
pub fn ensure_number(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

pub fn ensure_amount(value: f64) -> f64 {
    ensure_number(value, 0.0)
}

/// 四舍五入到分
pub fn round_money(value: f64) -> f64 {
    ensure_amount((ensure_amount(value) * 100.0).round() / 100.0)
}

/// 宽松解析 JSON 数值：数字或数字字符串，其它一律视为缺省
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// 用于请求体金额字段：`#[serde(default, deserialize_with = "lenient_amount")]`
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(coerce_number))
}

/// 单个明细参与计算的数值
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineAmounts {
    pub unit_price: f64,
    pub quantity: f64,
    /// 加料 extra_price 之和
    pub modifiers: f64,
    pub discount: f64,
    pub tax: f64,
}

/// unit_price * quantity + modifiers - discount + tax
pub fn item_total(line: &LineAmounts) -> f64 {
    round_money(
        ensure_amount(line.unit_price) * ensure_amount(line.quantity)
            + ensure_amount(line.modifiers)
            - ensure_amount(line.discount)
            + ensure_amount(line.tax),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub discount: f64,
    pub tax: f64,
    pub total: f64,
}

/// subtotal = Σ item_total；total = subtotal - discount + tax
pub fn order_totals<I>(item_totals: I, discount: f64, tax: f64) -> OrderTotals
where
    I: IntoIterator<Item = f64>,
{
    let subtotal = round_money(item_totals.into_iter().map(ensure_amount).sum());
    let discount = round_money(discount);
    let tax = round_money(tax);
    OrderTotals {
        subtotal,
        discount,
        tax,
        total: round_money(subtotal - discount + tax),
    }
}

/// 存量值与重算值偏差超过 TOTALS_TOLERANCE
pub fn totals_drifted(stored: f64, computed: f64) -> bool {
    !stored.is_finite() || (stored - computed).abs() > TOTALS_TOLERANCE
}

/// 支付净额 = amount - fee - discount + tax
pub fn net_amount(amount: f64, fee: f64, discount: f64, tax: f64) -> f64 {
    round_money(
        ensure_amount(amount) - ensure_amount(fee) - ensure_amount(discount) + ensure_amount(tax),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price: f64, quantity: f64) -> LineAmounts {
        LineAmounts {
            unit_price,
            quantity,
            ..Default::default()
        }
    }

    #[test]
    fn test_two_item_order_totals() {
        let items = [item_total(&line(25.0, 2.0)), item_total(&line(10.0, 1.0))];
        let totals = order_totals(items, 5.0, 3.0);
        assert_eq!(totals.subtotal, 60.0);
        assert_eq!(totals.total, 58.0);
    }

    #[test]
    fn test_item_total_with_modifiers_discount_and_tax() {
        let amounts = LineAmounts {
            unit_price: 12.5,
            quantity: 2.0,
            modifiers: 3.0,
            discount: 1.5,
            tax: 0.75,
        };
        assert_eq!(item_total(&amounts), 27.25);
    }

    #[test]
    fn test_non_finite_values_fall_back_to_zero() {
        let amounts = LineAmounts {
            unit_price: 10.0,
            quantity: 1.0,
            modifiers: f64::NAN,
            discount: f64::INFINITY,
            tax: 0.0,
        };
        assert_eq!(item_total(&amounts), 10.0);

        let totals = order_totals([10.0, f64::NAN], f64::NEG_INFINITY, 1.0);
        assert_eq!(totals.subtotal, 10.0);
        assert_eq!(totals.total, 11.0);
        assert_eq!(ensure_number(f64::NAN, 7.0), 7.0);
    }

    #[test]
    fn test_float_sums_are_rounded_to_cents() {
        let totals = order_totals([0.1, 0.2], 0.0, 0.0);
        assert_eq!(totals.subtotal, 0.3);
        assert_eq!(round_money(2.675_000_1), 2.68);
    }

    #[test]
    fn test_totals_drift_detection() {
        assert!(!totals_drifted(58.0, 58.0));
        assert!(!totals_drifted(58.005, 58.0));
        assert!(totals_drifted(57.5, 58.0));
        assert!(totals_drifted(f64::NAN, 58.0));
    }

    #[test]
    fn test_net_amount() {
        assert_eq!(net_amount(100.0, 2.5, 5.0, 1.0), 93.5);
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&serde_json::json!(12.5)), Some(12.5));
        assert_eq!(coerce_number(&serde_json::json!(" 25.50 ")), Some(25.5));
        assert_eq!(coerce_number(&serde_json::json!("abc")), None);
        assert_eq!(coerce_number(&serde_json::json!(null)), None);
        assert_eq!(coerce_number(&serde_json::json!("NaN")), None);
    }

    #[test]
    fn test_lenient_amount_deserialization() {
        #[derive(serde::Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "lenient_amount")]
            discount: Option<f64>,
        }

        let body: Body = serde_json::from_str(r#"{"discount": "4.5"}"#).unwrap();
        assert_eq!(body.discount, Some(4.5));
        let body: Body = serde_json::from_str(r#"{"discount": "n/a"}"#).unwrap();
        assert_eq!(body.discount, None);
        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.discount, None);
    }
}
