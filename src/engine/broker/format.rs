use crate::engine::types::CellValue;

/// Legacy PQL value formatting, used when `preserveType` is off.
///
/// Doubles that are mathematically integral and inside the long range
/// shortcut to `"<long>.00000"`; everything else double-shaped renders with
/// five decimals and a locale-independent decimal point. Other types
/// stringify as-is.
pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Float(v) => format_double(*v as f64),
        CellValue::Double(v) => format_double(*v),
        other => other.to_string(),
    }
}

fn format_double(d: f64) -> String {
    if d >= i64::MIN as f64 && d <= i64::MAX as f64 && d.fract() == 0.0 {
        return format!("{}.00000", d as i64);
    }
    format!("{:.5}", d)
}
